//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod audit;
mod deduction_rule;
mod employee;
mod payroll_record;
mod settlement;

pub use attendance::{AttendanceDay, AttendanceStatus, DayType};
pub use audit::{AuditStep, AuditTrace, AuditWarning};
pub use deduction_rule::{
    BelowMinimum, ContributionResult, DeductionRule, DeductionType, RuleKind, SalaryBracket,
};
pub use employee::{Employee, LeaveCredits, Position, StatutoryIds, monthly_salary_of};
pub use payroll_record::{
    ADDITIONAL_EARNING_TYPES, ALLOWANCE, Absence, AbsenceKind, CutOff, DEFAULT_EARNINGS,
    EarningKind, EarningLine, LATE_DEDUCTION, LEAVE_PAY, LeavePayLine, LeaveType,
    NIGHT_DIFFERENTIAL, OVERTIME_PAY, OtherDeduction, PAY_ADJUSTMENT, PayrollRecord,
    PayrollStatus, REGULAR_HOLIDAY_PAY, REGULAR_HOLIDAY_PAY_OT, REGULAR_HOURS,
    SPECIAL_HOLIDAY_PAY, SPECIAL_HOLIDAY_PAY_OT, StatutoryDeductions, StatutoryField,
    default_earnings,
};
pub use settlement::{BreakdownLine, FinalPaySettlement};
