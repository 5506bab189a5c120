//! Request types for the payroll engine API.
//!
//! This module defines the JSON request structures for each endpoint. Domain
//! models are deserialized directly; the requests only group them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::RecomputePolicy;
use crate::models::{
    AttendanceDay, CutOff, DeductionRule, DeductionType, Employee, PayrollRecord, Position,
    StatutoryField,
};

/// Request body for the `/contributions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRequest {
    /// The contribution to compute.
    pub deduction_type: DeductionType,
    /// Monthly wage base.
    pub wage_base: Decimal,
    /// A rule to evaluate instead of the configured one (e.g. to preview an edit).
    #[serde(default)]
    pub rule: Option<DeductionRule>,
}

/// Request body for the `/tax` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRequest {
    /// Taxable income for the period.
    pub taxable_income: Decimal,
}

/// Request body for the `/payroll/generate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePayrollRequest {
    /// The employee snapshot.
    pub employee: Employee,
    /// The employee's position.
    #[serde(default)]
    pub position: Option<Position>,
    /// The pay period.
    pub cut_off: CutOff,
    /// Resolved attendance for the period.
    #[serde(default)]
    pub attendance: Vec<AttendanceDay>,
}

/// Request body for the `/payroll/recompute` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputePayrollRequest {
    /// The edited draft record.
    pub record: PayrollRecord,
    /// The employee snapshot.
    pub employee: Employee,
    /// The employee's position.
    #[serde(default)]
    pub position: Option<Position>,
    /// The statutory field the officer is editing, if any.
    #[serde(default)]
    pub editing: Option<StatutoryField>,
}

impl RecomputePayrollRequest {
    /// The recompute policy implied by `editing`.
    pub fn policy(&self) -> RecomputePolicy {
        RecomputePolicy {
            editing: self.editing,
        }
    }
}

/// Request body for the `/final-pay` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalPayRequest {
    /// The separating employee.
    pub employee: Employee,
    /// The employee's position.
    #[serde(default)]
    pub position: Option<Position>,
    /// Payroll history; records of other employees are ignored.
    #[serde(default)]
    pub payroll_history: Vec<PayrollRecord>,
}

/// Request body for the `/rules/validate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRuleRequest {
    /// The rule to validate.
    pub rule: DeductionRule,
}
