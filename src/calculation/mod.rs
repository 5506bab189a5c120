//! Calculation logic for the payroll engine.
//!
//! This module contains all the calculation functions for payroll: the
//! restricted formula evaluator used by custom rules, rule validation,
//! statutory contributions, progressive withholding tax, leave pay,
//! period aggregation and recompute, final pay, and remittance reports.

mod contribution;
mod final_pay;
mod formula;
mod leave_pay;
mod payroll;
mod report;
mod tax;
mod validation;

pub use contribution::{
    EligibilityHint, PAGIBIG_LOW_INCOME_CEILING, PAGIBIG_SHARE_CAP, SSS_MSC_CEILING,
    SSS_MSC_FLOOR, calculate_contribution, calculate_period_contribution, eligibility_hint,
    sss_monthly_salary_credit, statutory_default_rule,
};
pub use final_pay::calculate_final_pay;
pub use formula::{Formula, FormulaError, SALARY_VARIABLE, evaluate_formula};
pub use leave_pay::{LeavePayResult, calculate_leave_pay};
pub use payroll::{
    DAY_OUTSIDE_CUT_OFF, DEFAULT_EARNINGS_RESTORED, MISSING_SALARY, PayrollComputation,
    PayrollTotals, RULE_EVALUATION_ERROR, RecomputePolicy, StatutoryContributions,
    generate_payroll, recompute_payroll,
};
pub use report::{
    ContributionReport, ContributionReportRow, TaxReport, TaxReportRow, contribution_report,
    round_currency, tax_report,
};
pub use tax::{TaxWithholdingResult, calculate_withholding_tax, taxable_income};
pub use validation::{validate_rule, validate_rule_set, validate_tax_brackets};
