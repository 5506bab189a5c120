//! Statutory contribution calculation.
//!
//! This module evaluates a wage base against a [`DeductionRule`] to produce the
//! employee and employer shares of an SSS, PhilHealth or Pag-IBIG contribution.
//!
//! ## Statutory splits
//!
//! A fixed-percentage rule without explicit rates is split per statute:
//! - **SSS:** 4.5% employee to 9.5% employer of the total
//! - **PhilHealth:** 50/50
//! - **Pag-IBIG:** employee 1% up to 1,500 and 2% above, employer 2%, each capped at 100
//! - **Tax:** borne entirely by the employee

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PayFrequency;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BelowMinimum, ContributionResult, DeductionRule, DeductionType, RuleKind, SalaryBracket,
};

use super::formula::evaluate_formula;

/// Lowest SSS Monthly Salary Credit.
pub const SSS_MSC_FLOOR: Decimal = Decimal::from_parts(4000, 0, 0, false, 0);

/// Highest SSS Monthly Salary Credit.
pub const SSS_MSC_CEILING: Decimal = Decimal::from_parts(30000, 0, 0, false, 0);

/// Width of an SSS Monthly Salary Credit step.
const SSS_MSC_STEP: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Remainder at or above which the MSC rounds up to the next step.
const SSS_MSC_HALF_STEP: Decimal = Decimal::from_parts(250, 0, 0, false, 0);

/// Pag-IBIG basis at or below which the employee rate is halved.
pub const PAGIBIG_LOW_INCOME_CEILING: Decimal = Decimal::from_parts(1500, 0, 0, false, 0);

/// Cap on each side of the Pag-IBIG contribution.
pub const PAGIBIG_SHARE_CAP: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Computes the SSS Monthly Salary Credit for a monthly wage.
///
/// The wage is capped at 30,000 and floored at 4,000. In between, it snaps to
/// a multiple of 500: a remainder below 250 rounds down, otherwise up.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::sss_monthly_salary_credit;
/// use rust_decimal::Decimal;
///
/// assert_eq!(sss_monthly_salary_credit(Decimal::new(4200, 0)), Decimal::new(4000, 0));
/// assert_eq!(sss_monthly_salary_credit(Decimal::new(4300, 0)), Decimal::new(4500, 0));
/// assert_eq!(sss_monthly_salary_credit(Decimal::new(35000, 0)), Decimal::new(30000, 0));
/// ```
pub fn sss_monthly_salary_credit(monthly_wage: Decimal) -> Decimal {
    let capped = monthly_wage.min(SSS_MSC_CEILING);
    if capped < SSS_MSC_FLOOR {
        return SSS_MSC_FLOOR;
    }
    if capped == SSS_MSC_CEILING {
        return capped;
    }

    let remainder = capped % SSS_MSC_STEP;
    let snapped = if remainder < SSS_MSC_HALF_STEP {
        capped - remainder
    } else {
        capped - remainder + SSS_MSC_STEP
    };
    snapped.min(SSS_MSC_CEILING)
}

/// Evaluates a deduction rule against a monthly wage base.
///
/// Negative wages are treated as zero. A wage below `min_salary` yields a zero
/// contribution unless the rule's [`BelowMinimum`] policy is `Floor`; SSS always
/// applies its own 4,000 credit floor. A wage above `max_salary` is capped.
///
/// # Errors
///
/// Returns [`EngineError::RuleEvaluation`] when a custom formula cannot be
/// evaluated. Evaluation failures never degrade to a zero contribution.
/// Returns [`EngineError::AmountOutOfRange`] when a share overflows.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{calculate_contribution, statutory_default_rule};
/// use payroll_engine::models::DeductionType;
/// use rust_decimal::Decimal;
///
/// let philhealth = statutory_default_rule(DeductionType::PhilHealth);
/// let result = calculate_contribution(Decimal::new(5000, 0), &philhealth).unwrap();
/// assert_eq!(result.total, Decimal::new(500, 0));
/// assert_eq!(result.employee_share, Decimal::new(250, 0));
/// ```
pub fn calculate_contribution(
    wage_base: Decimal,
    rule: &DeductionRule,
) -> EngineResult<ContributionResult> {
    let wage = wage_base.max(Decimal::ZERO);

    match &rule.rule {
        RuleKind::FixedPercentage {
            percentage,
            employee_rate,
            employer_rate,
        } => {
            let Some(basis) = clamped_basis(wage, rule) else {
                return Ok(ContributionResult::ZERO);
            };
            match (employee_rate, employer_rate) {
                (Some(ee), Some(er)) => shares(
                    rule.deduction_type,
                    percent_of(rule.deduction_type, basis, *ee)?,
                    percent_of(rule.deduction_type, basis, *er)?,
                ),
                _ => statutory_split(rule.deduction_type, basis, *percentage),
            }
        }
        RuleKind::SalaryBracket { brackets } => {
            let basis = if rule.deduction_type == DeductionType::Sss {
                let capped = rule.max_salary.map_or(wage, |max| wage.min(max));
                sss_monthly_salary_credit(capped)
            } else {
                match clamped_basis(wage, rule) {
                    Some(basis) => basis,
                    None => return Ok(ContributionResult::ZERO),
                }
            };
            match find_bracket(brackets, basis) {
                Some(bracket) => bracket_shares(rule.deduction_type, bracket, basis),
                None => Ok(ContributionResult::ZERO),
            }
        }
        RuleKind::CustomFormula {
            employee_formula,
            employer_formula,
        } => {
            let employee = evaluate_formula(employee_formula, wage).map_err(|e| {
                EngineError::evaluation(format!("{} employee", rule.deduction_type), e.to_string())
            })?;
            let employer = match employer_formula {
                Some(formula) if !formula.trim().is_empty() => evaluate_formula(formula, wage)
                    .map_err(|e| {
                        EngineError::evaluation(
                            format!("{} employer", rule.deduction_type),
                            e.to_string(),
                        )
                    })?,
                _ => Decimal::ZERO,
            };
            shares(
                rule.deduction_type,
                employee.max(Decimal::ZERO),
                employer.max(Decimal::ZERO),
            )
        }
    }
}

/// Computes the per-period contribution for a period's gross earnings.
///
/// For semi-monthly payroll the monthly equivalent (gross × 2) is the wage
/// base and each share is halved. Monthly payroll uses the gross directly.
pub fn calculate_period_contribution(
    period_gross: Decimal,
    rule: &DeductionRule,
    frequency: PayFrequency,
) -> EngineResult<ContributionResult> {
    let periods = frequency.periods_per_month();
    let monthly_gross = period_gross
        .checked_mul(periods)
        .ok_or_else(|| overflow(rule.deduction_type))?;
    let monthly = calculate_contribution(monthly_gross, rule)?;
    Ok(monthly.divided_by(periods))
}

/// The statutory rule used when no complete default rule is configured.
pub fn statutory_default_rule(deduction_type: DeductionType) -> DeductionRule {
    let (id, name, min_salary, max_salary, below_minimum, rule) = match deduction_type {
        DeductionType::Sss => (
            "statutory_sss",
            "SSS Contribution",
            None,
            None,
            BelowMinimum::Zero,
            RuleKind::SalaryBracket {
                brackets: vec![SalaryBracket {
                    salary_from: Decimal::ZERO,
                    salary_to: None,
                    employee_rate: Decimal::new(45, 1),
                    employer_rate: Decimal::new(95, 1),
                    fixed_amount: None,
                    fixed_employer_amount: None,
                }],
            },
        ),
        DeductionType::PhilHealth => (
            "statutory_philhealth",
            "PhilHealth Premium",
            Some(Decimal::new(10_000, 0)),
            Some(Decimal::new(100_000, 0)),
            BelowMinimum::Floor,
            RuleKind::FixedPercentage {
                percentage: Decimal::new(5, 0),
                employee_rate: None,
                employer_rate: None,
            },
        ),
        DeductionType::PagIbig => (
            "statutory_pagibig",
            "Pag-IBIG Contribution",
            None,
            None,
            BelowMinimum::Zero,
            RuleKind::FixedPercentage {
                percentage: Decimal::TWO,
                employee_rate: None,
                employer_rate: None,
            },
        ),
        DeductionType::Tax => (
            "statutory_tax",
            "Withholding Tax",
            None,
            None,
            BelowMinimum::Zero,
            RuleKind::FixedPercentage {
                percentage: Decimal::ZERO,
                employee_rate: None,
                employer_rate: None,
            },
        ),
    };

    DeductionRule {
        id: id.to_string(),
        name: name.to_string(),
        deduction_type,
        min_salary,
        max_salary,
        below_minimum,
        is_default: true,
        rule,
    }
}

/// Whether a monthly wage meets a contribution's customary threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityHint {
    /// The deduction the hint is for.
    pub deduction_type: DeductionType,
    /// Monthly wage at which the contribution customarily applies.
    pub threshold: Decimal,
    /// Whether the wage meets the threshold.
    pub eligible: bool,
}

/// Returns a display hint on whether a contribution customarily applies.
///
/// Thresholds are 5,000 (SSS), 10,000 (PhilHealth) and 1,500 (Pag-IBIG) on
/// the monthly equivalent. The calculator never enforces them.
pub fn eligibility_hint(deduction_type: DeductionType, monthly_wage: Decimal) -> Option<EligibilityHint> {
    let threshold = match deduction_type {
        DeductionType::Sss => Decimal::new(5_000, 0),
        DeductionType::PhilHealth => Decimal::new(10_000, 0),
        DeductionType::PagIbig => PAGIBIG_LOW_INCOME_CEILING,
        DeductionType::Tax => return None,
    };
    Some(EligibilityHint {
        deduction_type,
        threshold,
        eligible: monthly_wage >= threshold,
    })
}

/// Applies the min/max salary bounds. `None` means the contribution is zero.
fn clamped_basis(wage: Decimal, rule: &DeductionRule) -> Option<Decimal> {
    let mut basis = wage;
    if let Some(min) = rule.min_salary {
        if wage < min {
            match rule.below_minimum {
                BelowMinimum::Zero => return None,
                BelowMinimum::Floor => basis = min,
            }
        }
    }
    if let Some(max) = rule.max_salary {
        basis = basis.min(max);
    }
    Some(basis)
}

/// The last bracket starting at or below `value`; `None` below the first bracket.
fn find_bracket(brackets: &[SalaryBracket], value: Decimal) -> Option<&SalaryBracket> {
    brackets
        .iter()
        .rev()
        .find(|b| value >= b.salary_from)
}

/// A fixed amount of zero or less falls back to the bracket's rate.
fn bracket_shares(
    deduction_type: DeductionType,
    bracket: &SalaryBracket,
    basis: Decimal,
) -> EngineResult<ContributionResult> {
    let employee = match bracket.fixed_amount.filter(|a| *a > Decimal::ZERO) {
        Some(amount) => amount,
        None => percent_of(deduction_type, basis, bracket.employee_rate)?,
    };
    let employer = match bracket.fixed_employer_amount.filter(|a| *a > Decimal::ZERO) {
        Some(amount) => amount,
        None => percent_of(deduction_type, basis, bracket.employer_rate)?,
    };
    shares(deduction_type, employee, employer)
}

fn statutory_split(
    deduction_type: DeductionType,
    basis: Decimal,
    percentage: Decimal,
) -> EngineResult<ContributionResult> {
    match deduction_type {
        DeductionType::Sss => {
            let total = percent_of(deduction_type, basis, percentage)?;
            let employee = total
                .checked_mul(Decimal::new(45, 0))
                .ok_or_else(|| overflow(deduction_type))?
                / Decimal::new(140, 0);
            shares(deduction_type, employee, total - employee)
        }
        DeductionType::PhilHealth => {
            let total = percent_of(deduction_type, basis, percentage)?;
            let employee = total / Decimal::TWO;
            shares(deduction_type, employee, total - employee)
        }
        DeductionType::PagIbig => {
            let employee_rate = if basis <= PAGIBIG_LOW_INCOME_CEILING {
                percentage / Decimal::TWO
            } else {
                percentage
            };
            let employee =
                percent_of(deduction_type, basis, employee_rate)?.min(PAGIBIG_SHARE_CAP);
            let employer = percent_of(deduction_type, basis, percentage)?.min(PAGIBIG_SHARE_CAP);
            shares(deduction_type, employee, employer)
        }
        DeductionType::Tax => shares(
            deduction_type,
            percent_of(deduction_type, basis, percentage)?,
            Decimal::ZERO,
        ),
    }
}

fn percent_of(
    deduction_type: DeductionType,
    basis: Decimal,
    rate: Decimal,
) -> EngineResult<Decimal> {
    basis
        .checked_mul(rate)
        .map(|amount| amount / Decimal::ONE_HUNDRED)
        .ok_or_else(|| overflow(deduction_type))
}

fn shares(
    deduction_type: DeductionType,
    employee: Decimal,
    employer: Decimal,
) -> EngineResult<ContributionResult> {
    ContributionResult::checked_from_shares(employee, employer)
        .ok_or_else(|| overflow(deduction_type))
}

fn overflow(deduction_type: DeductionType) -> EngineError {
    EngineError::out_of_range(format!("{} contribution", deduction_type))
}
