//! Save-time validation of deduction rules and tax tables.
//!
//! Rules are validated when they are saved or loaded, never when they are
//! evaluated: a rule that passes here can always be evaluated, except for
//! custom formulas that divide by an expression which becomes zero.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::config::{TaxBracket, TaxTable};
use crate::error::{EngineError, EngineResult};
use crate::models::{DeductionRule, DeductionType, RuleKind, SalaryBracket};

use super::formula::Formula;

/// Largest gap tolerated between one bracket's `salary_to` and the next
/// bracket's `salary_from` (one centavo).
const BRACKET_GAP_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Validates a single deduction rule.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] naming the rule when:
/// - the id is empty
/// - salary bounds are negative or `min_salary` exceeds `max_salary`
/// - a rate lies outside 0 to 100 or only one explicit rate is given
/// - brackets are empty, overlap, leave a gap or are open-ended before the end
/// - a formula is empty or does not parse
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{statutory_default_rule, validate_rule};
/// use payroll_engine::models::DeductionType;
///
/// assert!(validate_rule(&statutory_default_rule(DeductionType::Sss)).is_ok());
/// ```
pub fn validate_rule(rule: &DeductionRule) -> EngineResult<()> {
    let invalid = |message: String| EngineError::validation(&rule.id, message);

    if rule.id.trim().is_empty() {
        return Err(EngineError::validation("<unnamed>", "rule id must not be empty"));
    }

    for (label, bound) in [("min_salary", rule.min_salary), ("max_salary", rule.max_salary)] {
        if bound.is_some_and(|v| v < Decimal::ZERO) {
            return Err(invalid(format!("{} must not be negative", label)));
        }
    }
    if let (Some(min), Some(max)) = (rule.min_salary, rule.max_salary) {
        if min > max {
            return Err(invalid(format!(
                "min_salary {} exceeds max_salary {}",
                min, max
            )));
        }
    }

    match &rule.rule {
        RuleKind::FixedPercentage {
            percentage,
            employee_rate,
            employer_rate,
        } => {
            check_rate(rule, "percentage", *percentage)?;
            match (employee_rate, employer_rate) {
                (Some(ee), Some(er)) => {
                    check_rate(rule, "employee_rate", *ee)?;
                    check_rate(rule, "employer_rate", *er)?;
                }
                (None, None) => {}
                _ => {
                    return Err(invalid(
                        "employee_rate and employer_rate must be given together".to_string(),
                    ));
                }
            }
        }
        RuleKind::SalaryBracket { brackets } => {
            validate_brackets(rule, brackets)?;
            if rule.deduction_type == DeductionType::Tax {
                TaxTable::from_rule(rule)?;
            }
        }
        RuleKind::CustomFormula {
            employee_formula,
            employer_formula,
        } => {
            if employee_formula.trim().is_empty() {
                return Err(invalid("employee_formula must not be empty".to_string()));
            }
            Formula::parse(employee_formula)
                .map_err(|e| invalid(format!("employee_formula: {}", e)))?;
            if let Some(formula) = employer_formula.as_deref().filter(|f| !f.trim().is_empty()) {
                Formula::parse(formula).map_err(|e| invalid(format!("employer_formula: {}", e)))?;
            }
        }
    }

    Ok(())
}

/// Validates every rule and the set as a whole.
///
/// In addition to [`validate_rule`], ids must be unique and each deduction type
/// may have at most one default rule.
pub fn validate_rule_set(rules: &[DeductionRule]) -> EngineResult<()> {
    let mut ids = HashSet::new();
    let mut defaults = HashSet::new();

    for rule in rules {
        validate_rule(rule)?;
        if !ids.insert(rule.id.as_str()) {
            return Err(EngineError::validation(&rule.id, "duplicate rule id"));
        }
        if rule.is_default && !defaults.insert(rule.deduction_type) {
            return Err(EngineError::validation(
                &rule.id,
                format!("more than one default {} rule", rule.deduction_type),
            ));
        }
    }

    Ok(())
}

/// Validates an ordered list of tax brackets.
///
/// The table must start at zero, be contiguous (each `range_end` equals the next
/// `range_start`), end with a single open-ended bracket, use marginal rates
/// between 0 and 1, and never let tax decrease across a boundary.
pub fn validate_tax_brackets(table_id: &str, brackets: &[TaxBracket]) -> EngineResult<()> {
    let invalid = |message: String| EngineError::validation(table_id, message);

    let Some(first) = brackets.first() else {
        return Err(invalid("tax table must have at least one bracket".to_string()));
    };
    if !first.range_start.is_zero() {
        return Err(invalid(format!(
            "first bracket must start at 0, found {}",
            first.range_start
        )));
    }

    for (i, bracket) in brackets.iter().enumerate() {
        if bracket.base_tax < Decimal::ZERO {
            return Err(invalid(format!("bracket {} has negative base tax", i + 1)));
        }
        if bracket.marginal_rate < Decimal::ZERO || bracket.marginal_rate > Decimal::ONE {
            return Err(invalid(format!(
                "bracket {} marginal rate {} is outside 0 to 1",
                i + 1,
                bracket.marginal_rate
            )));
        }

        match (bracket.range_end, brackets.get(i + 1)) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(invalid(format!(
                    "only the final bracket may be open-ended (bracket {})",
                    i + 1
                )));
            }
            (Some(_), None) => {
                return Err(invalid("final bracket must be open-ended".to_string()));
            }
            (Some(end), Some(next)) => {
                if end <= bracket.range_start {
                    return Err(invalid(format!(
                        "bracket {} ends at {} before it starts at {}",
                        i + 1,
                        end,
                        bracket.range_start
                    )));
                }
                if next.range_start > end {
                    return Err(invalid(format!("gap between {} and {}", end, next.range_start)));
                }
                if next.range_start < end {
                    return Err(invalid(format!(
                        "brackets overlap at {}",
                        next.range_start
                    )));
                }
                let tax_at_end =
                    bracket.base_tax + (end - bracket.range_start) * bracket.marginal_rate;
                if next.base_tax < tax_at_end {
                    return Err(invalid(format!(
                        "tax decreases at {}: {} < {}",
                        end, next.base_tax, tax_at_end
                    )));
                }
            }
        }
    }

    Ok(())
}

fn check_rate(rule: &DeductionRule, label: &str, rate: Decimal) -> EngineResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(EngineError::validation(
            &rule.id,
            format!("{} {} is outside 0 to 100", label, rate),
        ));
    }
    Ok(())
}

fn validate_brackets(rule: &DeductionRule, brackets: &[SalaryBracket]) -> EngineResult<()> {
    let invalid = |message: String| EngineError::validation(&rule.id, message);

    if brackets.is_empty() {
        return Err(invalid("salary bracket rule has no brackets".to_string()));
    }

    for (i, bracket) in brackets.iter().enumerate() {
        if bracket.salary_from < Decimal::ZERO {
            return Err(invalid(format!("bracket {} starts below zero", i + 1)));
        }
        check_rate(rule, "employee_rate", bracket.employee_rate)?;
        check_rate(rule, "employer_rate", bracket.employer_rate)?;
        for amount in [bracket.fixed_amount, bracket.fixed_employer_amount]
            .into_iter()
            .flatten()
        {
            if amount < Decimal::ZERO {
                return Err(invalid(format!("bracket {} has a negative fixed amount", i + 1)));
            }
        }

        match (bracket.salary_to, brackets.get(i + 1)) {
            (Some(to), _) if to < bracket.salary_from => {
                return Err(invalid(format!(
                    "bracket {} ends at {} before it starts at {}",
                    i + 1,
                    to,
                    bracket.salary_from
                )));
            }
            (None, Some(_)) => {
                return Err(invalid(format!(
                    "only the final bracket may be open-ended (bracket {})",
                    i + 1
                )));
            }
            (Some(to), Some(next)) => {
                // Both ends are inclusive, so a shared endpoint lies in two brackets.
                if next.salary_from <= to {
                    return Err(invalid(format!(
                        "brackets overlap at {}",
                        next.salary_from
                    )));
                }
                if next.salary_from - to > BRACKET_GAP_TOLERANCE {
                    return Err(invalid(format!("gap between {} and {}", to, next.salary_from)));
                }
            }
            _ => {}
        }
    }

    Ok(())
}
