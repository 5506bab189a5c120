//! Progressive withholding tax calculation.
//!
//! Taxable income is gross earnings less the employee shares of the three
//! contributions. Tax is the bracket's base tax plus the marginal rate on the
//! excess over the bracket's lower bound.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{TaxBracket, TaxTable};
use crate::models::{AuditStep, StatutoryDeductions};

/// The result of a withholding tax calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxWithholdingResult {
    /// Income the tax was computed on, clamped to zero.
    pub taxable_income: Decimal,
    /// The bracket that was applied.
    pub bracket: TaxBracket,
    /// Tax withheld; never negative.
    pub tax_withheld: Decimal,
    /// Audit step recording the bracket selection.
    pub audit_step: AuditStep,
}

/// Gross earnings less the SSS, PhilHealth and Pag-IBIG employee shares.
///
/// The result is clamped to zero.
pub fn taxable_income(gross_earnings: Decimal, deductions: &StatutoryDeductions) -> Decimal {
    (gross_earnings - deductions.contributions_total()).max(Decimal::ZERO)
}

/// Computes the withholding tax on a taxable income.
///
/// # Arguments
///
/// * `taxable_income` - Income after contributions; negative values are treated as zero
/// * `table` - The validated withholding table
/// * `step_number` - The step number for audit trail sequencing
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_withholding_tax;
/// use payroll_engine::config::TaxTable;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let table = TaxTable::semi_monthly_default();
///
/// let result = calculate_withholding_tax(Decimal::from_str("20000").unwrap(), &table, 1);
/// assert_eq!(result.tax_withheld, Decimal::from_str("1604.166").unwrap());
///
/// let result = calculate_withholding_tax(Decimal::from_str("-50").unwrap(), &table, 1);
/// assert_eq!(result.tax_withheld, Decimal::ZERO);
/// ```
pub fn calculate_withholding_tax(
    taxable_income: Decimal,
    table: &TaxTable,
    step_number: u32,
) -> TaxWithholdingResult {
    let income = taxable_income.max(Decimal::ZERO);
    let bracket = table.bracket_for(income);

    let excess = (income - bracket.range_start).max(Decimal::ZERO);
    let tax_withheld = (bracket.base_tax + excess * bracket.marginal_rate).max(Decimal::ZERO);

    let range = match bracket.range_end {
        Some(end) => format!("{} to {}", bracket.range_start, end),
        None => format!("over {}", bracket.range_start),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "withholding_tax".to_string(),
        rule_name: "Withholding Tax".to_string(),
        input: serde_json::json!({
            "taxable_income": income.to_string(),
        }),
        output: serde_json::json!({
            "range_start": bracket.range_start.to_string(),
            "base_tax": bracket.base_tax.to_string(),
            "marginal_rate": bracket.marginal_rate.to_string(),
            "tax_withheld": tax_withheld.to_string(),
        }),
        reasoning: format!(
            "Taxable income {} falls in bracket {}: {} + ({} - {}) × {} = {}",
            income.normalize(),
            range,
            bracket.base_tax.normalize(),
            income.normalize(),
            bracket.range_start.normalize(),
            bracket.marginal_rate.normalize(),
            tax_withheld.normalize()
        ),
    };

    TaxWithholdingResult {
        taxable_income: income,
        bracket: bracket.clone(),
        tax_withheld,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn table() -> TaxTable {
        TaxTable::semi_monthly_default()
    }

    #[test]
    fn test_first_bracket_is_tax_free() {
        let result = calculate_withholding_tax(dec("10000"), &table(), 1);
        assert_eq!(result.tax_withheld, Decimal::ZERO);
        assert_eq!(result.bracket.range_start, Decimal::ZERO);
    }

    #[test]
    fn test_second_bracket_marginal_rate() {
        // (12,000 - 10,416.67) × 15% = 237.4995
        let result = calculate_withholding_tax(dec("12000"), &table(), 1);
        assert_eq!(result.tax_withheld, dec("237.4995"));
    }

    #[test]
    fn test_third_bracket_includes_base_tax() {
        // 937.50 + (20,000 - 16,666.67) × 20%
        let result = calculate_withholding_tax(dec("20000"), &table(), 1);
        assert_eq!(result.tax_withheld, dec("1604.166"));
    }

    #[test]
    fn test_top_bracket() {
        // 91,770.70 + (400,000 - 333,332.50) × 35%
        let result = calculate_withholding_tax(dec("400000"), &table(), 1);
        assert_eq!(result.tax_withheld, dec("115104.325"));
        assert_eq!(result.bracket.range_end, None);
    }

    #[test]
    fn test_zero_and_negative_income_is_zero_tax() {
        assert_eq!(
            calculate_withholding_tax(Decimal::ZERO, &table(), 1).tax_withheld,
            Decimal::ZERO
        );
        let negative = calculate_withholding_tax(dec("-1000"), &table(), 1);
        assert_eq!(negative.tax_withheld, Decimal::ZERO);
        assert_eq!(negative.taxable_income, Decimal::ZERO);
    }

    #[test]
    fn test_tax_is_monotonic_across_boundaries() {
        let boundaries = ["10416.67", "16666.67", "33332.50", "83332.50", "333332.50"];
        for boundary in boundaries {
            let at = calculate_withholding_tax(dec(boundary), &table(), 1).tax_withheld;
            let above =
                calculate_withholding_tax(dec(boundary) + dec("0.01"), &table(), 1).tax_withheld;
            assert!(above >= at, "tax decreased across {}", boundary);
        }
    }

    #[test]
    fn test_taxable_income_subtracts_contributions() {
        let deductions = StatutoryDeductions {
            tax: dec("999"),
            sss: dec("450"),
            philhealth: dec("250"),
            pagibig: dec("100"),
        };
        assert_eq!(taxable_income(dec("10000"), &deductions), dec("9200"));
        assert_eq!(taxable_income(dec("500"), &deductions), Decimal::ZERO);
    }

    #[test]
    fn test_audit_step_records_bracket() {
        let result = calculate_withholding_tax(dec("12000"), &table(), 7);
        assert_eq!(result.audit_step.step_number, 7);
        assert_eq!(result.audit_step.rule_id, "withholding_tax");
        assert_eq!(result.audit_step.output["range_start"], "10416.67");
        assert!(result.audit_step.reasoning.contains("10416.67 to 16666.67"));
    }
}
