//! Monthly contribution and tax remittance reports.
//!
//! Amounts are kept at full precision throughout the engine and rounded to
//! centavos here, half away from zero.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, PayFrequency};
use crate::error::EngineResult;
use crate::models::{ContributionResult, DeductionType, Employee, PayrollRecord, StatutoryField};

use super::contribution::{calculate_contribution, calculate_period_contribution};
use super::tax::taxable_income;

/// Rounds an amount to 2 decimal places, half away from zero.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::round_currency;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_currency(Decimal::from_str("237.4995").unwrap()), Decimal::from_str("237.50").unwrap());
/// assert_eq!(round_currency(Decimal::from_str("-0.125").unwrap()), Decimal::from_str("-0.13").unwrap());
/// ```
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One employee's line on a contribution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReportRow {
    /// Employee id.
    pub emp_id: String,
    /// Employee name, empty when the employee snapshot was not supplied.
    pub name: String,
    /// The employee's registration number with the agency.
    pub id_number: Option<String>,
    /// Gross earnings across the employee's records.
    pub gross_earnings: Decimal,
    /// Employee share (EE).
    pub employee_share: Decimal,
    /// Employer share (ER).
    pub employer_share: Decimal,
    /// EE plus ER.
    pub total: Decimal,
}

/// A contribution report for one agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReport {
    /// The contribution reported.
    pub deduction_type: DeductionType,
    /// One row per employee, ordered by employee id.
    pub rows: Vec<ContributionReportRow>,
    /// Column totals.
    pub totals: ContributionResult,
}

/// One employee's line on the withholding tax report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReportRow {
    /// Employee id.
    pub emp_id: String,
    /// Employee name.
    pub name: String,
    /// Tax identification number.
    pub tin_no: Option<String>,
    /// Gross earnings across the employee's records.
    pub gross_earnings: Decimal,
    /// Taxable income across the employee's records.
    pub taxable_income: Decimal,
    /// Tax withheld across the employee's records.
    pub tax_withheld: Decimal,
}

/// The monthly withholding tax report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReport {
    /// One row per employee, ordered by employee id.
    pub rows: Vec<TaxReportRow>,
    /// Sum of tax withheld.
    pub total_withheld: Decimal,
}

/// Builds a monthly contribution report for SSS, PhilHealth or Pag-IBIG.
///
/// Each employee's records are summed and the contribution is computed on the
/// monthly gross. When a semi-monthly payroll has only one period for the
/// employee, that period's gross is doubled and the shares halved.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::RuleEvaluation`] if a custom formula fails.
pub fn contribution_report(
    field: StatutoryField,
    employees: &[Employee],
    records: &[PayrollRecord],
    config: &EngineConfig,
) -> EngineResult<ContributionReport> {
    let deduction_type = field.deduction_type();
    let rule = config.rules().resolve(deduction_type);
    let frequency = config.settings().pay_frequency;

    let mut rows = Vec::new();
    let mut totals = ContributionResult::ZERO;

    for (emp_id, group) in group_by_employee(records) {
        let gross: Decimal = group.iter().map(|r| r.gross_earnings()).sum();
        let result = if gross <= Decimal::ZERO {
            ContributionResult::ZERO
        } else if group.len() == 1 && frequency == PayFrequency::SemiMonthly {
            calculate_period_contribution(gross, &rule, frequency)?
        } else {
            calculate_contribution(gross, &rule)?
        };

        let employee = employees.iter().find(|e| e.id == emp_id);
        let ids = employee.map(|e| &e.statutory_ids);
        let id_number = ids.and_then(|ids| match field {
            StatutoryField::Sss => ids.sss_no.clone(),
            StatutoryField::PhilHealth => ids.philhealth_no.clone(),
            StatutoryField::PagIbig => ids.pagibig_no.clone(),
        });

        let row = ContributionReportRow {
            emp_id: emp_id.to_string(),
            name: employee.map(|e| e.name.clone()).unwrap_or_default(),
            id_number,
            gross_earnings: round_currency(gross),
            employee_share: round_currency(result.employee_share),
            employer_share: round_currency(result.employer_share),
            total: round_currency(result.employee_share) + round_currency(result.employer_share),
        };
        totals = ContributionResult::from_shares(
            totals.employee_share + row.employee_share,
            totals.employer_share + row.employer_share,
        );
        rows.push(row);
    }

    Ok(ContributionReport {
        deduction_type,
        rows,
        totals,
    })
}

/// Builds the withholding tax report from the records' withheld amounts.
pub fn tax_report(employees: &[Employee], records: &[PayrollRecord]) -> TaxReport {
    let mut rows = Vec::new();

    for (emp_id, group) in group_by_employee(records) {
        let gross: Decimal = group.iter().map(|r| r.gross_earnings()).sum();
        let taxable: Decimal = group
            .iter()
            .map(|r| taxable_income(r.gross_earnings(), &r.statutory_deductions))
            .sum();
        let withheld: Decimal = group.iter().map(|r| r.statutory_deductions.tax).sum();

        let employee = employees.iter().find(|e| e.id == emp_id);
        rows.push(TaxReportRow {
            emp_id: emp_id.to_string(),
            name: employee.map(|e| e.name.clone()).unwrap_or_default(),
            tin_no: employee.and_then(|e| e.statutory_ids.tin_no.clone()),
            gross_earnings: round_currency(gross),
            taxable_income: round_currency(taxable),
            tax_withheld: round_currency(withheld),
        });
    }

    let total_withheld = rows.iter().map(|r| r.tax_withheld).sum();
    TaxReport {
        rows,
        total_withheld,
    }
}

fn group_by_employee(records: &[PayrollRecord]) -> BTreeMap<&str, Vec<&PayrollRecord>> {
    let mut groups: BTreeMap<&str, Vec<&PayrollRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.emp_id.as_str()).or_default().push(record);
    }
    groups
}
