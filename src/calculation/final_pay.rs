//! Final pay settlement.
//!
//! At separation, the employee is paid the latest period's net pay plus the
//! cash value of unused vacation leave.

use rust_decimal::Decimal;
use tracing::info;

use crate::config::PayrollSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BreakdownLine, Employee, FinalPaySettlement, PayrollRecord, Position, monthly_salary_of,
};

/// Computes the final pay settlement for a separating employee.
///
/// Only records belonging to `employee` are considered; the one with the
/// latest cut-off end is used. Without a prior record, the settlement is the
/// leave payout alone. The result is never floored at zero.
///
/// # Errors
///
/// Returns [`EngineError::AmountOutOfRange`] when a total overflows.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_final_pay;
/// use payroll_engine::config::PayrollSettings;
/// use payroll_engine::models::{Employee, LeaveCredits, Position, StatutoryIds};
/// use rust_decimal::Decimal;
///
/// let employee = Employee {
///     id: "EMP-009".to_string(),
///     name: "Garcia, Luis".to_string(),
///     position_id: Some("POS-2".to_string()),
///     leave_credits: LeaveCredits { vacation: Decimal::new(5, 0), sick: Decimal::ZERO },
///     statutory_ids: StatutoryIds::default(),
/// };
/// let position = Position {
///     id: "POS-2".to_string(),
///     title: "Driver".to_string(),
///     monthly_salary: Some(Decimal::new(11_000, 0)),
///     late_deduction_per_minute: None,
/// };
///
/// let settlement =
///     calculate_final_pay(&employee, Some(&position), &[], &PayrollSettings::default()).unwrap();
/// assert_eq!(settlement.final_pay, Decimal::new(2500, 0));
/// ```
pub fn calculate_final_pay(
    employee: &Employee,
    position: Option<&Position>,
    history: &[PayrollRecord],
    settings: &PayrollSettings,
) -> EngineResult<FinalPaySettlement> {
    let daily_rate = settings.daily_rate(monthly_salary_of(position));
    let unused_vacation_days = employee.leave_credits.vacation.max(Decimal::ZERO);
    let leave_credit_payout = unused_vacation_days
        .checked_mul(daily_rate)
        .ok_or_else(|| EngineError::out_of_range("leave credit payout"))?;

    let latest = history
        .iter()
        .filter(|r| r.emp_id == employee.id)
        .max_by_key(|r| r.cut_off.end);

    let mut earnings_breakdown = Vec::new();
    let mut deductions_breakdown = Vec::new();

    if let Some(record) = latest {
        earnings_breakdown.extend(
            record
                .earnings
                .iter()
                .map(|e| BreakdownLine::new(e.description.clone(), e.amount)),
        );

        let statutory = &record.statutory_deductions;
        deductions_breakdown.extend([
            BreakdownLine::new("Tax", statutory.tax),
            BreakdownLine::new("SSS", statutory.sss),
            BreakdownLine::new("PhilHealth", statutory.philhealth),
            BreakdownLine::new("Pag-IBIG", statutory.pagibig),
        ]);
        deductions_breakdown.extend(
            record
                .other_deductions
                .iter()
                .map(|d| BreakdownLine::new(d.description.clone(), d.amount)),
        );
    }

    earnings_breakdown.push(BreakdownLine::new(
        format!("Unused Vacation Leave ({} days)", unused_vacation_days.normalize()),
        leave_credit_payout,
    ));

    let total_earnings = total_of(&earnings_breakdown, "total earnings")?;
    let total_deductions = total_of(&deductions_breakdown, "total deductions")?;
    let final_pay = total_earnings
        .checked_sub(total_deductions)
        .ok_or_else(|| EngineError::out_of_range("final pay"))?;

    info!(
        employee_id = %employee.id,
        last_cut_off = ?latest.map(|r| r.cut_off.to_string()),
        leave_credit_payout = %leave_credit_payout,
        final_pay = %final_pay,
        "Computed final pay"
    );

    Ok(FinalPaySettlement {
        emp_id: employee.id.clone(),
        earnings_breakdown,
        deductions_breakdown,
        unused_vacation_days,
        leave_credit_payout,
        total_earnings,
        total_deductions,
        final_pay,
    })
}

fn total_of(lines: &[BreakdownLine], context: &str) -> EngineResult<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.amount))
        .ok_or_else(|| EngineError::out_of_range(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CutOff, LeaveCredits, OtherDeduction, REGULAR_HOURS, StatutoryDeductions, StatutoryIds,
    };
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn employee(vacation: &str) -> Employee {
        Employee {
            id: "EMP-009".to_string(),
            name: "Garcia, Luis".to_string(),
            position_id: Some("POS-2".to_string()),
            leave_credits: LeaveCredits {
                vacation: dec(vacation),
                sick: dec("4"),
            },
            statutory_ids: StatutoryIds::default(),
        }
    }

    fn position() -> Position {
        Position {
            id: "POS-2".to_string(),
            title: "Driver".to_string(),
            monthly_salary: Some(dec("11000")),
            late_deduction_per_minute: None,
        }
    }

    fn record(emp_id: &str, end_day: u32, regular: &str) -> PayrollRecord {
        let cut_off = CutOff {
            start: NaiveDate::from_ymd_opt(2025, 11, end_day - 14).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 11, end_day).unwrap(),
        };
        let mut record = PayrollRecord::new(emp_id, cut_off);
        record.set_earning(REGULAR_HOURS, None, dec(regular)).unwrap();
        record.statutory_deductions = StatutoryDeductions {
            tax: dec("100"),
            sss: dec("200"),
            philhealth: dec("150"),
            pagibig: dec("50"),
        };
        record
    }

    #[test]
    fn test_no_history_pays_leave_only() {
        let settlement =
            calculate_final_pay(&employee("5"), Some(&position()), &[], &PayrollSettings::default())
                .unwrap();

        assert_eq!(settlement.leave_credit_payout, dec("2500"));
        assert_eq!(settlement.total_earnings, dec("2500"));
        assert_eq!(settlement.total_deductions, Decimal::ZERO);
        assert_eq!(settlement.final_pay, dec("2500"));
        assert_eq!(
            settlement.earnings_breakdown[0].label,
            "Unused Vacation Leave (5 days)"
        );
    }

    #[test]
    fn test_uses_latest_record_of_employee() {
        let history = vec![
            record("EMP-009", 15, "5000"),
            record("EMP-009", 30, "5500"),
            record("EMP-010", 30, "99999"),
        ];
        let settlement = calculate_final_pay(
            &employee("2"),
            Some(&position()),
            &history,
            &PayrollSettings::default(),
        )
        .unwrap();

        // 5,500 earnings + 1,000 payout - 500 deductions
        assert_eq!(settlement.total_earnings, dec("6500"));
        assert_eq!(settlement.total_deductions, dec("500"));
        assert_eq!(settlement.final_pay, dec("6000"));
        assert_eq!(settlement.deductions_breakdown.len(), 4);
        assert_eq!(settlement.deductions_breakdown[3].label, "Pag-IBIG");
    }

    #[test]
    fn test_other_deductions_itemised_and_may_go_negative() {
        let mut last = record("EMP-009", 30, "100");
        last.other_deductions.push(OtherDeduction {
            description: "Equipment".to_string(),
            amount: dec("2000"),
            system_generated: false,
        });
        let settlement = calculate_final_pay(
            &employee("0"),
            Some(&position()),
            &[last],
            &PayrollSettings::default(),
        )
        .unwrap();

        assert_eq!(settlement.deductions_breakdown.last().unwrap().label, "Equipment");
        assert_eq!(settlement.final_pay, dec("-2400"));
    }

    #[test]
    fn test_payout_beyond_decimal_range_is_error() {
        let huge = Position {
            monthly_salary: Some(dec("50000000000000000000000000000")),
            ..position()
        };
        let result =
            calculate_final_pay(&employee("100"), Some(&huge), &[], &PayrollSettings::default());
        assert!(matches!(result, Err(EngineError::AmountOutOfRange { .. })));
    }

    #[test]
    fn test_missing_salary_pays_no_leave() {
        let settlement =
            calculate_final_pay(&employee("5"), None, &[], &PayrollSettings::default()).unwrap();
        assert_eq!(settlement.final_pay, Decimal::ZERO);
    }
}
