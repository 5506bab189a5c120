//! Leave pay calculation.
//!
//! Excused absences are paid from the employee's leave balances, vacation
//! first and then sick. Balances are drawn in whole days; a fractional
//! remainder stays on the balance. Days neither balance covers stay unpaid.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, LEAVE_PAY, LeaveCredits, LeavePayLine, LeaveType};

/// The result of leave pay calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePayResult {
    /// One line per balance drawn from, vacation before sick.
    pub lines: Vec<LeavePayLine>,
    /// Total leave pay.
    pub total_amount: Decimal,
    /// Days paid from leave balances.
    pub days_paid: Decimal,
    /// Excused days no balance could cover.
    pub unpaid_days: Decimal,
    /// Audit step recording the consumption.
    pub audit_step: AuditStep,
}

/// Funds excused absence days from vacation, then sick leave.
///
/// Each balance contributes `min(outstanding, floor(remaining))` days at
/// `daily_rate`.
///
/// # Errors
///
/// Returns [`EngineError::AmountOutOfRange`] when the pay overflows.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_leave_pay;
/// use payroll_engine::models::{LeaveCredits, LeaveType};
/// use rust_decimal::Decimal;
///
/// let credits = LeaveCredits { vacation: Decimal::new(2, 0), sick: Decimal::new(5, 0) };
/// let result =
///     calculate_leave_pay(Decimal::new(3, 0), &credits, Decimal::new(500, 0), 1).unwrap();
///
/// assert_eq!(result.lines.len(), 2);
/// assert_eq!(result.lines[0].leave_type, LeaveType::Vacation);
/// assert_eq!(result.lines[1].days, Decimal::ONE);
/// assert_eq!(result.total_amount, Decimal::new(1500, 0));
/// ```
pub fn calculate_leave_pay(
    excused_days: Decimal,
    credits: &LeaveCredits,
    daily_rate: Decimal,
    step_number: u32,
) -> EngineResult<LeavePayResult> {
    let mut outstanding = excused_days.max(Decimal::ZERO);
    let mut lines = Vec::new();

    for (leave_type, available) in [
        (LeaveType::Vacation, credits.vacation),
        (LeaveType::Sick, credits.sick),
    ] {
        let available = available.floor();
        if outstanding <= Decimal::ZERO || available <= Decimal::ZERO {
            continue;
        }
        let days = outstanding.min(available);
        let amount = days
            .checked_mul(daily_rate)
            .ok_or_else(|| EngineError::out_of_range(LEAVE_PAY))?;
        lines.push(LeavePayLine {
            leave_type,
            days,
            amount,
        });
        outstanding -= days;
    }

    let total_amount = lines
        .iter()
        .try_fold(Decimal::ZERO, |total, l| total.checked_add(l.amount))
        .ok_or_else(|| EngineError::out_of_range(LEAVE_PAY))?;
    let days_paid: Decimal = lines.iter().map(|l| l.days).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "leave_pay".to_string(),
        rule_name: "Leave Pay".to_string(),
        input: serde_json::json!({
            "excused_days": excused_days.to_string(),
            "vacation_remaining": credits.vacation.to_string(),
            "sick_remaining": credits.sick.to_string(),
            "daily_rate": daily_rate.to_string(),
        }),
        output: serde_json::json!({
            "lines": lines.iter().map(|l| serde_json::json!({
                "leave_type": format!("{:?}", l.leave_type),
                "days": l.days.to_string(),
                "amount": l.amount.to_string(),
            })).collect::<Vec<_>>(),
            "total_amount": total_amount.to_string(),
            "unpaid_days": outstanding.to_string(),
        }),
        reasoning: format!(
            "{} excused day(s): {} paid from leave at {} per day, {} unpaid",
            excused_days.normalize(),
            days_paid.normalize(),
            daily_rate.normalize(),
            outstanding.normalize()
        ),
    };

    Ok(LeavePayResult {
        lines,
        total_amount,
        days_paid,
        unpaid_days: outstanding,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn credits(vacation: &str, sick: &str) -> LeaveCredits {
        LeaveCredits {
            vacation: dec(vacation),
            sick: dec(sick),
        }
    }

    #[test]
    fn test_vacation_consumed_before_sick() {
        let result = calculate_leave_pay(dec("3"), &credits("2", "5"), dec("500"), 1).unwrap();

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].leave_type, LeaveType::Vacation);
        assert_eq!(result.lines[0].days, dec("2"));
        assert_eq!(result.lines[1].leave_type, LeaveType::Sick);
        assert_eq!(result.lines[1].days, dec("1"));
        assert_eq!(result.total_amount, dec("1500"));
        assert_eq!(result.unpaid_days, Decimal::ZERO);
    }

    #[test]
    fn test_vacation_alone_covers_absences() {
        let result = calculate_leave_pay(dec("2"), &credits("10", "5"), dec("500"), 1).unwrap();
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].leave_type, LeaveType::Vacation);
        assert_eq!(result.total_amount, dec("1000"));
    }

    #[test]
    fn test_leftover_days_unpaid_without_row() {
        let result = calculate_leave_pay(dec("5"), &credits("1", "1"), dec("500"), 1).unwrap();
        assert_eq!(result.days_paid, dec("2"));
        assert_eq!(result.unpaid_days, dec("3"));
        assert_eq!(result.total_amount, dec("1000"));
        assert_eq!(result.lines.len(), 2);
    }

    #[test]
    fn test_no_balances_no_lines() {
        let result = calculate_leave_pay(dec("2"), &credits("0", "0"), dec("500"), 1).unwrap();
        assert!(result.lines.is_empty());
        assert_eq!(result.total_amount, Decimal::ZERO);
        assert_eq!(result.unpaid_days, dec("2"));
    }

    #[test]
    fn test_fractional_balance_drawn_in_whole_days() {
        let result = calculate_leave_pay(dec("3"), &credits("1.5", "5"), dec("500"), 1).unwrap();

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].leave_type, LeaveType::Vacation);
        assert_eq!(result.lines[0].days, dec("1"));
        assert_eq!(result.lines[1].leave_type, LeaveType::Sick);
        assert_eq!(result.lines[1].days, dec("2"));
        assert_eq!(result.total_amount, dec("1500"));
    }

    #[test]
    fn test_balance_below_one_day_is_skipped() {
        let result = calculate_leave_pay(dec("1"), &credits("0.5", "0.75"), dec("500"), 1).unwrap();
        assert!(result.lines.is_empty());
        assert_eq!(result.unpaid_days, dec("1"));
    }

    #[test]
    fn test_pay_beyond_decimal_range_is_error() {
        let result = calculate_leave_pay(
            dec("10"),
            &credits("10", "0"),
            dec("30000000000000000000000000000"),
            1,
        );
        assert!(matches!(result, Err(EngineError::AmountOutOfRange { .. })));
    }

    #[test]
    fn test_no_excused_days() {
        let result = calculate_leave_pay(Decimal::ZERO, &credits("5", "5"), dec("500"), 3).unwrap();
        assert!(result.lines.is_empty());
        assert_eq!(result.audit_step.step_number, 3);
    }
}
