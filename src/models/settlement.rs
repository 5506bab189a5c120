//! Final pay settlement models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A labelled amount on the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    /// Line label.
    pub label: String,
    /// Line amount.
    pub amount: Decimal,
}

impl BreakdownLine {
    /// Creates a breakdown line.
    pub fn new(label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// The one-time settlement paid to a separating employee.
///
/// Derived on demand; never persisted. `final_pay` may be negative when the
/// last period's deductions exceed its earnings plus the leave payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPaySettlement {
    /// The separating employee.
    pub emp_id: String,
    /// Earnings of the latest period, then the unused leave payout.
    pub earnings_breakdown: Vec<BreakdownLine>,
    /// Statutory and other deductions of the latest period.
    pub deductions_breakdown: Vec<BreakdownLine>,
    /// Unused vacation days paid out.
    pub unused_vacation_days: Decimal,
    /// Payout for the unused vacation days.
    pub leave_credit_payout: Decimal,
    /// Sum of the earnings breakdown.
    pub total_earnings: Decimal,
    /// Sum of the deductions breakdown.
    pub total_deductions: Decimal,
    /// Total earnings less total deductions.
    pub final_pay: Decimal,
}
