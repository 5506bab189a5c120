//! Employee and position models.
//!
//! This module defines the employee snapshot consumed by the engine and the
//! position that carries the employee's monthly salary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Remaining leave balances, in whole days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveCredits {
    /// Vacation leave days remaining.
    #[serde(default)]
    pub vacation: Decimal,
    /// Sick leave days remaining.
    #[serde(default)]
    pub sick: Decimal,
}

/// Government registration numbers, used on contribution reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryIds {
    /// SSS number.
    #[serde(default)]
    pub sss_no: Option<String>,
    /// PhilHealth number.
    #[serde(default)]
    pub philhealth_no: Option<String>,
    /// Pag-IBIG MID number.
    #[serde(default)]
    pub pagibig_no: Option<String>,
    /// Tax identification number.
    #[serde(default)]
    pub tin_no: Option<String>,
}

/// A snapshot of the employee data the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name, used on report rows.
    #[serde(default)]
    pub name: String,
    /// The position the employee holds, if assigned.
    #[serde(default)]
    pub position_id: Option<String>,
    /// Remaining leave balances.
    #[serde(default)]
    pub leave_credits: LeaveCredits,
    /// Government registration numbers.
    #[serde(default)]
    pub statutory_ids: StatutoryIds,
}

/// A job position and its pay terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Unique identifier for the position.
    pub id: String,
    /// Position title.
    #[serde(default)]
    pub title: String,
    /// Monthly salary; missing for incompletely configured positions.
    #[serde(default)]
    pub monthly_salary: Option<Decimal>,
    /// Penalty per minute of lateness.
    #[serde(default)]
    pub late_deduction_per_minute: Option<Decimal>,
}

/// Returns the monthly salary carried by an optional position, or zero.
///
/// # Examples
///
/// ```
/// use payroll_engine::models::{Position, monthly_salary_of};
/// use rust_decimal::Decimal;
///
/// assert_eq!(monthly_salary_of(None), Decimal::ZERO);
///
/// let position = Position {
///     id: "POS-1".to_string(),
///     title: "Cashier".to_string(),
///     monthly_salary: Some(Decimal::new(22_000, 0)),
///     late_deduction_per_minute: None,
/// };
/// assert_eq!(monthly_salary_of(Some(&position)), Decimal::new(22_000, 0));
/// ```
pub fn monthly_salary_of(position: Option<&Position>) -> Decimal {
    position
        .and_then(|p| p.monthly_salary)
        .filter(|salary| *salary > Decimal::ZERO)
        .unwrap_or(Decimal::ZERO)
}
