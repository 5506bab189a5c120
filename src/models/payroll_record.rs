//! Payroll record models.
//!
//! This module contains the [`PayrollRecord`] produced for one employee and one
//! cut-off, together with the manual adjustment operations a payroll officer
//! performs on a draft record before it is paid.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::DeductionType;

/// Earning row for regular hours.
pub const REGULAR_HOURS: &str = "Regular Hours";
/// Earning row for regular-day overtime.
pub const OVERTIME_PAY: &str = "Overtime Pay";
/// Earning row for the night shift premium.
pub const NIGHT_DIFFERENTIAL: &str = "Night Differential";
/// Earning row for hours worked on a regular holiday.
pub const REGULAR_HOLIDAY_PAY: &str = "Regular Holiday Pay";
/// Earning row for overtime on a regular holiday.
pub const REGULAR_HOLIDAY_PAY_OT: &str = "Regular Holiday Pay OT";
/// Earning row for hours worked on a special non-working day.
pub const SPECIAL_HOLIDAY_PAY: &str = "Special Holiday Pay";
/// Earning row for overtime on a special non-working day.
pub const SPECIAL_HOLIDAY_PAY_OT: &str = "Special Holiday Pay OT";
/// Earning row for fixed allowances.
pub const ALLOWANCE: &str = "Allowance";
/// Earning row for paid leave.
pub const LEAVE_PAY: &str = "Leave Pay";
/// Earning row for manual corrections.
pub const PAY_ADJUSTMENT: &str = "Pay Adjustment";

/// The default earning rows, in payslip order. Always present, even at zero.
pub const DEFAULT_EARNINGS: [&str; 10] = [
    REGULAR_HOURS,
    OVERTIME_PAY,
    NIGHT_DIFFERENTIAL,
    REGULAR_HOLIDAY_PAY,
    REGULAR_HOLIDAY_PAY_OT,
    SPECIAL_HOLIDAY_PAY,
    SPECIAL_HOLIDAY_PAY_OT,
    ALLOWANCE,
    LEAVE_PAY,
    PAY_ADJUSTMENT,
];

/// Suggested descriptions for removable earning rows.
pub const ADDITIONAL_EARNING_TYPES: [&str; 4] =
    ["Incentive", "Commission", "Bonus", "Other Adjustment"];

/// Description of the system-generated lateness deduction.
pub const LATE_DEDUCTION: &str = "Late";

/// The inclusive date range of a pay period.
///
/// # Example
///
/// ```
/// use payroll_engine::models::CutOff;
/// use chrono::NaiveDate;
///
/// let cut_off = CutOff {
///     start: NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
///     end: NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
/// };
/// assert!(cut_off.contains(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()));
/// assert_eq!(cut_off.to_string(), "2025-10-26 to 2025-11-10");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutOff {
    /// First day of the period (inclusive).
    pub start: NaiveDate,
    /// Last day of the period (inclusive).
    pub end: NaiveDate,
}

impl CutOff {
    /// Checks if a given date falls within the cut-off, inclusive of both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for CutOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Whether an earning row belongs to the fixed catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningKind {
    /// One of [`DEFAULT_EARNINGS`]; never removed.
    Default,
    /// A free-form row added by an officer; removable.
    Additional,
}

/// A single earnings row on the payslip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningLine {
    /// Row label.
    pub description: String,
    /// Hours behind the amount; `None` for rows not paid by the hour.
    #[serde(default)]
    pub hours: Option<Decimal>,
    /// Amount earned.
    pub amount: Decimal,
    /// Catalogue membership.
    pub kind: EarningKind,
}

/// Employee shares of the statutory deductions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryDeductions {
    /// Withholding tax.
    pub tax: Decimal,
    /// SSS employee share.
    pub sss: Decimal,
    /// PhilHealth employee share.
    pub philhealth: Decimal,
    /// Pag-IBIG employee share.
    pub pagibig: Decimal,
}

impl StatutoryDeductions {
    /// Sum of the four deductions.
    pub fn total(&self) -> Decimal {
        self.tax + self.sss + self.philhealth + self.pagibig
    }

    /// Sum of the three contributions (everything except tax).
    pub fn contributions_total(&self) -> Decimal {
        self.sss + self.philhealth + self.pagibig
    }

    /// Reads a contribution field.
    pub fn get(&self, field: StatutoryField) -> Decimal {
        match field {
            StatutoryField::Sss => self.sss,
            StatutoryField::PhilHealth => self.philhealth,
            StatutoryField::PagIbig => self.pagibig,
        }
    }

    /// Writes a contribution field.
    pub fn set(&mut self, field: StatutoryField, amount: Decimal) {
        match field {
            StatutoryField::Sss => self.sss = amount,
            StatutoryField::PhilHealth => self.philhealth = amount,
            StatutoryField::PagIbig => self.pagibig = amount,
        }
    }
}

/// A statutory field an officer may edit by hand. Tax is never editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutoryField {
    /// SSS employee share.
    Sss,
    /// PhilHealth employee share.
    #[serde(rename = "philhealth", alias = "phil_health")]
    PhilHealth,
    /// Pag-IBIG employee share.
    #[serde(rename = "pagibig", alias = "hdmf", alias = "pag_ibig")]
    PagIbig,
}

impl StatutoryField {
    /// All editable fields.
    pub const ALL: [StatutoryField; 3] = [
        StatutoryField::Sss,
        StatutoryField::PhilHealth,
        StatutoryField::PagIbig,
    ];

    /// The deduction type whose rule computes this field.
    pub fn deduction_type(&self) -> DeductionType {
        match self {
            StatutoryField::Sss => DeductionType::Sss,
            StatutoryField::PhilHealth => DeductionType::PhilHealth,
            StatutoryField::PagIbig => DeductionType::PagIbig,
        }
    }
}

/// A non-statutory deduction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherDeduction {
    /// Row label; immutable for system-generated rows.
    pub description: String,
    /// Amount deducted.
    pub amount: Decimal,
    /// Whether the engine generated the row.
    #[serde(default)]
    pub system_generated: bool,
}

/// Whether an absence was covered by approved leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsenceKind {
    /// Approved leave; eligible for leave pay.
    Excused,
    /// No approved leave.
    Unexcused,
}

/// One absence within the cut-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    /// Whether the absence is excused.
    #[serde(rename = "description")]
    pub kind: AbsenceKind,
    /// The day of the absence.
    pub date: NaiveDate,
    /// Number of days the absence covers.
    pub total_days: Decimal,
}

/// The leave balance a day of leave pay was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    /// Vacation leave.
    Vacation,
    /// Sick leave.
    Sick,
}

/// Leave pay drawn from one balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePayLine {
    /// The balance consumed.
    pub leave_type: LeaveType,
    /// Whole days consumed.
    pub days: Decimal,
    /// Days × daily rate.
    pub amount: Decimal,
}

/// Lifecycle state of a payroll record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayrollStatus {
    /// Draft; manual adjustments allowed.
    #[default]
    Pending,
    /// Paid; immutable.
    Paid,
}

/// The payroll of one employee for one cut-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    /// The employee the record belongs to.
    pub emp_id: String,
    /// The pay period.
    pub cut_off: CutOff,
    /// Lifecycle state.
    #[serde(default)]
    pub status: PayrollStatus,
    /// Earnings rows: the default catalogue in order, then additional rows.
    pub earnings: Vec<EarningLine>,
    /// Statutory deductions (employee shares).
    #[serde(default)]
    pub statutory_deductions: StatutoryDeductions,
    /// Other deductions.
    #[serde(default)]
    pub other_deductions: Vec<OtherDeduction>,
    /// Absences within the cut-off.
    #[serde(default)]
    pub absences: Vec<Absence>,
    /// How leave pay was funded.
    #[serde(default)]
    pub leave_pay: Vec<LeavePayLine>,
}

impl PayrollRecord {
    /// Creates an empty draft with every default earning row at zero.
    pub fn new(emp_id: impl Into<String>, cut_off: CutOff) -> Self {
        Self {
            emp_id: emp_id.into(),
            cut_off,
            status: PayrollStatus::Pending,
            earnings: default_earnings(),
            statutory_deductions: StatutoryDeductions::default(),
            other_deductions: Vec::new(),
            absences: Vec::new(),
            leave_pay: Vec::new(),
        }
    }

    /// Sum of all earnings.
    pub fn gross_earnings(&self) -> Decimal {
        self.earnings.iter().map(|e| e.amount).sum()
    }

    /// Sum of the other deductions.
    pub fn other_deductions_total(&self) -> Decimal {
        self.other_deductions.iter().map(|d| d.amount).sum()
    }

    /// Statutory plus other deductions.
    pub fn total_deductions(&self) -> Decimal {
        self.statutory_deductions.total() + self.other_deductions_total()
    }

    /// Gross earnings less total deductions.
    pub fn net_pay(&self) -> Decimal {
        self.gross_earnings() - self.total_deductions()
    }

    /// Sum of all earnings, failing instead of overflowing.
    pub fn checked_gross_earnings(&self) -> EngineResult<Decimal> {
        checked_sum(self.earnings.iter().map(|e| e.amount), "gross earnings")
    }

    /// Fails with [`EngineError::AmountOutOfRange`] if any derived total overflows.
    ///
    /// Once this passes, the plain totals above are safe to call.
    pub fn ensure_totals_in_range(&self) -> EngineResult<()> {
        let gross = self.checked_gross_earnings()?;
        let other = checked_sum(
            self.other_deductions.iter().map(|d| d.amount),
            "other deductions",
        )?;
        let s = &self.statutory_deductions;
        let contributions = checked_sum([s.sss, s.philhealth, s.pagibig], "contributions")?;
        gross
            .checked_sub(contributions)
            .ok_or_else(|| EngineError::out_of_range("taxable income"))?;
        let total = contributions
            .checked_add(s.tax)
            .and_then(|statutory| statutory.checked_add(other))
            .ok_or_else(|| EngineError::out_of_range("total deductions"))?;
        gross
            .checked_sub(total)
            .ok_or_else(|| EngineError::out_of_range("net pay"))?;
        Ok(())
    }

    /// Returns the earning row with the given description.
    pub fn earning(&self, description: &str) -> Option<&EarningLine> {
        self.earnings
            .iter()
            .find(|e| e.description.eq_ignore_ascii_case(description))
    }

    /// Number of days on excused absences.
    pub fn excused_days(&self) -> Decimal {
        self.excused_absences().sum()
    }

    /// Like [`PayrollRecord::excused_days`], failing instead of overflowing.
    pub fn checked_excused_days(&self) -> EngineResult<Decimal> {
        checked_sum(self.excused_absences(), "excused days")
    }

    fn excused_absences(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.absences
            .iter()
            .filter(|a| a.kind == AbsenceKind::Excused)
            .map(|a| a.total_days)
    }

    /// Returns true once the record has been paid.
    pub fn is_paid(&self) -> bool {
        self.status == PayrollStatus::Paid
    }

    /// Fails with [`EngineError::PayrollLocked`] if the record is paid.
    pub fn ensure_editable(&self) -> EngineResult<()> {
        if self.is_paid() {
            return Err(EngineError::PayrollLocked {
                emp_id: self.emp_id.clone(),
                cut_off: self.cut_off.to_string(),
            });
        }
        Ok(())
    }

    /// Sets the hours and amount of an existing earning row.
    pub fn set_earning(
        &mut self,
        description: &str,
        hours: Option<Decimal>,
        amount: Decimal,
    ) -> EngineResult<()> {
        self.ensure_editable()?;
        let line = self
            .earnings
            .iter_mut()
            .find(|e| e.description.eq_ignore_ascii_case(description))
            .ok_or_else(|| EngineError::InvalidAdjustment {
                message: format!("no earning row named '{}'", description),
            })?;
        line.hours = hours;
        line.amount = amount;
        Ok(())
    }

    /// Adds a removable earning row.
    pub fn add_earning(&mut self, description: &str, amount: Decimal) -> EngineResult<()> {
        self.ensure_editable()?;
        if DEFAULT_EARNINGS
            .iter()
            .any(|d| d.eq_ignore_ascii_case(description))
        {
            return Err(EngineError::InvalidAdjustment {
                message: format!("'{}' is a default earning row", description),
            });
        }
        self.earnings.push(EarningLine {
            description: description.to_string(),
            hours: None,
            amount,
            kind: EarningKind::Additional,
        });
        Ok(())
    }

    /// Removes an additional earning row by index.
    pub fn remove_earning(&mut self, index: usize) -> EngineResult<EarningLine> {
        self.ensure_editable()?;
        match self.earnings.get(index) {
            None => Err(EngineError::InvalidAdjustment {
                message: format!("no earning row at index {}", index),
            }),
            Some(line) if line.kind == EarningKind::Default => Err(EngineError::InvalidAdjustment {
                message: format!("default earning row '{}' cannot be removed", line.description),
            }),
            Some(_) => Ok(self.earnings.remove(index)),
        }
    }

    /// Adds a free-form deduction row.
    pub fn add_other_deduction(&mut self, description: &str, amount: Decimal) -> EngineResult<()> {
        self.ensure_editable()?;
        self.other_deductions.push(OtherDeduction {
            description: description.to_string(),
            amount,
            system_generated: false,
        });
        Ok(())
    }

    /// Changes the amount of a deduction row. Allowed on system rows.
    pub fn set_other_deduction_amount(&mut self, index: usize, amount: Decimal) -> EngineResult<()> {
        self.ensure_editable()?;
        let row = self.other_deduction_mut(index)?;
        row.amount = amount;
        Ok(())
    }

    /// Renames a free-form deduction row.
    pub fn rename_other_deduction(&mut self, index: usize, description: &str) -> EngineResult<()> {
        self.ensure_editable()?;
        let row = self.other_deduction_mut(index)?;
        if row.system_generated {
            return Err(EngineError::InvalidAdjustment {
                message: format!("system deduction '{}' cannot be renamed", row.description),
            });
        }
        row.description = description.to_string();
        Ok(())
    }

    /// Removes a free-form deduction row.
    pub fn remove_other_deduction(&mut self, index: usize) -> EngineResult<OtherDeduction> {
        self.ensure_editable()?;
        let row = self.other_deduction_mut(index)?;
        if row.system_generated {
            return Err(EngineError::InvalidAdjustment {
                message: format!("system deduction '{}' cannot be removed", row.description),
            });
        }
        Ok(self.other_deductions.remove(index))
    }

    /// Marks an absence as excused or unexcused.
    pub fn set_absence_kind(&mut self, index: usize, kind: AbsenceKind) -> EngineResult<()> {
        self.ensure_editable()?;
        let absence = self
            .absences
            .get_mut(index)
            .ok_or_else(|| EngineError::InvalidAdjustment {
                message: format!("no absence at index {}", index),
            })?;
        absence.kind = kind;
        Ok(())
    }

    /// Overrides a contribution by hand.
    ///
    /// The value only survives recomputes that name `field` in their policy.
    pub fn override_statutory(&mut self, field: StatutoryField, amount: Decimal) -> EngineResult<()> {
        self.ensure_editable()?;
        self.statutory_deductions.set(field, amount);
        Ok(())
    }

    /// Puts back any default earning row missing from the record.
    ///
    /// When a row is missing, the defaults are laid out again in catalogue
    /// order ahead of the additional rows. Rows already present keep their
    /// hours and amount. Returns how many rows were restored.
    pub fn restore_default_earnings(&mut self) -> EngineResult<usize> {
        self.ensure_editable()?;
        let missing = DEFAULT_EARNINGS
            .iter()
            .filter(|d| self.earning(d).is_none())
            .count();
        if missing == 0 {
            return Ok(0);
        }

        let mut rest = std::mem::take(&mut self.earnings);
        let mut earnings = Vec::with_capacity(rest.len() + missing);
        for template in default_earnings() {
            let existing = rest
                .iter()
                .position(|e| e.description.eq_ignore_ascii_case(&template.description));
            earnings.push(match existing {
                Some(index) => EarningLine {
                    kind: EarningKind::Default,
                    ..rest.remove(index)
                },
                None => template,
            });
        }
        earnings.extend(rest);
        self.earnings = earnings;
        Ok(missing)
    }

    /// Marks the record paid, after which it can no longer be adjusted.
    pub fn mark_paid(&mut self) -> EngineResult<()> {
        self.ensure_editable()?;
        self.status = PayrollStatus::Paid;
        Ok(())
    }

    /// Drops zero-amount rows that are neither default nor system-generated.
    pub fn prepare_for_save(&mut self) {
        self.earnings
            .retain(|e| e.kind == EarningKind::Default || !e.amount.is_zero());
        self.other_deductions
            .retain(|d| d.system_generated || !d.amount.is_zero());
    }

    fn other_deduction_mut(&mut self, index: usize) -> EngineResult<&mut OtherDeduction> {
        self.other_deductions
            .get_mut(index)
            .ok_or_else(|| EngineError::InvalidAdjustment {
                message: format!("no deduction row at index {}", index),
            })
    }
}

fn checked_sum(
    amounts: impl IntoIterator<Item = Decimal>,
    context: &str,
) -> EngineResult<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| EngineError::out_of_range(context))
}

/// The default earning rows at zero.
pub fn default_earnings() -> Vec<EarningLine> {
    DEFAULT_EARNINGS
        .iter()
        .map(|description| EarningLine {
            description: description.to_string(),
            hours: None,
            amount: Decimal::ZERO,
            kind: EarningKind::Default,
        })
        .collect()
}
