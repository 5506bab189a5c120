//! Payroll period aggregation.
//!
//! This module turns an employee's resolved attendance into a draft
//! [`PayrollRecord`] and recomputes the derived parts of an edited draft.
//!
//! ## Order of application
//!
//! 1. Attendance days become earnings, absences and lateness
//! 2. Excused absences are funded from leave balances
//! 3. SSS, PhilHealth and Pag-IBIG are computed from gross earnings
//! 4. Tax is computed from gross earnings less the three contributions
//!
//! Steps 2 to 4 are repeated on every recompute. Tax is always recomputed;
//! a contribution keeps its value only when the caller is editing it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, PayrollSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Absence, AbsenceKind, AttendanceDay, AttendanceStatus, AuditTrace, AuditWarning,
    ContributionResult, CutOff, DayType, Employee, LATE_DEDUCTION, LEAVE_PAY, NIGHT_DIFFERENTIAL,
    OVERTIME_PAY, OtherDeduction, PayrollRecord, Position, REGULAR_HOLIDAY_PAY,
    REGULAR_HOLIDAY_PAY_OT, REGULAR_HOURS, SPECIAL_HOLIDAY_PAY, SPECIAL_HOLIDAY_PAY_OT,
    StatutoryField, monthly_salary_of,
};

use super::contribution::calculate_period_contribution;
use super::leave_pay::calculate_leave_pay;
use super::tax::{calculate_withholding_tax, taxable_income};

/// Warning code for an employee whose position carries no salary.
pub const MISSING_SALARY: &str = "MISSING_SALARY";

/// Warning code for a custom formula that failed during recompute.
pub const RULE_EVALUATION_ERROR: &str = "RULE_EVALUATION_ERROR";

/// Warning code for an attendance day outside the cut-off.
pub const DAY_OUTSIDE_CUT_OFF: &str = "DAY_OUTSIDE_CUT_OFF";

/// Warning code for a recomputed record that lacked default earning rows.
pub const DEFAULT_EARNINGS_RESTORED: &str = "DEFAULT_EARNINGS_RESTORED";

/// Which statutory field, if any, the caller is editing by hand.
///
/// The edited field keeps its current value through the recompute; every other
/// contribution and the tax are recomputed.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::RecomputePolicy;
/// use payroll_engine::models::StatutoryField;
///
/// let policy = RecomputePolicy::editing(StatutoryField::PhilHealth);
/// assert!(policy.keeps(StatutoryField::PhilHealth));
/// assert!(!policy.keeps(StatutoryField::Sss));
/// assert!(!RecomputePolicy::full().keeps(StatutoryField::Sss));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputePolicy {
    /// The field being edited.
    #[serde(default)]
    pub editing: Option<StatutoryField>,
}

impl RecomputePolicy {
    /// Recompute every contribution.
    pub fn full() -> Self {
        Self::default()
    }

    /// Keep `field` as the caller set it.
    pub fn editing(field: StatutoryField) -> Self {
        Self {
            editing: Some(field),
        }
    }

    /// Returns true if `field` keeps its current value.
    pub fn keeps(&self, field: StatutoryField) -> bool {
        self.editing == Some(field)
    }
}

/// Full contribution results, including the employer shares the record omits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryContributions {
    /// SSS contribution for the period.
    pub sss: ContributionResult,
    /// PhilHealth contribution for the period.
    pub philhealth: ContributionResult,
    /// Pag-IBIG contribution for the period.
    pub pagibig: ContributionResult,
}

impl StatutoryContributions {
    /// Reads the result for a field.
    pub fn get(&self, field: StatutoryField) -> ContributionResult {
        match field {
            StatutoryField::Sss => self.sss,
            StatutoryField::PhilHealth => self.philhealth,
            StatutoryField::PagIbig => self.pagibig,
        }
    }

    fn set(&mut self, field: StatutoryField, result: ContributionResult) {
        match field {
            StatutoryField::Sss => self.sss = result,
            StatutoryField::PhilHealth => self.philhealth = result,
            StatutoryField::PagIbig => self.pagibig = result,
        }
    }
}

/// Derived totals of a payroll record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    /// Sum of all earnings.
    pub gross_earnings: Decimal,
    /// Income the withholding tax was computed on.
    pub taxable_income: Decimal,
    /// Tax plus the three contribution employee shares.
    pub statutory_deductions: Decimal,
    /// Sum of other deductions.
    pub other_deductions: Decimal,
    /// Statutory plus other deductions.
    pub total_deductions: Decimal,
    /// Gross earnings less total deductions.
    pub net_pay: Decimal,
}

impl PayrollTotals {
    /// Computes the totals of a record.
    pub fn of(record: &PayrollRecord) -> Self {
        let gross_earnings = record.gross_earnings();
        Self {
            gross_earnings,
            taxable_income: taxable_income(gross_earnings, &record.statutory_deductions),
            statutory_deductions: record.statutory_deductions.total(),
            other_deductions: record.other_deductions_total(),
            total_deductions: record.total_deductions(),
            net_pay: record.net_pay(),
        }
    }
}

/// The output of generating or recomputing a payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollComputation {
    /// The draft record.
    pub record: PayrollRecord,
    /// Derived totals.
    pub totals: PayrollTotals,
    /// Employee and employer shares per contribution.
    pub contributions: StatutoryContributions,
    /// How the record was computed.
    pub audit_trace: AuditTrace,
}

#[derive(Debug, Default)]
struct HoursByDayType {
    regular: BTreeMap<DayTypeKey, Decimal>,
    overtime: BTreeMap<DayTypeKey, Decimal>,
    night: Decimal,
    late_minutes: Decimal,
}

impl HoursByDayType {
    fn add_day(&mut self, day: &AttendanceDay) -> EngineResult<()> {
        let key = DayTypeKey::from(day.day_type);
        let (row, ot_row) = key.rows();
        accumulate(self.regular.entry(key).or_default(), day.hours, row)?;
        accumulate(self.overtime.entry(key).or_default(), day.overtime_hours, ot_row)?;
        accumulate(&mut self.night, day.night_differential_hours, NIGHT_DIFFERENTIAL)?;
        accumulate(&mut self.late_minutes, Decimal::from(day.late_minutes), LATE_DEDUCTION)
    }
}

fn accumulate(total: &mut Decimal, value: Decimal, context: &str) -> EngineResult<()> {
    *total = total
        .checked_add(value)
        .ok_or_else(|| EngineError::out_of_range(context))?;
    Ok(())
}

/// `a × b × c`, failing instead of overflowing.
fn checked_product(a: Decimal, b: Decimal, c: Decimal, context: &str) -> EngineResult<Decimal> {
    a.checked_mul(b)
        .and_then(|ab| ab.checked_mul(c))
        .ok_or_else(|| EngineError::out_of_range(context))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DayTypeKey {
    Regular,
    RegularHoliday,
    SpecialHoliday,
}

impl From<DayType> for DayTypeKey {
    fn from(day_type: DayType) -> Self {
        match day_type {
            DayType::Regular => DayTypeKey::Regular,
            DayType::RegularHoliday => DayTypeKey::RegularHoliday,
            DayType::SpecialHoliday => DayTypeKey::SpecialHoliday,
        }
    }
}

impl DayTypeKey {
    fn rows(self) -> (&'static str, &'static str) {
        match self {
            DayTypeKey::Regular => (REGULAR_HOURS, OVERTIME_PAY),
            DayTypeKey::RegularHoliday => (REGULAR_HOLIDAY_PAY, REGULAR_HOLIDAY_PAY_OT),
            DayTypeKey::SpecialHoliday => (SPECIAL_HOLIDAY_PAY, SPECIAL_HOLIDAY_PAY_OT),
        }
    }

    fn multipliers(self, settings: &PayrollSettings) -> (Decimal, Decimal) {
        let m = &settings.multipliers;
        match self {
            DayTypeKey::Regular => (m.regular, m.regular_overtime),
            DayTypeKey::RegularHoliday => (m.regular_holiday, m.regular_holiday_overtime),
            DayTypeKey::SpecialHoliday => (m.special_holiday, m.special_holiday_overtime),
        }
    }
}

/// Generates the draft payroll record for one employee and cut-off.
///
/// Attendance days are walked in date order. A missing position or salary
/// never fails: the record is fully shaped with zero amounts and the trace
/// carries a `MISSING_SALARY` warning. Hours or rates large enough to
/// overflow an amount fail with [`EngineError::AmountOutOfRange`].
///
/// # Arguments
///
/// * `employee` - The employee snapshot, including leave balances
/// * `position` - The employee's position, which carries the monthly salary
/// * `cut_off` - The pay period
/// * `attendance` - Resolved attendance; days outside the cut-off are skipped
/// * `config` - Settings, deduction rules and tax table
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::generate_payroll;
/// use payroll_engine::config::EngineConfig;
/// use payroll_engine::models::{
///     AttendanceDay, AttendanceStatus, CutOff, DayType, Employee, LeaveCredits, Position,
///     StatutoryIds,
/// };
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let employee = Employee {
///     id: "EMP-001".to_string(),
///     name: "Santos, Ana".to_string(),
///     position_id: Some("POS-1".to_string()),
///     leave_credits: LeaveCredits::default(),
///     statutory_ids: StatutoryIds::default(),
/// };
/// let position = Position {
///     id: "POS-1".to_string(),
///     title: "Clerk".to_string(),
///     monthly_salary: Some(Decimal::new(22_000, 0)),
///     late_deduction_per_minute: None,
/// };
/// let cut_off = CutOff {
///     start: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
///     end: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
/// };
/// let attendance = vec![AttendanceDay {
///     date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
///     status: AttendanceStatus::Present,
///     day_type: DayType::Regular,
///     hours: Decimal::new(8, 0),
///     overtime_hours: Decimal::ZERO,
///     night_differential_hours: Decimal::ZERO,
///     late_minutes: 0,
/// }];
///
/// let config = EngineConfig::statutory_defaults();
/// let result = generate_payroll(&employee, Some(&position), cut_off, &attendance, &config).unwrap();
/// assert_eq!(result.totals.gross_earnings, Decimal::new(1000, 0));
/// assert_eq!(result.totals.net_pay, result.record.net_pay());
/// ```
pub fn generate_payroll(
    employee: &Employee,
    position: Option<&Position>,
    cut_off: CutOff,
    attendance: &[AttendanceDay],
    config: &EngineConfig,
) -> EngineResult<PayrollComputation> {
    let settings = config.settings();
    let mut trace = AuditTrace::default();
    let mut record = PayrollRecord::new(&employee.id, cut_off);

    let monthly_salary = resolve_salary(employee, position, &mut trace);
    let hourly_rate = settings.hourly_rate(monthly_salary);

    trace.record(
        "rates",
        "Pay Rates",
        serde_json::json!({
            "monthly_salary": monthly_salary.to_string(),
            "working_days_per_month": settings.working_days_per_month.to_string(),
            "hours_per_day": settings.hours_per_day.to_string(),
        }),
        serde_json::json!({
            "daily_rate": settings.daily_rate(monthly_salary).to_string(),
            "hourly_rate": hourly_rate.to_string(),
        }),
        format!(
            "Monthly salary {} / {} days / {} hours = {} per hour",
            monthly_salary.normalize(),
            settings.working_days_per_month.normalize(),
            settings.hours_per_day.normalize(),
            hourly_rate.normalize()
        ),
    );

    let mut days: Vec<&AttendanceDay> = attendance.iter().collect();
    days.sort_by_key(|d| d.date);

    let mut hours = HoursByDayType::default();
    for day in days {
        if !cut_off.contains(day.date) {
            trace.warn(AuditWarning::new(
                DAY_OUTSIDE_CUT_OFF,
                format!("Attendance on {} is outside cut-off {}", day.date, cut_off),
                "low",
            ));
            continue;
        }

        match day.status {
            AttendanceStatus::Present | AttendanceStatus::Late if day.worked() => {
                hours.add_day(day)?;
            }
            AttendanceStatus::Present | AttendanceStatus::Late | AttendanceStatus::Absent => {
                record.absences.push(absence(AbsenceKind::Unexcused, day));
            }
            AttendanceStatus::OnLeave => {
                record.absences.push(absence(AbsenceKind::Excused, day));
            }
        }
    }

    apply_hourly_earnings(&mut record, &hours, hourly_rate, settings, &mut trace)?;
    apply_late_deduction(&mut record, hours.late_minutes, position, &mut trace)?;

    let contributions = apply_derived(
        &mut record,
        employee,
        monthly_salary,
        config,
        RecomputePolicy::full(),
        &mut trace,
    )?;

    let totals = PayrollTotals::of(&record);
    info!(
        employee_id = %employee.id,
        cut_off = %cut_off,
        gross_earnings = %totals.gross_earnings,
        net_pay = %totals.net_pay,
        absences = record.absences.len(),
        "Generated payroll record"
    );

    Ok(PayrollComputation {
        record,
        totals,
        contributions,
        audit_trace: trace,
    })
}

/// Recomputes the derived parts of an edited draft record.
///
/// Missing default earning rows are restored first. Leave pay is re-derived
/// from the record's excused absences, contributions are recomputed from
/// current gross earnings except the field named by `policy`, and tax is
/// always recomputed. A custom formula that fails keeps that contribution's
/// prior value and adds a `RULE_EVALUATION_ERROR` warning.
///
/// Recomputing the output again with the same inputs yields the same record.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::PayrollLocked`] if the record is paid
/// and [`crate::error::EngineError::AmountOutOfRange`] if an amount overflows.
pub fn recompute_payroll(
    record: &PayrollRecord,
    employee: &Employee,
    position: Option<&Position>,
    config: &EngineConfig,
    policy: RecomputePolicy,
) -> EngineResult<PayrollComputation> {
    record.ensure_editable()?;

    let mut trace = AuditTrace::default();
    let mut record = record.clone();

    let restored = record.restore_default_earnings()?;
    if restored > 0 {
        debug!(employee_id = %employee.id, restored, "Restored missing default earning rows");
        trace.warn(AuditWarning::new(
            DEFAULT_EARNINGS_RESTORED,
            format!("{} default earning row(s) were missing and restored at zero", restored),
            "low",
        ));
    }

    let monthly_salary = resolve_salary(employee, position, &mut trace);

    let contributions = apply_derived(
        &mut record,
        employee,
        monthly_salary,
        config,
        policy,
        &mut trace,
    )?;

    let totals = PayrollTotals::of(&record);
    debug!(
        employee_id = %employee.id,
        cut_off = %record.cut_off,
        editing = ?policy.editing,
        net_pay = %totals.net_pay,
        "Recomputed payroll record"
    );

    Ok(PayrollComputation {
        record,
        totals,
        contributions,
        audit_trace: trace,
    })
}

fn resolve_salary(employee: &Employee, position: Option<&Position>, trace: &mut AuditTrace) -> Decimal {
    let monthly_salary = monthly_salary_of(position);
    if monthly_salary.is_zero() {
        warn!(employee_id = %employee.id, "No monthly salary configured; using zero");
        trace.warn(AuditWarning::new(
            MISSING_SALARY,
            format!(
                "Employee '{}' has no position salary; earnings default to zero",
                employee.id
            ),
            "medium",
        ));
    }
    monthly_salary
}

fn absence(kind: AbsenceKind, day: &AttendanceDay) -> Absence {
    Absence {
        kind,
        date: day.date,
        total_days: Decimal::ONE,
    }
}

fn apply_hourly_earnings(
    record: &mut PayrollRecord,
    hours: &HoursByDayType,
    hourly_rate: Decimal,
    settings: &PayrollSettings,
    trace: &mut AuditTrace,
) -> EngineResult<()> {
    for key in [
        DayTypeKey::Regular,
        DayTypeKey::RegularHoliday,
        DayTypeKey::SpecialHoliday,
    ] {
        let (row, ot_row) = key.rows();
        let (multiplier, ot_multiplier) = key.multipliers(settings);

        for (label, row_hours, row_multiplier) in [
            (row, hours.regular.get(&key), multiplier),
            (ot_row, hours.overtime.get(&key), ot_multiplier),
        ] {
            let Some(&row_hours) = row_hours.filter(|h| **h > Decimal::ZERO) else {
                continue;
            };
            let amount = checked_product(row_hours, hourly_rate, row_multiplier, label)?;
            record.set_earning(label, Some(row_hours), amount)?;
            trace.record(
                "hourly_earnings",
                label,
                serde_json::json!({
                    "hours": row_hours.to_string(),
                    "hourly_rate": hourly_rate.to_string(),
                    "multiplier": row_multiplier.to_string(),
                }),
                serde_json::json!({ "amount": amount.to_string() }),
                format!(
                    "{} hours × {} × {} = {}",
                    row_hours.normalize(),
                    hourly_rate.normalize(),
                    row_multiplier.normalize(),
                    amount.normalize()
                ),
            );
        }
    }

    if hours.night > Decimal::ZERO {
        let premium = settings.multipliers.night_differential;
        let amount = checked_product(hours.night, hourly_rate, premium, NIGHT_DIFFERENTIAL)?;
        record.set_earning(NIGHT_DIFFERENTIAL, Some(hours.night), amount)?;
        trace.record(
            "night_differential",
            NIGHT_DIFFERENTIAL,
            serde_json::json!({
                "hours": hours.night.to_string(),
                "hourly_rate": hourly_rate.to_string(),
                "premium": premium.to_string(),
            }),
            serde_json::json!({ "amount": amount.to_string() }),
            format!(
                "{} night hours × {} × {} premium = {}",
                hours.night.normalize(),
                hourly_rate.normalize(),
                premium.normalize(),
                amount.normalize()
            ),
        );
    }

    Ok(())
}

fn apply_late_deduction(
    record: &mut PayrollRecord,
    late_minutes: Decimal,
    position: Option<&Position>,
    trace: &mut AuditTrace,
) -> EngineResult<()> {
    let per_minute = position
        .and_then(|p| p.late_deduction_per_minute)
        .unwrap_or(Decimal::ZERO);
    let amount = late_minutes
        .checked_mul(per_minute)
        .ok_or_else(|| EngineError::out_of_range(LATE_DEDUCTION))?;
    if amount <= Decimal::ZERO {
        return Ok(());
    }

    record.other_deductions.push(OtherDeduction {
        description: LATE_DEDUCTION.to_string(),
        amount,
        system_generated: true,
    });
    trace.record(
        "late_deduction",
        LATE_DEDUCTION,
        serde_json::json!({
            "late_minutes": late_minutes.to_string(),
            "per_minute": per_minute.to_string(),
        }),
        serde_json::json!({ "amount": amount.to_string() }),
        format!(
            "{} minutes late × {} = {}",
            late_minutes.normalize(),
            per_minute.normalize(),
            amount.normalize()
        ),
    );
    Ok(())
}

/// Leave pay, contributions and tax: the parts every recompute refreshes.
fn apply_derived(
    record: &mut PayrollRecord,
    employee: &Employee,
    monthly_salary: Decimal,
    config: &EngineConfig,
    policy: RecomputePolicy,
    trace: &mut AuditTrace,
) -> EngineResult<StatutoryContributions> {
    let settings = config.settings();

    let leave = calculate_leave_pay(
        record.checked_excused_days()?,
        &employee.leave_credits,
        settings.daily_rate(monthly_salary),
        trace.next_step_number(),
    )?;
    let leave_hours = if leave.days_paid.is_zero() {
        None
    } else {
        Some(
            leave
                .days_paid
                .checked_mul(settings.hours_per_day)
                .ok_or_else(|| EngineError::out_of_range(LEAVE_PAY))?,
        )
    };
    record.set_earning(LEAVE_PAY, leave_hours, leave.total_amount)?;
    record.leave_pay = leave.lines;
    trace.steps.push(leave.audit_step);

    let gross = record.checked_gross_earnings()?;
    let frequency = settings.pay_frequency;
    let mut contributions = StatutoryContributions::default();

    for field in StatutoryField::ALL {
        let deduction_type = field.deduction_type();
        let rule = config.rules().resolve(deduction_type);

        let computed = if gross <= Decimal::ZERO {
            Ok(ContributionResult::ZERO)
        } else {
            calculate_period_contribution(gross, &rule, frequency)
        };

        match computed {
            Ok(result) => {
                contributions.set(field, result);
                let kept = policy.keeps(field);
                if !kept {
                    record.statutory_deductions.set(field, result.employee_share);
                }
                trace.record(
                    &rule.id,
                    rule.display_name(),
                    serde_json::json!({
                        "deduction_type": deduction_type.to_string(),
                        "gross_earnings": gross.to_string(),
                        "pay_frequency": format!("{:?}", frequency),
                    }),
                    serde_json::json!({
                        "employee_share": result.employee_share.to_string(),
                        "employer_share": result.employer_share.to_string(),
                        "total": result.total.to_string(),
                        "applied": record.statutory_deductions.get(field).to_string(),
                    }),
                    if kept {
                        format!(
                            "{} computed as {} but kept at the edited value {}",
                            deduction_type,
                            result.employee_share.normalize(),
                            record.statutory_deductions.get(field).normalize()
                        )
                    } else {
                        format!(
                            "{} employee share {} from gross {}",
                            deduction_type,
                            result.employee_share.normalize(),
                            gross.normalize()
                        )
                    },
                );
            }
            Err(err @ EngineError::AmountOutOfRange { .. }) => return Err(err),
            Err(err) => {
                let prior = record.statutory_deductions.get(field);
                warn!(
                    employee_id = %employee.id,
                    rule_id = %rule.id,
                    error = %err,
                    "Contribution rule failed; keeping prior value"
                );
                contributions.set(
                    field,
                    ContributionResult::from_shares(prior, Decimal::ZERO),
                );
                trace.warn(AuditWarning::new(
                    RULE_EVALUATION_ERROR,
                    format!("{} (kept prior value {})", err, prior.normalize()),
                    "high",
                ));
            }
        }
    }

    // Tax is always recomputed; clear the stale value before range-checking.
    record.statutory_deductions.tax = Decimal::ZERO;
    record.ensure_totals_in_range()?;
    let taxable = taxable_income(gross, &record.statutory_deductions);
    let tax = calculate_withholding_tax(taxable, config.tax_table(), trace.next_step_number());
    record.statutory_deductions.tax = tax.tax_withheld;
    trace.steps.push(tax.audit_step);
    record.ensure_totals_in_range()?;

    Ok(contributions)
}
