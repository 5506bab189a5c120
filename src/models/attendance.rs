//! Resolved attendance models.
//!
//! Attendance arrives already interpreted: one [`AttendanceDay`] per scheduled
//! day, with its status and the hours that count toward pay.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The resolved status of a scheduled day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Worked the day.
    Present,
    /// Worked the day but signed in late.
    Late,
    /// Did not work and had no approved leave.
    Absent,
    /// Did not work and was on approved leave.
    OnLeave,
}

/// The kind of calendar day, which selects the earning row and multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    /// An ordinary working day.
    #[default]
    Regular,
    /// A regular public holiday.
    RegularHoliday,
    /// A special non-working day.
    SpecialHoliday,
}

/// One day of resolved attendance.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{AttendanceDay, AttendanceStatus, DayType};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let day = AttendanceDay {
///     date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
///     status: AttendanceStatus::Present,
///     day_type: DayType::Regular,
///     hours: Decimal::new(8, 0),
///     overtime_hours: Decimal::ZERO,
///     night_differential_hours: Decimal::ZERO,
///     late_minutes: 0,
/// };
/// assert!(day.worked());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceDay {
    /// The calendar date.
    pub date: NaiveDate,
    /// The resolved status.
    pub status: AttendanceStatus,
    /// The kind of day.
    #[serde(default)]
    pub day_type: DayType,
    /// Regular hours worked (capped at the scheduled hours by the caller).
    #[serde(default)]
    pub hours: Decimal,
    /// Overtime hours worked.
    #[serde(default)]
    pub overtime_hours: Decimal,
    /// Hours worked between 22:00 and 06:00.
    #[serde(default)]
    pub night_differential_hours: Decimal,
    /// Minutes late at sign-in.
    #[serde(default)]
    pub late_minutes: u32,
}

impl AttendanceDay {
    /// Returns true if the day contributes worked hours.
    pub fn worked(&self) -> bool {
        matches!(
            self.status,
            AttendanceStatus::Present | AttendanceStatus::Late
        ) && (self.hours > Decimal::ZERO || self.overtime_hours > Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(status: AttendanceStatus, hours: i64) -> AttendanceDay {
        AttendanceDay {
            date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            status,
            day_type: DayType::Regular,
            hours: Decimal::new(hours, 0),
            overtime_hours: Decimal::ZERO,
            night_differential_hours: Decimal::ZERO,
            late_minutes: 0,
        }
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"date": "2025-11-03", "status": "on_leave"}"#;
        let parsed: AttendanceDay = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.status, AttendanceStatus::OnLeave);
        assert_eq!(parsed.day_type, DayType::Regular);
        assert_eq!(parsed.hours, Decimal::ZERO);
        assert_eq!(parsed.late_minutes, 0);
    }

    #[test]
    fn test_present_with_hours_worked() {
        assert!(day(AttendanceStatus::Present, 8).worked());
        assert!(day(AttendanceStatus::Late, 6).worked());
    }

    #[test]
    fn test_present_without_hours_not_worked() {
        assert!(!day(AttendanceStatus::Present, 0).worked());
    }

    #[test]
    fn test_absent_never_worked() {
        assert!(!day(AttendanceStatus::Absent, 8).worked());
        assert!(!day(AttendanceStatus::OnLeave, 8).worked());
    }
}
