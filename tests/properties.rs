//! Property tests for the calculation invariants.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use payroll_engine::calculation::{
    RecomputePolicy, calculate_contribution, calculate_leave_pay, calculate_withholding_tax,
    generate_payroll, recompute_payroll, sss_monthly_salary_credit,
};
use payroll_engine::config::{ConfigLoader, EngineConfig, TaxTable};
use payroll_engine::models::{
    AttendanceDay, AttendanceStatus, BelowMinimum, CutOff, DayType, DeductionRule, DeductionType,
    Employee, LeaveCredits, Position, RuleKind, StatutoryIds,
};

// =============================================================================
// Strategies
// =============================================================================

/// Amounts from 0 to 1,000,000.00 in centavos.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn contribution_type() -> impl Strategy<Value = DeductionType> {
    prop_oneof![
        Just(DeductionType::Sss),
        Just(DeductionType::PhilHealth),
        Just(DeductionType::PagIbig),
    ]
}

fn status() -> impl Strategy<Value = AttendanceStatus> {
    prop_oneof![
        4 => Just(AttendanceStatus::Present),
        1 => Just(AttendanceStatus::Late),
        1 => Just(AttendanceStatus::Absent),
        1 => Just(AttendanceStatus::OnLeave),
    ]
}

fn day_type() -> impl Strategy<Value = DayType> {
    prop_oneof![
        6 => Just(DayType::Regular),
        1 => Just(DayType::RegularHoliday),
        1 => Just(DayType::SpecialHoliday),
    ]
}

/// One entry per day of the first November cut-off.
fn attendance() -> impl Strategy<Value = Vec<AttendanceDay>> {
    prop::collection::vec(
        (status(), day_type(), 0i64..=8, 0i64..=4, 0i64..=3, 0u32..=60),
        15,
    )
    .prop_map(|days| {
        days.into_iter()
            .enumerate()
            .map(|(i, (status, day_type, hours, ot, night, late))| AttendanceDay {
                date: NaiveDate::from_ymd_opt(2025, 11, i as u32 + 1).unwrap(),
                status,
                day_type,
                hours: Decimal::new(hours, 0),
                overtime_hours: Decimal::new(ot, 0),
                night_differential_hours: Decimal::new(night, 0),
                late_minutes: if status == AttendanceStatus::Late { late } else { 0 },
            })
            .collect()
    })
}

// =============================================================================
// Fixtures
// =============================================================================

fn cut_off() -> CutOff {
    CutOff {
        start: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
    }
}

fn employee(vacation: i64, sick: i64) -> Employee {
    Employee {
        id: "EMP-PROP".to_string(),
        name: "Reyes, Carlo".to_string(),
        position_id: Some("POS-P".to_string()),
        leave_credits: LeaveCredits {
            vacation: Decimal::new(vacation, 0),
            sick: Decimal::new(sick, 0),
        },
        statutory_ids: StatutoryIds::default(),
    }
}

fn position(monthly_salary: Decimal) -> Position {
    Position {
        id: "POS-P".to_string(),
        title: "Technician".to_string(),
        monthly_salary: Some(monthly_salary),
        late_deduction_per_minute: Some(Decimal::new(150, 2)),
    }
}

fn shipped_config() -> EngineConfig {
    ConfigLoader::load("./config/ph_statutory")
        .expect("Failed to load config")
        .config()
        .clone()
}

// =============================================================================
// Contributions
// =============================================================================

proptest! {
    #[test]
    fn fixed_percentage_shares_sum_to_total(
        wage in amount(),
        percentage in (0i64..=2000).prop_map(|p| Decimal::new(p, 2)),
        deduction_type in contribution_type(),
        floor in any::<bool>(),
    ) {
        let rule = DeductionRule {
            id: "prop_rule".to_string(),
            name: String::new(),
            deduction_type,
            min_salary: Some(Decimal::new(10_000, 0)),
            max_salary: Some(Decimal::new(100_000, 0)),
            below_minimum: if floor { BelowMinimum::Floor } else { BelowMinimum::Zero },
            is_default: true,
            rule: RuleKind::FixedPercentage {
                percentage,
                employee_rate: None,
                employer_rate: None,
            },
        };

        let result = calculate_contribution(wage, &rule).unwrap();
        prop_assert_eq!(result.employee_share + result.employer_share, result.total);
        prop_assert!(result.employee_share >= Decimal::ZERO);
        prop_assert!(result.employer_share >= Decimal::ZERO);
    }

    #[test]
    fn sss_salary_credit_is_bounded_multiple_of_500(wage in amount()) {
        let msc = sss_monthly_salary_credit(wage);
        prop_assert!(msc >= Decimal::new(4_000, 0));
        prop_assert!(msc <= Decimal::new(30_000, 0));
        prop_assert!((msc % Decimal::new(500, 0)).is_zero());
    }

    // =========================================================================
    // Withholding Tax
    // =========================================================================

    #[test]
    fn tax_is_monotonic_and_non_negative(a in amount(), b in amount()) {
        let table = TaxTable::semi_monthly_default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let low_tax = calculate_withholding_tax(low, &table, 1).tax_withheld;
        let high_tax = calculate_withholding_tax(high, &table, 1).tax_withheld;
        prop_assert!(low_tax >= Decimal::ZERO);
        prop_assert!(low_tax <= high_tax);
    }

    #[test]
    fn tax_on_non_positive_income_is_zero(cents in -100_000_000i64..=0) {
        let table = TaxTable::semi_monthly_default();
        let result = calculate_withholding_tax(Decimal::new(cents, 2), &table, 1);
        prop_assert_eq!(result.tax_withheld, Decimal::ZERO);
    }

    // =========================================================================
    // Leave Pay
    // =========================================================================

    #[test]
    fn leave_pay_never_exceeds_excused_days(
        excused in 0i64..=15,
        vacation in 0i64..=10,
        sick in 0i64..=10,
        daily_rate in amount(),
    ) {
        let excused = Decimal::new(excused, 0);
        let credits = LeaveCredits {
            vacation: Decimal::new(vacation, 0),
            sick: Decimal::new(sick, 0),
        };

        let result = calculate_leave_pay(excused, &credits, daily_rate, 1).unwrap();
        prop_assert!(result.days_paid <= excused);
        prop_assert!(result.total_amount <= excused * daily_rate);
        prop_assert_eq!(result.days_paid + result.unpaid_days, excused);
    }
}

// =============================================================================
// Payroll Aggregation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn net_pay_is_gross_less_deductions(
        days in attendance(),
        salary in (10_000i64..=200_000).prop_map(|s| Decimal::new(s, 0)),
        vacation in 0i64..=5,
        sick in 0i64..=5,
    ) {
        let config = shipped_config();
        let position = position(salary);
        let computation = generate_payroll(
            &employee(vacation, sick),
            Some(&position),
            cut_off(),
            &days,
            &config,
        )
        .unwrap();

        let record = &computation.record;
        prop_assert_eq!(
            record.net_pay(),
            record.gross_earnings() - record.total_deductions()
        );
        prop_assert_eq!(computation.totals.net_pay, record.net_pay());
        prop_assert!(record.statutory_deductions.tax >= Decimal::ZERO);
    }

    #[test]
    fn recompute_is_idempotent(
        days in attendance(),
        salary in (10_000i64..=200_000).prop_map(|s| Decimal::new(s, 0)),
        vacation in 0i64..=5,
    ) {
        let config = shipped_config();
        let employee = employee(vacation, 2);
        let position = position(salary);
        let generated =
            generate_payroll(&employee, Some(&position), cut_off(), &days, &config).unwrap();

        let once = recompute_payroll(
            &generated.record,
            &employee,
            Some(&position),
            &config,
            RecomputePolicy::full(),
        )
        .unwrap();
        let twice = recompute_payroll(
            &once.record,
            &employee,
            Some(&position),
            &config,
            RecomputePolicy::full(),
        )
        .unwrap();

        prop_assert_eq!(&once.record, &generated.record);
        prop_assert_eq!(once.record, twice.record);
    }
}
