//! Configuration types for payroll computation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files, and the validated
//! containers the calculators read from.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{statutory_default_rule, validate_rule_set, validate_tax_brackets};
use crate::error::{EngineError, EngineResult};
use crate::models::{DeductionRule, DeductionType, RuleKind};

/// How often payroll is run within a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    /// Twice a month; contributions are computed on the monthly equivalent and halved.
    #[default]
    SemiMonthly,
    /// Once a month.
    Monthly,
}

impl PayFrequency {
    /// Number of pay periods in a month.
    pub fn periods_per_month(&self) -> Decimal {
        match self {
            PayFrequency::SemiMonthly => Decimal::TWO,
            PayFrequency::Monthly => Decimal::ONE,
        }
    }
}

fn default_working_days() -> Decimal {
    Decimal::new(22, 0)
}

fn default_hours_per_day() -> Decimal {
    Decimal::new(8, 0)
}

fn one() -> Decimal {
    Decimal::ONE
}

fn two() -> Decimal {
    Decimal::TWO
}

fn one_point_three() -> Decimal {
    Decimal::new(13, 1)
}

fn ten_percent() -> Decimal {
    Decimal::new(10, 2)
}

/// Pay multipliers applied to the hourly rate per day type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayMultipliers {
    /// Regular-day hours.
    #[serde(default = "one")]
    pub regular: Decimal,
    /// Regular-day overtime hours.
    #[serde(default = "one")]
    pub regular_overtime: Decimal,
    /// Regular holiday hours.
    #[serde(default = "two")]
    pub regular_holiday: Decimal,
    /// Regular holiday overtime hours.
    #[serde(default = "two")]
    pub regular_holiday_overtime: Decimal,
    /// Special non-working day hours.
    #[serde(default = "one_point_three")]
    pub special_holiday: Decimal,
    /// Special non-working day overtime hours.
    #[serde(default = "one_point_three")]
    pub special_holiday_overtime: Decimal,
    /// Night shift premium, as a fraction of the hourly rate.
    #[serde(default = "ten_percent")]
    pub night_differential: Decimal,
}

impl Default for PayMultipliers {
    fn default() -> Self {
        Self {
            regular: one(),
            regular_overtime: one(),
            regular_holiday: two(),
            regular_holiday_overtime: two(),
            special_holiday: one_point_three(),
            special_holiday_overtime: one_point_three(),
            night_differential: ten_percent(),
        }
    }
}

/// Payroll settings from settings.yaml.
///
/// # Example
///
/// ```
/// use payroll_engine::config::PayrollSettings;
/// use rust_decimal::Decimal;
///
/// let settings = PayrollSettings::default();
/// assert_eq!(settings.daily_rate(Decimal::new(22_000, 0)), Decimal::new(1000, 0));
/// assert_eq!(settings.hourly_rate(Decimal::new(22_000, 0)), Decimal::new(125, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSettings {
    /// Payroll frequency.
    #[serde(default)]
    pub pay_frequency: PayFrequency,
    /// Working days used to derive the daily rate.
    #[serde(default = "default_working_days")]
    pub working_days_per_month: Decimal,
    /// Hours per working day used to derive the hourly rate.
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: Decimal,
    /// Day-type multipliers.
    #[serde(default)]
    pub multipliers: PayMultipliers,
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            pay_frequency: PayFrequency::default(),
            working_days_per_month: default_working_days(),
            hours_per_day: default_hours_per_day(),
            multipliers: PayMultipliers::default(),
        }
    }
}

impl PayrollSettings {
    /// Monthly salary divided by the working days per month.
    pub fn daily_rate(&self, monthly_salary: Decimal) -> Decimal {
        if self.working_days_per_month <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        monthly_salary / self.working_days_per_month
    }

    /// Daily rate divided by the hours per day.
    pub fn hourly_rate(&self, monthly_salary: Decimal) -> Decimal {
        if self.hours_per_day <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.daily_rate(monthly_salary) / self.hours_per_day
    }

    /// Rejects non-positive divisors and negative multipliers.
    pub fn validate(&self) -> EngineResult<()> {
        if self.working_days_per_month <= Decimal::ZERO {
            return Err(EngineError::validation(
                "settings",
                "working_days_per_month must be positive",
            ));
        }
        if self.hours_per_day <= Decimal::ZERO {
            return Err(EngineError::validation(
                "settings",
                "hours_per_day must be positive",
            ));
        }
        let m = &self.multipliers;
        let all = [
            m.regular,
            m.regular_overtime,
            m.regular_holiday,
            m.regular_holiday_overtime,
            m.special_holiday,
            m.special_holiday_overtime,
            m.night_differential,
        ];
        if all.iter().any(|v| *v < Decimal::ZERO) {
            return Err(EngineError::validation(
                "settings",
                "multipliers must not be negative",
            ));
        }
        Ok(())
    }
}

/// Deduction rules file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct DeductionRulesFile {
    /// The rules, in any order.
    #[serde(default)]
    pub rules: Vec<DeductionRule>,
}

/// A validated collection of deduction rules.
///
/// At most one rule per deduction type is the default. Resolution falls back
/// to the statutory default when the default is missing or incomplete.
///
/// # Example
///
/// ```
/// use payroll_engine::config::RuleSet;
/// use payroll_engine::models::{DeductionType, RuleKind};
///
/// let rules = RuleSet::empty();
/// let sss = rules.resolve(DeductionType::Sss);
/// assert!(matches!(sss.rule, RuleKind::SalaryBracket { .. }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<DeductionRule>,
}

impl RuleSet {
    /// Validates and wraps a list of rules.
    pub fn new(rules: Vec<DeductionRule>) -> EngineResult<Self> {
        validate_rule_set(&rules)?;
        Ok(Self { rules })
    }

    /// A rule set with no rules; every type resolves to its statutory default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// All rules.
    pub fn rules(&self) -> &[DeductionRule] {
        &self.rules
    }

    /// The default rule for a deduction type, if one is configured.
    pub fn default_rule(&self, deduction_type: DeductionType) -> Option<&DeductionRule> {
        self.rules
            .iter()
            .find(|r| r.is_default && r.deduction_type == deduction_type)
    }

    /// The rule the calculator should use for a deduction type.
    pub fn resolve(&self, deduction_type: DeductionType) -> Cow<'_, DeductionRule> {
        match self.default_rule(deduction_type) {
            Some(rule) if rule.is_complete() => Cow::Borrowed(rule),
            _ => Cow::Owned(statutory_default_rule(deduction_type)),
        }
    }
}

/// A bracket of the progressive withholding tax table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Lower bound of taxable income for the bracket.
    pub range_start: Decimal,
    /// Upper bound; `None` for the final, open-ended bracket.
    #[serde(default)]
    pub range_end: Option<Decimal>,
    /// Tax due at `range_start`.
    pub base_tax: Decimal,
    /// Rate on the excess over `range_start`, as a fraction.
    pub marginal_rate: Decimal,
}

/// Tax table file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxTableFile {
    /// Brackets in ascending order.
    pub brackets: Vec<TaxBracket>,
}

/// A validated, ordered withholding tax table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxTable {
    brackets: Vec<TaxBracket>,
}

impl TaxTable {
    /// Validates and wraps a list of brackets.
    pub fn new(brackets: Vec<TaxBracket>) -> EngineResult<Self> {
        validate_tax_brackets("tax_table", &brackets)?;
        Ok(Self { brackets })
    }

    /// The semi-monthly withholding table.
    pub fn semi_monthly_default() -> Self {
        let bracket = |start: i64, end: Option<i64>, base: i64, rate: i64| TaxBracket {
            range_start: Decimal::new(start, 2),
            range_end: end.map(|e| Decimal::new(e, 2)),
            base_tax: Decimal::new(base, 2),
            marginal_rate: Decimal::new(rate, 2),
        };
        Self {
            brackets: vec![
                bracket(0, Some(1_041_667), 0, 0),
                bracket(1_041_667, Some(1_666_667), 0, 15),
                bracket(1_666_667, Some(3_333_250), 93_750, 20),
                bracket(3_333_250, Some(8_333_250), 427_070, 25),
                bracket(8_333_250, Some(33_333_250), 1_677_070, 30),
                bracket(33_333_250, None, 9_177_070, 35),
            ],
        }
    }

    /// Builds a table from a Tax-type salary bracket rule.
    ///
    /// `salary_from` becomes the range start, `fixed_amount` the base tax and
    /// `employee_rate` (a percentage) the marginal rate. Each range ends where
    /// the next begins.
    pub fn from_rule(rule: &DeductionRule) -> EngineResult<Self> {
        let brackets = match (&rule.deduction_type, &rule.rule) {
            (DeductionType::Tax, RuleKind::SalaryBracket { brackets }) => brackets,
            _ => {
                return Err(EngineError::validation(
                    &rule.id,
                    "only Tax salary bracket rules convert to a tax table",
                ));
            }
        };

        let converted = brackets
            .iter()
            .enumerate()
            .map(|(i, b)| TaxBracket {
                range_start: b.salary_from,
                range_end: brackets.get(i + 1).map(|next| next.salary_from),
                base_tax: b.fixed_amount.unwrap_or(Decimal::ZERO),
                marginal_rate: b.employee_rate / Decimal::ONE_HUNDRED,
            })
            .collect::<Vec<_>>();

        validate_tax_brackets(&rule.id, &converted)?;
        Ok(Self {
            brackets: converted,
        })
    }

    /// All brackets in ascending order.
    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// The bracket whose range contains `income`.
    ///
    /// Ranges are half-open on the left: a value equal to a boundary belongs
    /// to the lower bracket. Zero belongs to the first bracket.
    pub fn bracket_for(&self, income: Decimal) -> &TaxBracket {
        self.brackets
            .iter()
            .rev()
            .find(|b| income > b.range_start)
            .unwrap_or(&self.brackets[0])
    }
}

impl Default for TaxTable {
    fn default() -> Self {
        Self::semi_monthly_default()
    }
}

/// The complete engine configuration.
///
/// Immutable once built; the HTTP layer shares it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    settings: PayrollSettings,
    rules: RuleSet,
    tax_table: TaxTable,
}

impl EngineConfig {
    /// Creates a configuration from validated parts.
    pub fn new(settings: PayrollSettings, rules: RuleSet, tax_table: TaxTable) -> Self {
        Self {
            settings,
            rules,
            tax_table,
        }
    }

    /// Statutory defaults with no configured rules.
    pub fn statutory_defaults() -> Self {
        Self::default()
    }

    /// Payroll settings.
    pub fn settings(&self) -> &PayrollSettings {
        &self.settings
    }

    /// Deduction rules.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Withholding tax table.
    pub fn tax_table(&self) -> &TaxTable {
        &self.tax_table
    }

    /// Returns a copy with different settings.
    pub fn with_settings(mut self, settings: PayrollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns a copy with a different rule set.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BelowMinimum, SalaryBracket};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tax_rule(brackets: Vec<SalaryBracket>) -> DeductionRule {
        DeductionRule {
            id: "bir_2023".to_string(),
            name: "BIR Withholding".to_string(),
            deduction_type: DeductionType::Tax,
            min_salary: None,
            max_salary: None,
            below_minimum: BelowMinimum::Zero,
            is_default: true,
            rule: RuleKind::SalaryBracket { brackets },
        }
    }

    fn bracket(from: &str, to: Option<&str>, rate: &str, fixed: &str) -> SalaryBracket {
        SalaryBracket {
            salary_from: dec(from),
            salary_to: to.map(dec),
            employee_rate: dec(rate),
            employer_rate: Decimal::ZERO,
            fixed_amount: Some(dec(fixed)),
            fixed_employer_amount: None,
        }
    }

    #[test]
    fn test_settings_defaults_from_empty_yaml() {
        let settings: PayrollSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, PayrollSettings::default());
        assert_eq!(settings.pay_frequency, PayFrequency::SemiMonthly);
        assert_eq!(settings.multipliers.special_holiday, dec("1.3"));
        assert_eq!(settings.multipliers.night_differential, dec("0.10"));
    }

    #[test]
    fn test_settings_validate_rejects_zero_days() {
        let settings = PayrollSettings {
            working_days_per_month: Decimal::ZERO,
            ..PayrollSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(EngineError::Validation { .. })
        ));
    }

    #[test]
    fn test_default_tax_table_is_valid() {
        let table = TaxTable::semi_monthly_default();
        assert!(TaxTable::new(table.brackets().to_vec()).is_ok());
        assert_eq!(table.brackets().len(), 6);
    }

    #[test]
    fn test_bracket_for_boundaries() {
        let table = TaxTable::semi_monthly_default();
        assert_eq!(table.bracket_for(Decimal::ZERO).range_start, Decimal::ZERO);
        assert_eq!(table.bracket_for(dec("10416.67")).range_start, Decimal::ZERO);
        assert_eq!(table.bracket_for(dec("10416.68")).range_start, dec("10416.67"));
        assert_eq!(table.bracket_for(dec("1000000")).range_start, dec("333332.50"));
    }

    #[test]
    fn test_tax_table_from_rule() {
        let rule = tax_rule(vec![
            bracket("0", Some("10416.67"), "0", "0"),
            bracket("10416.67", Some("16666.67"), "15", "0"),
            bracket("16666.67", None, "20", "937.50"),
        ]);

        let table = TaxTable::from_rule(&rule).unwrap();
        assert_eq!(table.brackets().len(), 3);
        assert_eq!(table.brackets()[1].marginal_rate, dec("0.15"));
        assert_eq!(table.brackets()[1].range_end, Some(dec("16666.67")));
        assert_eq!(table.brackets()[2].range_end, None);
        assert_eq!(table.brackets()[2].base_tax, dec("937.50"));
    }

    #[test]
    fn test_tax_table_from_non_tax_rule_is_rejected() {
        let mut rule = tax_rule(vec![bracket("0", None, "0", "0")]);
        rule.deduction_type = DeductionType::Sss;
        assert!(TaxTable::from_rule(&rule).is_err());
    }

    #[test]
    fn test_rule_set_resolves_statutory_default_when_incomplete() {
        let incomplete = DeductionRule {
            id: "philhealth_draft".to_string(),
            name: "Draft".to_string(),
            deduction_type: DeductionType::PhilHealth,
            min_salary: None,
            max_salary: None,
            below_minimum: BelowMinimum::Zero,
            is_default: true,
            rule: RuleKind::SalaryBracket { brackets: vec![] },
        };
        let rules = RuleSet {
            rules: vec![incomplete],
        };

        let resolved = rules.resolve(DeductionType::PhilHealth);
        assert!(matches!(resolved, Cow::Owned(_)));
        assert!(matches!(resolved.rule, RuleKind::FixedPercentage { .. }));
    }

    #[test]
    fn test_rule_set_rejects_two_defaults() {
        let rule = |id: &str| DeductionRule {
            id: id.to_string(),
            name: String::new(),
            deduction_type: DeductionType::PagIbig,
            min_salary: None,
            max_salary: None,
            below_minimum: BelowMinimum::Zero,
            is_default: true,
            rule: RuleKind::FixedPercentage {
                percentage: dec("2"),
                employee_rate: None,
                employer_rate: None,
            },
        };

        let result = RuleSet::new(vec![rule("a"), rule("b")]);
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }
}
