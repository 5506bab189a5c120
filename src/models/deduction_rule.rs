//! Deduction rule models.
//!
//! This module defines the [`DeductionRule`] type and its rule kinds. Rules are
//! authored by payroll administrators, validated when saved, and evaluated by the
//! contribution calculator for every payroll recompute.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The government deduction a rule or contribution belongs to.
///
/// # Example
///
/// ```
/// use payroll_engine::models::DeductionType;
///
/// assert_eq!(DeductionType::PagIbig.to_string(), "Pag-IBIG");
/// assert_eq!(serde_json::to_string(&DeductionType::Sss).unwrap(), "\"SSS\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeductionType {
    /// Social Security System contribution.
    #[serde(rename = "SSS", alias = "sss")]
    Sss,
    /// PhilHealth premium.
    #[serde(rename = "PhilHealth", alias = "philhealth")]
    PhilHealth,
    /// Pag-IBIG (HDMF) savings contribution.
    #[serde(rename = "Pag-IBIG", alias = "PagIbig", alias = "pagibig")]
    PagIbig,
    /// Withholding tax.
    #[serde(rename = "Tax", alias = "tax")]
    Tax,
}

impl DeductionType {
    /// The three contribution types that are computed from a rule.
    pub const CONTRIBUTIONS: [DeductionType; 3] = [
        DeductionType::Sss,
        DeductionType::PhilHealth,
        DeductionType::PagIbig,
    ];
}

impl fmt::Display for DeductionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeductionType::Sss => "SSS",
            DeductionType::PhilHealth => "PhilHealth",
            DeductionType::PagIbig => "Pag-IBIG",
            DeductionType::Tax => "Tax",
        };
        f.write_str(label)
    }
}

/// What happens when the wage base is below a rule's `min_salary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BelowMinimum {
    /// The contribution is zero.
    #[default]
    Zero,
    /// The basis is raised to `min_salary` (an income floor).
    Floor,
}

/// A salary range within a [`RuleKind::SalaryBracket`] rule.
///
/// # Example
///
/// ```
/// use payroll_engine::models::SalaryBracket;
/// use rust_decimal::Decimal;
///
/// let bracket = SalaryBracket {
///     salary_from: Decimal::new(5000, 0),
///     salary_to: None,
///     employee_rate: Decimal::new(45, 1),
///     employer_rate: Decimal::new(95, 1),
///     fixed_amount: None,
///     fixed_employer_amount: None,
/// };
/// assert!(bracket.contains(Decimal::new(1_000_000, 0)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryBracket {
    /// Lower bound of the bracket (inclusive).
    pub salary_from: Decimal,
    /// Upper bound of the bracket (inclusive); `None` means open-ended.
    #[serde(default)]
    pub salary_to: Option<Decimal>,
    /// Employee rate as a percentage of the basis.
    #[serde(default)]
    pub employee_rate: Decimal,
    /// Employer rate as a percentage of the basis.
    #[serde(default)]
    pub employer_rate: Decimal,
    /// Fixed employee share used instead of `employee_rate`.
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    /// Fixed employer share used instead of `employer_rate`.
    #[serde(default)]
    pub fixed_employer_amount: Option<Decimal>,
}

impl SalaryBracket {
    /// Returns true if `value` lies within the bracket bounds.
    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.salary_from && self.salary_to.is_none_or(|to| value <= to)
    }
}

/// The evaluation strategy of a deduction rule.
///
/// Serialized with an internal `type` tag so rule files read naturally:
///
/// ```
/// use payroll_engine::models::RuleKind;
///
/// let kind: RuleKind = serde_json::from_str(
///     r#"{"type": "custom_formula", "employee_formula": "salary * 0.02"}"#,
/// ).unwrap();
/// assert!(matches!(kind, RuleKind::CustomFormula { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// A flat percentage of the clamped wage base, split per statute.
    FixedPercentage {
        /// Total contribution as a percentage of the basis.
        percentage: Decimal,
        /// Explicit employee rate; used with `employer_rate` instead of the statutory split.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        employee_rate: Option<Decimal>,
        /// Explicit employer rate; used with `employee_rate` instead of the statutory split.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        employer_rate: Option<Decimal>,
    },
    /// A table of salary ranges, each with its own rates or fixed amounts.
    SalaryBracket {
        /// Brackets in ascending order of `salary_from`.
        brackets: Vec<SalaryBracket>,
    },
    /// Employee-authored arithmetic over the variable `salary`.
    CustomFormula {
        /// Formula for the employee share.
        employee_formula: String,
        /// Formula for the employer share; zero when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        employer_formula: Option<String>,
    },
}

/// A configurable government deduction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRule {
    /// Unique identifier of the rule.
    pub id: String,
    /// Human-readable name of the rule.
    #[serde(default)]
    pub name: String,
    /// The deduction this rule computes.
    pub deduction_type: DeductionType,
    /// Wage below which the `below_minimum` policy applies.
    #[serde(default)]
    pub min_salary: Option<Decimal>,
    /// Wage above which the basis is capped.
    #[serde(default)]
    pub max_salary: Option<Decimal>,
    /// Behaviour for wages below `min_salary`.
    #[serde(default)]
    pub below_minimum: BelowMinimum,
    /// Whether this is the active rule for its deduction type.
    #[serde(default)]
    pub is_default: bool,
    /// How the rule is evaluated.
    pub rule: RuleKind,
}

impl DeductionRule {
    /// Returns true if the rule carries enough data to be evaluated.
    ///
    /// Incomplete rules are skipped in favour of the statutory default.
    pub fn is_complete(&self) -> bool {
        match &self.rule {
            RuleKind::FixedPercentage {
                percentage,
                employee_rate,
                employer_rate,
            } => {
                *percentage > Decimal::ZERO || (employee_rate.is_some() && employer_rate.is_some())
            }
            RuleKind::SalaryBracket { brackets } => !brackets.is_empty(),
            RuleKind::CustomFormula {
                employee_formula, ..
            } => !employee_formula.trim().is_empty(),
        }
    }

    /// A short name for audit output: the rule name, or its id when unnamed.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// The employee, employer and total shares of one contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionResult {
    /// Amount withheld from the employee.
    pub employee_share: Decimal,
    /// Amount paid by the employer.
    pub employer_share: Decimal,
    /// Sum of both shares.
    pub total: Decimal,
}

impl ContributionResult {
    /// A zero contribution.
    pub const ZERO: ContributionResult = ContributionResult {
        employee_share: Decimal::ZERO,
        employer_share: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    /// Builds a result whose total is the sum of the two shares.
    pub fn from_shares(employee_share: Decimal, employer_share: Decimal) -> Self {
        Self {
            employee_share,
            employer_share,
            total: employee_share + employer_share,
        }
    }

    /// Like [`ContributionResult::from_shares`], but `None` when the total overflows.
    pub fn checked_from_shares(employee_share: Decimal, employer_share: Decimal) -> Option<Self> {
        employee_share
            .checked_add(employer_share)
            .map(|total| Self {
                employee_share,
                employer_share,
                total,
            })
    }

    /// Divides every share by `divisor` (used for per-period amounts).
    pub fn divided_by(self, divisor: Decimal) -> Self {
        if divisor == Decimal::ONE || divisor.is_zero() {
            return self;
        }
        Self::from_shares(self.employee_share / divisor, self.employer_share / divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_deduction_type_serialization() {
        assert_eq!(serde_json::to_string(&DeductionType::Sss).unwrap(), "\"SSS\"");
        assert_eq!(
            serde_json::to_string(&DeductionType::PagIbig).unwrap(),
            "\"Pag-IBIG\""
        );
        let parsed: DeductionType = serde_json::from_str("\"PagIbig\"").unwrap();
        assert_eq!(parsed, DeductionType::PagIbig);
    }

    #[test]
    fn test_deserialize_bracket_rule() {
        let json = r#"{
            "id": "sss_standard",
            "name": "SSS Standard",
            "deduction_type": "SSS",
            "is_default": true,
            "rule": {
                "type": "salary_bracket",
                "brackets": [
                    {"salary_from": "0", "employee_rate": "4.5", "employer_rate": "9.5"}
                ]
            }
        }"#;

        let rule: DeductionRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.deduction_type, DeductionType::Sss);
        assert_eq!(rule.below_minimum, BelowMinimum::Zero);
        match &rule.rule {
            RuleKind::SalaryBracket { brackets } => {
                assert_eq!(brackets.len(), 1);
                assert_eq!(brackets[0].salary_to, None);
                assert_eq!(brackets[0].employer_rate, dec("9.5"));
            }
            other => panic!("Expected SalaryBracket, got {:?}", other),
        }
    }

    #[test]
    fn test_bracket_contains_is_inclusive() {
        let bracket = SalaryBracket {
            salary_from: dec("1000"),
            salary_to: Some(dec("2000")),
            employee_rate: dec("1"),
            employer_rate: dec("2"),
            fixed_amount: None,
            fixed_employer_amount: None,
        };
        assert!(bracket.contains(dec("1000")));
        assert!(bracket.contains(dec("2000")));
        assert!(!bracket.contains(dec("999.99")));
        assert!(!bracket.contains(dec("2000.01")));
    }

    #[test]
    fn test_incomplete_rules() {
        let mut rule = DeductionRule {
            id: "r1".to_string(),
            name: String::new(),
            deduction_type: DeductionType::PhilHealth,
            min_salary: None,
            max_salary: None,
            below_minimum: BelowMinimum::Zero,
            is_default: true,
            rule: RuleKind::SalaryBracket { brackets: vec![] },
        };
        assert!(!rule.is_complete());

        rule.rule = RuleKind::CustomFormula {
            employee_formula: "  ".to_string(),
            employer_formula: None,
        };
        assert!(!rule.is_complete());

        rule.rule = RuleKind::FixedPercentage {
            percentage: dec("5"),
            employee_rate: None,
            employer_rate: None,
        };
        assert!(rule.is_complete());
        assert_eq!(rule.display_name(), "r1");
    }

    #[test]
    fn test_contribution_divided_by_keeps_total_consistent() {
        let result = ContributionResult::from_shares(dec("1350"), dec("2850"));
        let halved = result.divided_by(dec("2"));
        assert_eq!(halved.employee_share, dec("675"));
        assert_eq!(halved.employer_share, dec("1425"));
        assert_eq!(halved.total, dec("2100"));
    }
}
