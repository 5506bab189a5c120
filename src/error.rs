//! Error types for the Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while validating rules and
//! computing payroll.

use thiserror::Error;

/// The main error type for the Payroll Engine.
///
/// All fallible operations in the engine return this error type, making it
/// easy to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/file.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/file.yaml");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A deduction rule or tax table is malformed and was rejected at save time.
    #[error("Invalid rule '{rule}': {message}")]
    Validation {
        /// The identifier of the rejected rule or table.
        rule: String,
        /// A description of what made the rule invalid.
        message: String,
    },

    /// A custom formula could not be evaluated.
    #[error("Failed to evaluate {deduction} formula: {message}")]
    RuleEvaluation {
        /// The deduction the formula belongs to (e.g. "PhilHealth employee").
        deduction: String,
        /// A description of the evaluation failure.
        message: String,
    },

    /// A payroll record was modified after being marked paid.
    #[error("Payroll record for '{emp_id}' ({cut_off}) is paid and cannot be modified")]
    PayrollLocked {
        /// The employee the record belongs to.
        emp_id: String,
        /// The cut-off of the record.
        cut_off: String,
    },

    /// A manual adjustment was not permitted on the targeted row.
    #[error("Invalid adjustment: {message}")]
    InvalidAdjustment {
        /// A description of why the adjustment was rejected.
        message: String,
    },

    /// An amount grew past what a decimal can represent.
    #[error("Amount out of range while computing {context}")]
    AmountOutOfRange {
        /// What was being computed (e.g. "Regular Hours").
        context: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Shorthand for building a [`EngineError::Validation`].
    pub fn validation(rule: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Shorthand for building a [`EngineError::RuleEvaluation`].
    pub fn evaluation(deduction: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::RuleEvaluation {
            deduction: deduction.into(),
            message: message.into(),
        }
    }

    /// Shorthand for building a [`EngineError::AmountOutOfRange`].
    pub fn out_of_range(context: impl Into<String>) -> Self {
        EngineError::AmountOutOfRange {
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/file.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/file.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_validation_displays_rule_and_message() {
        let error = EngineError::validation("sss_standard", "brackets overlap at 20000");
        assert_eq!(
            error.to_string(),
            "Invalid rule 'sss_standard': brackets overlap at 20000"
        );
    }

    #[test]
    fn test_rule_evaluation_displays_deduction_and_message() {
        let error = EngineError::evaluation("PhilHealth employee", "division by zero");
        assert_eq!(
            error.to_string(),
            "Failed to evaluate PhilHealth employee formula: division by zero"
        );
    }

    #[test]
    fn test_payroll_locked_displays_employee_and_cut_off() {
        let error = EngineError::PayrollLocked {
            emp_id: "EMP-001".to_string(),
            cut_off: "2025-10-26 to 2025-11-10".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Payroll record for 'EMP-001' (2025-10-26 to 2025-11-10) is paid and cannot be modified"
        );
    }

    #[test]
    fn test_invalid_adjustment_displays_message() {
        let error = EngineError::InvalidAdjustment {
            message: "default earning rows cannot be removed".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid adjustment: default earning rows cannot be removed"
        );
    }

    #[test]
    fn test_out_of_range_displays_context() {
        let error = EngineError::out_of_range("Pag-IBIG contribution");
        assert_eq!(
            error.to_string(),
            "Amount out of range while computing Pag-IBIG contribution"
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_validation() -> EngineResult<()> {
            Err(EngineError::validation("tax", "empty table"))
        }

        fn propagates_error() -> EngineResult<()> {
            returns_validation()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
