//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{DeductionType, RuleKind};

use super::types::{
    DeductionRulesFile, EngineConfig, PayrollSettings, RuleSet, TaxTable, TaxTableFile,
};

/// Loads and provides access to payroll configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory,
/// validates them, and exposes the resulting [`EngineConfig`].
///
/// # Directory Structure
///
/// ```text
/// config/ph_statutory/
/// ├── settings.yaml         # Pay frequency, rate divisors and multipliers
/// ├── deduction_rules.yaml  # SSS, PhilHealth, Pag-IBIG and tax rules
/// └── tax_table.yaml        # Withholding tax brackets
/// ```
///
/// A default Tax rule of the salary bracket kind in `deduction_rules.yaml`
/// takes precedence over `tax_table.yaml`.
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::models::DeductionType;
///
/// let loader = ConfigLoader::load("./config/ph_statutory").unwrap();
/// let sss = loader.config().rules().resolve(DeductionType::Sss);
/// println!("SSS rule: {}", sss.display_name());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/ph_statutory")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - Any rule, the rule set or the tax table fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<PayrollSettings>(&path.join("settings.yaml"))?;
        settings.validate()?;

        let rules_file = Self::load_yaml::<DeductionRulesFile>(&path.join("deduction_rules.yaml"))?;
        let rules = RuleSet::new(rules_file.rules)?;

        let tax_table = match rules.default_rule(DeductionType::Tax) {
            Some(rule) if matches!(rule.rule, RuleKind::SalaryBracket { .. }) => {
                TaxTable::from_rule(rule)?
            }
            _ => {
                let table_file = Self::load_yaml::<TaxTableFile>(&path.join("tax_table.yaml"))?;
                TaxTable::new(table_file.brackets)?
            }
        };

        info!(
            path = %path.display(),
            rules = rules.rules().len(),
            tax_brackets = tax_table.brackets().len(),
            pay_frequency = ?settings.pay_frequency,
            "Loaded payroll configuration"
        );

        Ok(Self {
            config: EngineConfig::new(settings, rules, tax_table),
        })
    }

    /// A loader holding the statutory defaults, for use without configuration files.
    pub fn statutory_defaults() -> Self {
        Self {
            config: EngineConfig::statutory_defaults(),
        }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
