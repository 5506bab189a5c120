//! Configuration loading and management for the payroll engine.
//!
//! This module provides functionality to load payroll settings, deduction
//! rules and the withholding tax table from YAML files, and the statutory
//! defaults used when no configuration is supplied.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config/ph_statutory").unwrap();
//! println!("Pay frequency: {:?}", loader.config().settings().pay_frequency);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    DeductionRulesFile, EngineConfig, PayFrequency, PayMultipliers, PayrollSettings, RuleSet,
    TaxBracket, TaxTable, TaxTableFile,
};
