//! Payroll and Statutory Deduction Engine for Philippine Payroll
//!
//! This crate computes semi-monthly or monthly payroll records from resolved
//! attendance, the SSS, PhilHealth and Pag-IBIG contributions, progressive
//! withholding tax, leave pay and final pay settlements. Deduction rules and
//! the tax table are loaded from YAML configuration and every computation
//! carries an audit trace.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
