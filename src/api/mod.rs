//! HTTP API module for the payroll engine.
//!
//! This module provides the REST API endpoints for computing statutory
//! contributions, withholding tax, payroll records and final pay.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ContributionRequest, FinalPayRequest, GeneratePayrollRequest, RecomputePayrollRequest,
    TaxRequest, ValidateRuleRequest,
};
pub use response::{ApiError, ApiErrorResponse, ContributionResponse};
pub use state::AppState;
