//! Response types for the payroll engine API.
//!
//! This module defines the success payloads that are not plain domain models,
//! the error response structure, and the mapping from engine errors to HTTP
//! status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::EligibilityHint;
use crate::error::EngineError;
use crate::models::{ContributionResult, DeductionType};

/// Response body for the `/contributions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionResponse {
    /// The contribution computed.
    pub deduction_type: DeductionType,
    /// The rule that was evaluated.
    pub rule_id: String,
    /// The wage base the rule was evaluated on.
    pub wage_base: Decimal,
    /// Employee, employer and total shares.
    #[serde(flatten)]
    pub result: ContributionResult,
    /// Whether the wage meets the customary threshold; informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilityHint>,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response with the given body.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::ConfigNotFound { path } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    format!("Configuration file not found: {}", path),
                ),
            },
            EngineError::ConfigParseError { path, message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration parse error",
                    format!("Failed to parse {}: {}", path, message),
                ),
            },
            EngineError::Validation { rule, .. } => ApiErrorResponse::bad_request(
                ApiError::with_details("VALIDATION_ERROR", message, format!("rule: {}", rule)),
            ),
            EngineError::RuleEvaluation { deduction, .. } => ApiErrorResponse::bad_request(
                ApiError::with_details(
                    "RULE_EVALUATION_ERROR",
                    message,
                    format!("deduction: {}", deduction),
                ),
            ),
            EngineError::PayrollLocked { .. } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::new("PAYROLL_LOCKED", message),
            },
            EngineError::InvalidAdjustment { .. } => {
                ApiErrorResponse::bad_request(ApiError::new("INVALID_ADJUSTMENT", message))
            }
            EngineError::AmountOutOfRange { .. } => {
                ApiErrorResponse::bad_request(ApiError::new("AMOUNT_OUT_OF_RANGE", message))
            }
        }
    }
}
