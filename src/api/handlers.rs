//! HTTP request handlers for the payroll engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::borrow::Cow;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{
    calculate_contribution, calculate_final_pay, calculate_withholding_tax, eligibility_hint,
    generate_payroll, recompute_payroll, validate_rule,
};
use crate::error::EngineError;
use crate::models::DeductionType;

use super::request::{
    ContributionRequest, FinalPayRequest, GeneratePayrollRequest, RecomputePayrollRequest,
    TaxRequest, ValidateRuleRequest,
};
use super::response::{ApiError, ApiErrorResponse, ContributionResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/contributions", post(contribution_handler))
        .route("/tax", post(tax_handler))
        .route("/payroll/generate", post(generate_handler))
        .route("/payroll/recompute", post(recompute_handler))
        .route("/final-pay", post(final_pay_handler))
        .route("/rules/validate", post(validate_rule_handler))
        .with_state(state)
}

/// Handler for POST /contributions.
///
/// Evaluates the configured rule for a deduction type, or the rule supplied
/// in the request, on a monthly wage base.
async fn contribution_handler(
    State(state): State<AppState>,
    payload: Result<Json<ContributionRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing contribution request");

    let request = match parse_payload(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    if request.deduction_type == DeductionType::Tax {
        warn!(correlation_id = %correlation_id, "Contribution requested for Tax");
        return ApiErrorResponse::bad_request(ApiError::validation_error(
            "Tax is not a contribution; use /tax",
        ))
        .into_response();
    }

    let rule = match request.rule {
        Some(rule) => {
            if rule.deduction_type != request.deduction_type {
                return engine_error(
                    EngineError::validation(
                        &rule.id,
                        format!(
                            "rule computes {}, not {}",
                            rule.deduction_type, request.deduction_type
                        ),
                    ),
                    correlation_id,
                );
            }
            if let Err(err) = validate_rule(&rule) {
                return engine_error(err, correlation_id);
            }
            Cow::Owned(rule)
        }
        None => state.config().rules().resolve(request.deduction_type),
    };

    match calculate_contribution(request.wage_base, &rule) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                deduction_type = %request.deduction_type,
                rule_id = %rule.id,
                employee_share = %result.employee_share,
                "Contribution calculated"
            );
            json_response(
                StatusCode::OK,
                ContributionResponse {
                    deduction_type: request.deduction_type,
                    rule_id: rule.id.clone(),
                    wage_base: request.wage_base,
                    result,
                    eligibility: eligibility_hint(request.deduction_type, request.wage_base),
                },
            )
        }
        Err(err) => engine_error(err, correlation_id),
    }
}

/// Handler for POST /tax.
async fn tax_handler(
    State(state): State<AppState>,
    payload: Result<Json<TaxRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing tax request");

    let request = match parse_payload(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let result = calculate_withholding_tax(request.taxable_income, state.config().tax_table(), 1);
    info!(
        correlation_id = %correlation_id,
        taxable_income = %result.taxable_income,
        tax_withheld = %result.tax_withheld,
        "Withholding tax calculated"
    );
    json_response(StatusCode::OK, result)
}

/// Handler for POST /payroll/generate.
///
/// Builds a draft payroll record from the employee's attendance.
async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePayrollRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing payroll generation request");

    let request = match parse_payload(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let start_time = Instant::now();
    match generate_payroll(
        &request.employee,
        request.position.as_ref(),
        request.cut_off,
        &request.attendance,
        state.config(),
    ) {
        Ok(computation) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %request.employee.id,
                cut_off = %request.cut_off,
                attendance_days = request.attendance.len(),
                net_pay = %computation.totals.net_pay,
                warnings = computation.audit_trace.warnings.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Payroll generated"
            );
            json_response(StatusCode::OK, computation)
        }
        Err(err) => engine_error(err, correlation_id),
    }
}

/// Handler for POST /payroll/recompute.
///
/// Re-derives a draft record after an edit. Paid records are rejected.
async fn recompute_handler(
    State(state): State<AppState>,
    payload: Result<Json<RecomputePayrollRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing payroll recompute request");

    let request = match parse_payload(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match recompute_payroll(
        &request.record,
        &request.employee,
        request.position.as_ref(),
        state.config(),
        request.policy(),
    ) {
        Ok(computation) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %request.record.emp_id,
                editing = ?request.editing,
                net_pay = %computation.totals.net_pay,
                "Payroll recomputed"
            );
            json_response(StatusCode::OK, computation)
        }
        Err(err) => engine_error(err, correlation_id),
    }
}

/// Handler for POST /final-pay.
async fn final_pay_handler(
    State(state): State<AppState>,
    payload: Result<Json<FinalPayRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing final pay request");

    let request = match parse_payload(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match calculate_final_pay(
        &request.employee,
        request.position.as_ref(),
        &request.payroll_history,
        state.config().settings(),
    ) {
        Ok(settlement) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %settlement.emp_id,
                final_pay = %settlement.final_pay,
                "Final pay calculated"
            );
            json_response(StatusCode::OK, settlement)
        }
        Err(err) => engine_error(err, correlation_id),
    }
}

/// Handler for POST /rules/validate.
///
/// Returns 204 when the rule is valid.
async fn validate_rule_handler(
    payload: Result<Json<ValidateRuleRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing rule validation request");

    let request = match parse_payload(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match validate_rule(&request.rule) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => engine_error(err, correlation_id),
    }
}

/// Unwraps a JSON body or builds the 400 response for the rejection.
fn parse_payload<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: Uuid,
) -> Result<T, Response> {
    let rejection = match payload {
        Ok(Json(request)) => return Ok(request),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's message, including the field path
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(ApiErrorResponse::bad_request(error).into_response())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn engine_error(err: EngineError, correlation_id: Uuid) -> Response {
    warn!(
        correlation_id = %correlation_id,
        error = %err,
        "Request failed"
    );
    ApiErrorResponse::from(err).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::TaxWithholdingResult;
    use crate::config::ConfigLoader;
    use crate::models::ContributionResult;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tower::ServiceExt;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/ph_statutory").expect("Failed to load config");
        AppState::new(config)
    }

    async fn post_json(uri: &str, body: &str) -> Response {
        create_router(create_test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_contribution_uses_configured_rule() {
        let response = post_json(
            "/contributions",
            r#"{"deduction_type": "PhilHealth", "wage_base": "25000"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let result: ContributionResponse = body_json(response).await;
        assert_eq!(result.rule_id, "philhealth_2025");
        assert_eq!(
            result.result,
            ContributionResult::from_shares(dec("625"), dec("625"))
        );
        assert!(result.eligibility.unwrap().eligible);
    }

    #[tokio::test]
    async fn test_contribution_with_inline_rule() {
        let response = post_json(
            "/contributions",
            r#"{
                "deduction_type": "Pag-IBIG",
                "wage_base": "10000",
                "rule": {
                    "id": "pagibig_preview",
                    "deduction_type": "Pag-IBIG",
                    "rule": {"type": "custom_formula", "employee_formula": "min(salary * 0.02, 100)"}
                }
            }"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let result: ContributionResponse = body_json(response).await;
        assert_eq!(result.rule_id, "pagibig_preview");
        assert_eq!(result.result.employee_share, dec("100"));
        assert_eq!(result.result.employer_share, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_contribution_for_tax_is_rejected() {
        let response = post_json(
            "/contributions",
            r#"{"deduction_type": "Tax", "wage_base": "25000"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_contribution_mismatched_rule_type() {
        let response = post_json(
            "/contributions",
            r#"{
                "deduction_type": "SSS",
                "wage_base": "25000",
                "rule": {
                    "id": "pagibig_2",
                    "deduction_type": "Pag-IBIG",
                    "rule": {"type": "fixed_percentage", "percentage": "2"}
                }
            }"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("not SSS"));
    }

    #[tokio::test]
    async fn test_tax_endpoint() {
        let response = post_json("/tax", r#"{"taxable_income": "20000"}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        let result: TaxWithholdingResult = body_json(response).await;
        assert_eq!(result.tax_withheld, dec("1604.166"));
        assert_eq!(result.bracket.range_start, dec("16666.67"));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let response = post_json("/tax", "{invalid json").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let response = post_json("/tax", "{}").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("taxable_income"));
    }

    #[tokio::test]
    async fn test_missing_content_type_returns_400() {
        let response = create_router(create_test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tax")
                    .body(Body::from(r#"{"taxable_income": "100"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "MISSING_CONTENT_TYPE");
    }

    #[tokio::test]
    async fn test_validate_valid_rule_returns_204() {
        let response = post_json(
            "/rules/validate",
            r#"{"rule": {
                "id": "pagibig_2",
                "deduction_type": "Pag-IBIG",
                "rule": {"type": "fixed_percentage", "percentage": "2"}
            }}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_validate_bad_formula_returns_400() {
        let response = post_json(
            "/rules/validate",
            r#"{"rule": {
                "id": "pagibig_bad",
                "deduction_type": "Pag-IBIG",
                "rule": {"type": "custom_formula", "employee_formula": "salary * rate"}
            }}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
    }
}
