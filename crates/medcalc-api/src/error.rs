//! Error handling for the MedCalc API
//!
//! Engine and store failures are folded into [`ApiError`], which maps each case to an
//! HTTP status and a JSON body carrying a stable error code.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use medcalc_core::{CalculatorError, EvaluationError, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    /// Inputs failed the calculator's field constraints (422)
    #[error("{0}")]
    Validation(ValidationError),

    /// The formula could not be evaluated for these inputs (422)
    #[error("{0}")]
    Evaluation(EvaluationError),

    /// Malformed request (400)
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Unknown calculator or record (404)
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Calculation store failure (503)
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Anything else (500)
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Evaluation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Evaluation(e) => e.error_code(),
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Storage { .. } => "STORAGE_ERROR",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Convert to ApiErrorResponse format for JSON serialization
    pub fn to_response(&self, request_id: Option<String>) -> ApiErrorResponse {
        let details = match self {
            ApiError::Validation(e) => serde_json::to_value(&e.violations)
                .ok()
                .map(|violations| serde_json::json!({ "violations": violations })),
            ApiError::Evaluation(e) => {
                e.expression().map(|expression| serde_json::json!({ "expression": expression }))
            }
            _ => None,
        };

        ApiErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details,
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// JSON-serializable error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Request ID for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "Request failed");
        } else {
            warn!(code = self.error_code(), error = %self, "Request rejected");
        }

        (status, Json(self.to_response(None))).into_response()
    }
}

/// Convenience constructors for common error scenarios
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<CalculatorError> for ApiError {
    fn from(err: CalculatorError) -> Self {
        match err {
            CalculatorError::Validation(e) => ApiError::Validation(e),
            CalculatorError::Evaluation(e) => ApiError::Evaluation(e),
            CalculatorError::NotFound { id } => ApiError::not_found(format!("calculator '{}'", id)),
            CalculatorError::Definition(e) => ApiError::bad_request(e.to_string()),
            CalculatorError::Json(e) => ApiError::bad_request(e.to_string()),
            CalculatorError::Io(e) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<EvaluationError> for ApiError {
    fn from(err: EvaluationError) -> Self {
        ApiError::Evaluation(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage { message: err.to_string() }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use medcalc_core::{FieldViolation, ViolationReason};

    #[test]
    fn evaluation_errors_keep_engine_codes() {
        let err: ApiError = EvaluationError::DivisionByZero { expression: "4 / 0".to_string() }.into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "DIVISION_BY_ZERO");

        let response = err.to_response(Some("req-1".to_string()));
        assert_eq!(response.details, Some(serde_json::json!({"expression": "4 / 0"})));
        assert_eq!(response.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn validation_errors_list_violations() {
        let err: ApiError = ValidationError {
            violations: vec![FieldViolation {
                field: "weight".to_string(),
                reason: ViolationReason::Missing,
            }],
        }
        .into();

        let response = err.to_response(None);
        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(
            response.details,
            Some(serde_json::json!({"violations": [{"field": "weight", "reason": {"kind": "missing"}}]}))
        );
    }

    #[test]
    fn engine_errors_map_to_statuses() {
        let not_found: ApiError = CalculatorError::NotFound { id: "x".to_string() }.into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let storage: ApiError = StoreError::Unavailable("down".to_string()).into();
        assert_eq!(storage.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
