//! HTTP-facing error types (spec.md §7).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use outpost_core::{ErrorCategory, OutpostError};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Maps [`OutpostError`] onto the status codes spec.md §7's table
/// implies: validation/conflict/not_found/auth are client errors and
/// never retried; everything else surfaces as a retryable 5xx.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] OutpostError),

    #[error("destination is disabled")]
    DestinationDisabled,

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Pipeline(err) => {
                let status = match err.category() {
                    ErrorCategory::Permanent => StatusCode::NOT_FOUND,
                    ErrorCategory::Security => StatusCode::UNAUTHORIZED,
                    ErrorCategory::Transient => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!(error = %err, "unexpected pipeline error");
                } else {
                    warn!(error = %err, "pipeline error surfaced to client");
                }
                (status, err.to_string())
            }
            ApiError::DestinationDisabled => (
                StatusCode::BAD_REQUEST,
                "Destination is disabled".to_string(),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
