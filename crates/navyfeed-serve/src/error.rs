//! API error types and response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type that converts to XRPC-style HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested feed is not published by this service or has no
    /// registered algorithm.
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    /// Credentials were supplied but could not be accepted. Absent
    /// credentials never produce this; they resolve to an anonymous caller.
    #[error("authentication failed: {0}")]
    AuthRequired(String),

    /// The caller exhausted its request budget for the current window.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Invalid request parameters (malformed feed URI or cursor).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Store failure on the read path.
    #[error("store error: {0}")]
    Store(#[from] navyfeed_ingest::IngestError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body, XRPC style.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::UnsupportedAlgorithm => (
                StatusCode::BAD_REQUEST,
                "UnsupportedAlgorithm",
                Some("Unsupported algorithm".to_string()),
            ),
            Self::AuthRequired(msg) => {
                (StatusCode::UNAUTHORIZED, "AuthRequired", Some(msg.clone()))
            }
            Self::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                Some("Rate limit exceeded. Please try again later.".to_string()),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "InvalidRequest", Some(msg.clone())),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", Some(msg.clone())),
            Self::Store(err) => {
                tracing::error!(error = %err, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    Some("An internal error occurred".to_string()),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    Some("An internal error occurred".to_string()),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
