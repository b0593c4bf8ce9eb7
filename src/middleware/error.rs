//! Error response formatting.
//!
//! Client errors carry a single `error` field. Server errors add sanitized
//! `details` and an RFC 3339 `timestamp` so operators can correlate the
//! response with logs without leaking internals to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::payments::error::PaymentError;

/// JSON body returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// ISO 8601 timestamp, present on server errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// 4xx response: `{"error": "..."}`.
pub fn client_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
        details: None,
        timestamp: None,
    };
    (status, Json(body)).into_response()
}

/// 5xx response: `{"error": "...", "details": "...", "timestamp": "..."}`.
pub fn server_error(
    status: StatusCode,
    summary: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    let body = ErrorBody {
        error: summary.into(),
        details: Some(details.into()),
        timestamp: Some(Utc::now().to_rfc3339()),
    };
    (status, Json(body)).into_response()
}

/// Convert a payment error into the response shape its status class demands.
///
/// `summary` is the operation-level message used for server errors, e.g.
/// "Failed to create payment order". Client errors surface the sanitized
/// error message directly.
pub fn payment_error_response(summary: &str, error: &PaymentError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!(error = %error, status = %status.as_u16(), "{summary}");
        server_error(status, summary, error.user_message())
    } else {
        tracing::warn!(error = %error, status = %status.as_u16(), "{summary}");
        client_error(status, error.user_message())
    }
}
