//! Error types with HTTP status code mapping.
//!
//! [`TrackerError`] is the central error type for the services and the
//! HTTP surface. [`LookupError`] and [`WireError`] cover the two external
//! boundaries: entity lookups and feed decoding. Neither ever escapes an
//! event handler; handlers log them and carry on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::OperationId;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "operation not found: 6f0c..."
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A raw feed message could not be decoded.
    #[error("feed decode error: {0}")]
    Wire(#[from] WireError),

    /// Operation with the given ID was not found.
    #[error("operation not found: {0}")]
    OperationNotFound(OperationId),

    /// The operation has no participants to track.
    #[error("operation {0} has no participants")]
    EmptyRoster(OperationId),

    /// The operation was already stopped.
    #[error("operation {0} is stopped")]
    OperationStopped(OperationId),

    /// The operation has not been started yet.
    #[error("operation {0} has not been started")]
    OperationNotStarted(OperationId),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Wire(_) => 1002,
            Self::OperationNotFound(_) => 2001,
            Self::EmptyRoster(_) => 2002,
            Self::OperationStopped(_) => 2003,
            Self::OperationNotStarted(_) => 2004,
            Self::Config(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Wire(_) => StatusCode::BAD_REQUEST,
            Self::OperationNotFound(_) => StatusCode::NOT_FOUND,
            Self::EmptyRoster(_)
            | Self::OperationStopped(_)
            | Self::OperationNotStarted(_) => StatusCode::CONFLICT,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure of an external entity lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The lookup service could not be reached or answered with an error.
    #[error("lookup unavailable: {0}")]
    Unavailable(String),

    /// The lookup did not answer in time.
    #[error("lookup timed out")]
    TimedOut,
}

/// Failure to decode a raw feed message.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The message is not valid JSON or misses required fields.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A field held a value that cannot be interpreted.
    #[error("invalid {field}: {value}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending raw value.
        value: String,
    },
}
