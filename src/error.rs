//! Indexer error types with HTTP status code mapping.
//!
//! [`IndexerError`] is the central error type for the service. The core
//! pipeline classifies errors by variant (transient RPC, malformed log,
//! missing referential pool, database failure); the REST layer maps each
//! variant to a status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: unknown interval",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Central error enum for the indexer.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server/Upstream | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// Invalid or missing configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Chain RPC call failed (transient; retried by the orchestrator).
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Log could not be ABI-decoded into a known event.
    #[error("decode error: {0}")]
    Decode(String),

    /// Database failure. Fatal at the orchestrator boundary.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Swap or liquidity event references a pool that was never initialized.
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    /// Entity lookup miss on the read surface.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed on the read surface.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for IndexerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Rpc(err.to_string())
    }
}

impl IndexerError {
    /// Returns `true` for errors that must stop the pipeline (the
    /// supervisor restarts the process and SyncState drives resume).
    /// Everything else is logged and the offending event is skipped.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Returns `true` for errors worth retrying with backoff.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Config(_) => 1002,
            Self::PoolNotFound(_) => 2001,
            Self::NotFound(_) => 2002,
            Self::Persistence(_) => 3001,
            Self::Rpc(_) => 3002,
            Self::Decode(_) => 3003,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Config(_) => StatusCode::BAD_REQUEST,
            Self::PoolNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Rpc(_) | Self::Decode(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for IndexerError {
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

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(IndexerError::Persistence(sqlx::Error::PoolClosed).is_fatal());
        assert!(!IndexerError::Rpc("timeout".to_string()).is_fatal());
        assert!(!IndexerError::Decode("short data".to_string()).is_fatal());
    }

    #[test]
    fn transient_classification() {
        assert!(IndexerError::Rpc("connection reset".to_string()).is_transient());
        assert!(!IndexerError::Decode("bad topic".to_string()).is_transient());
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            IndexerError::InvalidRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IndexerError::PoolNotFound("0xaa".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            IndexerError::Rpc("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
