//! Custom error types for the profile-gateway.
//!
//! This module provides a centralized error handling system using the `thiserror` crate
//! to define structured, typed errors with clear messages and proper error conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Primary error type for the gateway, covering all possible error cases.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request carried a missing or invalid credential.
    #[error("Unauthorized")]
    Unauthorized,

    /// The authentication middleware did not attach claims before decoding ran.
    #[error("no authentication context on request")]
    AuthContextMissing,

    /// The instance directory snapshot was empty at dispatch time.
    #[error("no endpoints available")]
    NoEndpoints,

    /// A backend connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// A gRPC attempt failed with a transport or status error.
    #[error("rpc error: {0}")]
    Rpc(#[from] tonic::Status),

    /// The retry deadline passed before the call could complete.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The caller went away before the call completed.
    #[error("request cancelled")]
    Cancelled,

    /// Every retry attempt was consumed without success.
    #[error("retry exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: usize,
        #[source]
        source: Box<GatewayError>,
    },

    /// The backend executed the operation but reported a business failure.
    /// The message is opaque; error type identity is lost across the RPC
    /// boundary.
    #[error("backend error: {0}")]
    Backend(String),

    /// Malformed wire input from the HTTP caller.
    #[error("invalid request: {0}")]
    Decode(String),

    /// Errors from invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors from the underlying IO system.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the retry wrapper may absorb this failure and try another
    /// endpoint. Only transport-shaped failures qualify; a backend-reported
    /// domain failure means the operation ran and must propagate as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection(_)
                | GatewayError::Rpc(_)
                | GatewayError::DeadlineExceeded
                | GatewayError::NoEndpoints
        )
    }
}

/// Implementation to convert GatewayError into an HTTP response for Axum.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            GatewayError::AuthContextMissing => (StatusCode::UNAUTHORIZED, self.to_string()),
            GatewayError::Decode(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            GatewayError::Json(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            GatewayError::NoEndpoints => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            GatewayError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            GatewayError::Cancelled => (StatusCode::REQUEST_TIMEOUT, self.to_string()),
            GatewayError::RetryExhausted { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            GatewayError::Connection(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            GatewayError::Rpc(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results with GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Standardized async operation bounded by a wall-clock budget.
///
/// Timing out maps to `DeadlineExceeded`, so a slow attempt is
/// indistinguishable from an expired budget to the layers above.
pub async fn with_timeout<T, F>(operation: F, timeout_duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout_duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::DeadlineExceeded),
    }
}
