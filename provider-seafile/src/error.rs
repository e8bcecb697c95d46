//! Error types for the Seafile provider

use bridge_traits::error::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Seafile provider errors
#[derive(Error, Debug)]
pub enum SeafileError {
    /// Credentials or token rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an unexpected status
    #[error("Seafile API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// The server throttled the request
    #[error("Request throttled: {detail}")]
    Throttled { detail: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Throttling persisted past the configured retry or wait budget
    #[error("Rate limit still in effect for {operation} after {attempts} retries ({waited:?} waited)")]
    RateLimitExhausted {
        operation: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl SeafileError {
    /// Whether the remote confirmed the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SeafileError::NotFound { .. } | SeafileError::Bridge(BridgeError::NotFound(_))
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            SeafileError::AuthenticationFailed(_)
                | SeafileError::Bridge(BridgeError::Unauthorized(_))
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SeafileError::Cancelled | SeafileError::Bridge(BridgeError::Cancelled)
        )
    }
}

/// Result type for Seafile operations
pub type Result<T> = std::result::Result<T, SeafileError>;

impl From<SeafileError> for BridgeError {
    fn from(error: SeafileError) -> Self {
        match error {
            SeafileError::AuthenticationFailed(msg) => BridgeError::Unauthorized(msg),
            SeafileError::Throttled { detail } => BridgeError::RateLimited { detail },
            SeafileError::NotFound { path } => BridgeError::NotFound(path),
            SeafileError::Cancelled => BridgeError::Cancelled,
            SeafileError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
