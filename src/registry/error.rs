//! Transport errors for the package registry.

use thiserror::Error;

/// Errors that can occur when querying the package registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limited by the registry.
    #[error("Rate limited: please wait before retrying")]
    RateLimited,

    /// Registry server error.
    #[error("Registry server error: {0}")]
    ServerError(String),

    /// Registry rejected the request.
    #[error("Registry request failed: {0}")]
    RequestFailed(String),

    /// Invalid response from the registry.
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),

    /// The registry did not answer in time.
    #[error("Registry request timed out after {0}s")]
    Timeout(u64),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    /// Create an error from an HTTP status code.
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        match status.as_u16() {
            429 => RegistryError::RateLimited,
            500..=599 => RegistryError::ServerError(format!("HTTP {}: {}", status, context)),
            _ => RegistryError::RequestFailed(format!("HTTP {}: {}", status, context)),
        }
    }

    /// Check if the request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::RateLimited | RegistryError::ServerError(_) | RegistryError::Network(_)
        )
    }
}
