//! Errors raised by package stores.

use thiserror::Error;

/// Errors that can occur while listing, installing or removing packages.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Installation failed.
    #[error("Failed to install {name}: {reason}")]
    InstallFailed { name: String, reason: String },

    /// Removal failed.
    #[error("Failed to remove {name}: {reason}")]
    RemoveFailed { name: String, reason: String },

    /// The package is not installed.
    #[error("Package '{0}' is not installed")]
    NotInstalled(String),

    /// The package name is unsafe to use as a directory name.
    #[error("Invalid package name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A package manifest could not be parsed.
    #[error("Invalid manifest {path}: {reason}")]
    InvalidManifest { path: String, reason: String },

    /// The store did not finish in time.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create an install failure.
    pub fn install(name: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::InstallFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a remove failure.
    pub fn remove(name: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::RemoveFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
