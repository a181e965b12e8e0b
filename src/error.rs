//! Centralized error types for plugman.
//!
//! This module provides a unified error hierarchy for the application with
//! user-friendly error messages. All error types use `thiserror` for
//! ergonomic error handling.

use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::status::Busy;
use crate::store::StoreError;

/// The main application error type.
///
/// This enum aggregates all error types that can occur in plugman,
/// providing user-friendly error messages while preserving the underlying
/// error context for debugging.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Registry transport errors.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// Package store errors.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Another operation holds the operation slot.
    #[error("{0}")]
    Busy(#[from] Busy),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with a message.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }

    /// Get a user-friendly message for display.
    ///
    /// Store errors keep their own text, since it names the package and the
    /// reason.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
            },
            AppError::Registry(e) => match e {
                RegistryError::Network(_) => {
                    "Could not reach the package registry. Please check your connection.".to_string()
                }
                RegistryError::RateLimited => {
                    "Too many requests to the registry. Please wait a moment.".to_string()
                }
                RegistryError::Timeout(_) => "The package registry did not respond in time.".to_string(),
                _ => "Unexpected response from the package registry.".to_string(),
            },
            AppError::Store(e) => e.to_string(),
            AppError::Busy(busy) => {
                format!("Please wait, {} is still in progress.", busy.active)
            }
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
            AppError::Other(msg) => msg.clone(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors can be retried or the user can continue working.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Registry(_) | AppError::Busy(_) => true,
            AppError::Store(e) => !matches!(e, StoreError::InvalidName { .. }),
            _ => false,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
