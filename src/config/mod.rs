//! Configuration management for plugman.
//!
//! This module handles loading and saving the TOML configuration file that
//! holds the application [`Settings`].

mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use settings::{Settings, DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "PLUGMAN_CONFIG";

/// Config file name inside the config directory.
const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// The config directory could not be created.
    #[error("Failed to create config directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The config file could not be read.
    #[error("Failed to read config file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The config file could not be written.
    #[error("Failed to write config file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The config file is not valid TOML.
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The settings could not be serialized.
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A setting has an invalid value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The loaded configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Config {
    /// Application settings, stored at the top level of the file.
    pub settings: Settings,
}

impl Config {
    /// Get the default config file path.
    ///
    /// `$PLUGMAN_CONFIG` wins over the platform config directory
    /// (`~/.config/plugman/config.toml` on Linux).
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("plugman").join(CONFIG_FILE))
    }

    /// Load the configuration from the default path.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the configuration from a specific path and validate it.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content)?;
        config.settings.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save the configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save the configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.settings.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(ConfigError::WriteError)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}
