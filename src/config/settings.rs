//! Application settings configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::cache::DEFAULT_CACHE_TTL_SECS;

/// Default timeout for registry and store operations in seconds.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

/// Default progress polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Application-wide settings.
///
/// Every field has a default, so a partial config file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Query prefix the host routes to this plugin.
    pub prefix: String,
    /// Display name used as the fallback row description.
    pub plugin_name: String,
    /// Name of the host application shown in restart hints.
    pub host_name: String,
    /// Base URL of the package registry.
    pub registry_url: String,
    /// Topic used to discover installable packages.
    pub discovery_topic: String,
    /// Available packages cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Progress polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Timeout for each registry or store operation in seconds.
    pub operation_timeout_secs: u64,
    /// Version range used when installing from a selected row.
    pub default_version_range: String,
    /// Directory holding installed packages.
    pub plugins_dir: PathBuf,
    /// Staging directory for installs.
    pub temp_dir: PathBuf,
    /// Installer executable used by the local store.
    pub installer_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "/hpm".to_string(),
            plugin_name: "plugman".to_string(),
            host_name: "the launcher".to_string(),
            registry_url: "http://npmsearch.com".to_string(),
            discovery_topic: "hain-plugin".to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            default_version_range: "latest".to_string(),
            plugins_dir: PathBuf::from("./plugins"),
            temp_dir: PathBuf::from("./_temp"),
            installer_command: "npm".to_string(),
        }
    }
}

impl Settings {
    /// Validate these settings.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prefix cannot be empty".to_string(),
            ));
        }

        if self.prefix.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "prefix '{}' cannot contain whitespace",
                self.prefix
            )));
        }

        if self.discovery_topic.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery_topic cannot be empty".to_string(),
            ));
        }

        if !self.registry_url.starts_with("https://") && !self.registry_url.starts_with("http://")
        {
            return Err(ConfigError::ValidationError(format!(
                "registry_url '{}' must start with http:// or https://",
                self.registry_url
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.operation_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "operation_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.default_version_range.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_version_range cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
        assert_eq!(settings.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            prefix = "/pkg"
            cache_ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(settings.prefix, "/pkg");
        assert_eq!(settings.cache_ttl_secs, 60);
        assert_eq!(settings.discovery_topic, "hain-plugin");
    }

    #[test]
    fn test_empty_prefix_is_invalid() {
        let settings = Settings {
            prefix: "  ".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_prefix_with_whitespace_is_invalid() {
        let settings = Settings {
            prefix: "/h pm".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_registry_url_must_be_http() {
        let settings = Settings {
            registry_url: "ftp://registry".to_string(),
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("registry_url"));
    }

    #[test]
    fn test_zero_poll_interval_is_invalid() {
        let settings = Settings {
            poll_interval_ms: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let settings = Settings {
            operation_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
