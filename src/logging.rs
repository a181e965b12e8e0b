//! Logging configuration using the tracing ecosystem.
//!
//! Output goes to a daily rotating file so that stdout stays free for the
//! JSON lines read by the host. The level comes from `RUST_LOG`, falling back
//! to [`DEFAULT_LOG_FILTER`] (or [`VERBOSE_LOG_FILTER`] with `--verbose`).

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
pub const DEFAULT_LOG_FILTER: &str = "plugman=info,warn";

/// Log level used by `--verbose` if RUST_LOG is not set.
pub const VERBOSE_LOG_FILTER: &str = "plugman=debug,info";

/// Log file name prefix; the appender adds a date suffix.
const LOG_FILE_NAME: &str = "plugman.log";

/// Initialize the logging system.
///
/// # Log Directory
///
/// Logs are stored in the platform-specific local data directory:
/// - Linux: `~/.local/share/plugman/logs/`
/// - macOS: `~/Library/Application Support/plugman/logs/`
/// - Windows: `C:\Users\<User>\AppData\Local\plugman\logs\`
///
/// # Errors
///
/// Returns an error if the log directory cannot be determined or created,
/// or if a global subscriber is already set.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter(verbose));

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "plugman starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)))
}

/// Returns the platform-specific local data directory with `plugman/logs` appended.
fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("plugman").join("logs"))
}

/// Get the path where logs are stored.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

/// Log application shutdown.
pub fn shutdown() {
    tracing::info!("plugman shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_has_expected_structure() {
        let dir = get_log_directory().unwrap();
        assert!(dir.ends_with("plugman/logs"));
    }

    #[test]
    fn test_log_directory_public_function() {
        assert_eq!(log_directory(), get_log_directory().ok());
    }

    #[test]
    fn test_verbose_changes_default_filter() {
        assert_eq!(default_filter(false), "plugman=info,warn");
        assert_eq!(default_filter(true), "plugman=debug,info");
    }
}
