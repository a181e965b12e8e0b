//! Locally installed packages.
//!
//! [`PackageStore`] is the seam used by the router and dispatcher. Two
//! implementations ship with the crate:
//! - [`LocalStore`] manages a plugins directory on disk
//! - [`MemoryStore`] keeps packages in memory (tests and dry runs)

mod error;
mod local;
mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{Result, StoreError};
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Maximum length of a package name.
const MAX_NAME_LEN: usize = 214;

/// A package installed in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// The package name.
    pub name: String,
    /// The installed version.
    pub version: String,
}

impl InstalledPackage {
    /// Create a new installed package record.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Lists, installs and removes local packages.
#[async_trait]
pub trait PackageStore: Send + Sync {
    /// List installed packages.
    async fn list(&self) -> Result<Vec<InstalledPackage>>;

    /// Install `name` at the given version range.
    async fn install(&self, name: &str, version_range: &str) -> Result<()>;

    /// Remove an installed package.
    async fn remove(&self, name: &str) -> Result<()>;
}

/// Validate a package name before it is used as a path.
///
/// Valid names:
/// - Are 1-214 characters
/// - Are either `name` or `@scope/name`
/// - Contain only ASCII letters, digits, `-`, `_`, `.` and `~` in each part
/// - Have no part starting with `.` or `_`
///
/// Mixed case is accepted since older registry packages use it.
pub fn validate_package_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| StoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is too long"));
    }

    let parts: Vec<&str> = match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, rest)) => vec![scope, rest],
            None => return Err(invalid("scoped name needs a '/' after the scope")),
        },
        None => vec![name],
    };

    for part in parts {
        validate_name_part(part).map_err(invalid)?;
    }

    Ok(())
}

fn validate_name_part(part: &str) -> std::result::Result<(), &'static str> {
    if part.is_empty() {
        return Err("name part cannot be empty");
    }

    if part.contains(['/', '\\']) || part == "." || part == ".." {
        return Err("name contains path characters");
    }

    let valid = part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
    if !valid {
        return Err("only letters, digits, '-', '_', '.' and '~' are allowed");
    }

    if part.starts_with('.') || part.starts_with('_') {
        return Err("name cannot start with '.' or '_'");
    }

    Ok(())
}

/// Split a validated name into its path components (`@scope`, `name`).
pub(crate) fn name_components(name: &str) -> Vec<&str> {
    match name.split_once('/') {
        Some((scope, rest)) if scope.starts_with('@') => vec![scope, rest],
        _ => vec![name],
    }
}

/// Run a store operation with a deadline.
///
/// Expiry maps to [`StoreError::Timeout`] labelled with `operation`.
pub async fn timed<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or_else(|_| {
            Err(StoreError::Timeout {
                operation: operation.to_string(),
                secs: timeout.as_secs(),
            })
        })
}
