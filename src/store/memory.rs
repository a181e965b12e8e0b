//! In-memory package store.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{validate_package_name, InstalledPackage, PackageStore, Result, StoreError};

/// A store that keeps installed packages in memory.
///
/// Installing records the requested version range as the version.
#[derive(Debug, Default)]
pub struct MemoryStore {
    packages: Mutex<Vec<InstalledPackage>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with packages.
    pub fn with_packages(packages: Vec<InstalledPackage>) -> Self {
        Self {
            packages: Mutex::new(packages),
        }
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn list(&self) -> Result<Vec<InstalledPackage>> {
        let packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(packages.clone())
    }

    async fn install(&self, name: &str, version_range: &str) -> Result<()> {
        validate_package_name(name)?;
        let mut packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        packages.retain(|p| p.name != name);
        packages.push(InstalledPackage::new(name, version_range));
        debug!("Recorded {}@{} in memory store", name, version_range);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        let before = packages.len();
        packages.retain(|p| p.name != name);
        if packages.len() == before {
            return Err(StoreError::NotInstalled(name.to_string()));
        }
        Ok(())
    }
}
