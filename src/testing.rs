//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::registry::{self, PackageDescriptor, PackageRegistry, RegistryError};
use crate::status::OperationStatus;
use crate::store::{self, InstalledPackage, MemoryStore, PackageStore, StoreError};

/// Registry returning a canned result, optionally held until released.
pub struct MockRegistry {
    result: Mutex<std::result::Result<Vec<PackageDescriptor>, String>>,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl MockRegistry {
    pub fn returning(packages: Vec<PackageDescriptor>) -> Self {
        Self {
            result: Mutex::new(Ok(packages)),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Make every search wait for a matching [`MockRegistry::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn set_result(&self, result: std::result::Result<Vec<PackageDescriptor>, String>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageRegistry for MockRegistry {
    async fn search(&self, _topic: &str) -> registry::Result<Vec<PackageDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.result
            .lock()
            .unwrap()
            .clone()
            .map_err(RegistryError::InvalidResponse)
    }
}

/// Store delegating to [`MemoryStore`], with failure injection and gating.
pub struct MockStore {
    inner: MemoryStore,
    fail_with: Mutex<Option<String>>,
    gate: Option<Semaphore>,
    installs: Mutex<Vec<(String, String)>>,
}

impl MockStore {
    pub fn with_packages(packages: Vec<InstalledPackage>) -> Self {
        Self {
            inner: MemoryStore::with_packages(packages),
            fail_with: Mutex::new(None),
            gate: None,
            installs: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_packages(Vec::new())
    }

    /// Make install and remove fail with `reason`.
    pub fn failing(self, reason: &str) -> Self {
        *self.fail_with.lock().unwrap() = Some(reason.to_string());
        self
    }

    /// Make install and remove wait for a matching [`MockStore::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Recorded `(name, version_range)` install calls.
    pub fn installs(&self) -> Vec<(String, String)> {
        self.installs.lock().unwrap().clone()
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn injected_failure(&self) -> Option<String> {
        self.fail_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageStore for MockStore {
    async fn list(&self) -> store::Result<Vec<InstalledPackage>> {
        self.inner.list().await
    }

    async fn install(&self, name: &str, version_range: &str) -> store::Result<()> {
        self.installs
            .lock()
            .unwrap()
            .push((name.to_string(), version_range.to_string()));
        self.wait_gate().await;
        if let Some(reason) = self.injected_failure() {
            return Err(StoreError::install(name, reason));
        }
        self.inner.install(name, version_range).await
    }

    async fn remove(&self, name: &str) -> store::Result<()> {
        self.wait_gate().await;
        if let Some(reason) = self.injected_failure() {
            return Err(StoreError::remove(name, reason));
        }
        self.inner.remove(name).await
    }
}

pub fn descriptor(name: &str, version: &str) -> PackageDescriptor {
    PackageDescriptor::new(name, version, format!("{} description", name))
}

/// Wait (up to two seconds) for the status slot to become idle.
pub async fn wait_until_idle(status: &OperationStatus) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !status.is_idle() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("operation did not finish in time");
}
