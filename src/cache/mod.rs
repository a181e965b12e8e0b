//! Available packages cache.
//!
//! Holds the last snapshot of packages discovered on the registry. Features:
//! - Configurable TTL (time-to-live)
//! - Stale-while-revalidate reads: [`PackageCache::snapshot`] never waits
//! - Single-flight refresh through the shared [`OperationStatus`] slot
//! - Atomic replacement: readers see either the old or the new list
//!
//! A failed refresh keeps the previous snapshot and does not advance the
//! refresh time, so the next check retries.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::Settings;
use crate::registry::{PackageDescriptor, PackageRegistry, RegistryError, Result};
use crate::status::{OperationGuard, OperationStatus};

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;

#[derive(Debug)]
struct CacheState {
    items: Arc<[PackageDescriptor]>,
    last_refreshed_at: Option<Instant>,
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of packages in the snapshot.
    pub item_count: usize,
    /// Time since the last successful refresh, `None` if never refreshed.
    pub age: Option<Duration>,
    /// TTL.
    pub ttl: Duration,
}

impl CacheStats {
    /// Check if the snapshot is past its TTL.
    pub fn is_stale(&self) -> bool {
        self.age.map_or(true, |age| age > self.ttl)
    }
}

/// TTL-bounded snapshot of remotely discoverable packages.
///
/// Cloning yields another handle to the same snapshot.
#[derive(Clone)]
pub struct PackageCache {
    registry: Arc<dyn PackageRegistry>,
    status: OperationStatus,
    state: Arc<RwLock<CacheState>>,
    topic: String,
    ttl: Duration,
    timeout: Duration,
}

impl PackageCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `registry` - Source of packages
    /// * `status` - The operation slot shared with installs and removals
    /// * `topic` - Discovery topic sent to the registry
    /// * `ttl` - How long a snapshot stays fresh
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        status: OperationStatus,
        topic: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            registry,
            status,
            state: Arc::new(RwLock::new(CacheState {
                items: Arc::from(Vec::new()),
                last_refreshed_at: None,
            })),
            topic: topic.into(),
            ttl,
            timeout: Duration::from_secs(crate::config::DEFAULT_OPERATION_TIMEOUT_SECS),
        }
    }

    /// Create a cache configured from application settings.
    pub fn from_settings(
        registry: Arc<dyn PackageRegistry>,
        status: OperationStatus,
        settings: &Settings,
    ) -> Self {
        Self::new(
            registry,
            status,
            &settings.discovery_topic,
            settings.cache_ttl(),
        )
        .with_timeout(settings.operation_timeout())
    }

    /// Set the timeout applied to each registry query.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The current snapshot, possibly stale.
    pub fn snapshot(&self) -> Arc<[PackageDescriptor]> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner).items)
    }

    /// Time since the last successful refresh.
    pub fn age(&self) -> Option<Duration> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_refreshed_at
            .map(|at| at.elapsed())
    }

    /// Check if the snapshot needs a refresh.
    pub fn is_stale(&self) -> bool {
        self.stats().is_stale()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            item_count: state.items.len(),
            age: state.last_refreshed_at.map(|at| at.elapsed()),
            ttl: self.ttl,
        }
    }

    /// Start a background refresh if the snapshot is stale and no operation
    /// is running.
    ///
    /// The operation slot is claimed before this returns, so concurrent
    /// callers never start a second refresh. Returns the refresh task when
    /// one was started.
    pub fn ensure_fresh(&self) -> Option<JoinHandle<Result<usize>>> {
        if !self.is_stale() {
            trace!("Package cache is fresh");
            return None;
        }

        let guard = match self.status.begin_fetch() {
            Ok(guard) => guard,
            Err(busy) => {
                trace!("Skipping refresh: {}", busy);
                return None;
            }
        };

        let cache = self.clone();
        Some(tokio::spawn(async move { cache.refresh(guard).await }))
    }

    /// Query the registry and replace the snapshot on success.
    async fn refresh(&self, guard: OperationGuard) -> Result<usize> {
        debug!(topic = %self.topic, "Refreshing available packages");

        let result = match tokio::time::timeout(self.timeout, self.registry.search(&self.topic)).await
        {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout(self.timeout.as_secs())),
        };

        let outcome = match result {
            Ok(packages) => {
                let count = packages.len();
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                state.items = Arc::from(packages);
                state.last_refreshed_at = Some(Instant::now());
                info!("Cached {} available packages", count);
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to refresh available packages: {}", e);
                Err(e)
            }
        };

        drop(guard);
        outcome
    }
}
