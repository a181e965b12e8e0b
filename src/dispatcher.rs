//! Host entry points.
//!
//! [`Dispatcher`] wires the status slot, the cache, the router, the progress
//! loop and the task spawner together and exposes the three calls the host
//! makes: [`Dispatcher::startup`], [`Dispatcher::search`] and
//! [`Dispatcher::execute`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::cache::PackageCache;
use crate::commands::{Action, CommandRouter, ReplyItem};
use crate::config::Settings;
use crate::error::Result;
use crate::notification::Notifier;
use crate::progress::{ProgressLoop, ReplySender};
use crate::registry::PackageRegistry;
use crate::status::OperationStatus;
use crate::store::{self, PackageStore};
use crate::tasks::TaskSpawner;

/// Package manager plugin state for one host.
pub struct Dispatcher {
    status: OperationStatus,
    cache: PackageCache,
    router: Arc<CommandRouter>,
    progress: ProgressLoop,
    tasks: TaskSpawner,
    store: Arc<dyn PackageStore>,
    settings: Settings,
}

impl Dispatcher {
    /// Build a dispatcher from settings and its collaborators.
    ///
    /// Notifications are delivered through `notifier`.
    pub fn new(
        settings: &Settings,
        registry: Arc<dyn PackageRegistry>,
        store: Arc<dyn PackageStore>,
        notifier: Notifier,
    ) -> Self {
        let status = OperationStatus::new();
        let cache = PackageCache::from_settings(registry, status.clone(), settings);
        let router = Arc::new(CommandRouter::new(cache.clone(), Arc::clone(&store), settings));
        let progress = ProgressLoop::new(
            status.clone(),
            Arc::clone(&router),
            settings.poll_interval(),
            &settings.plugin_name,
        );
        let tasks = TaskSpawner::new(
            Arc::clone(&store),
            notifier,
            settings.operation_timeout(),
            &settings.host_name,
        );

        Self {
            status,
            cache,
            router,
            progress,
            tasks,
            store,
            settings: settings.clone(),
        }
    }

    /// The shared operation slot.
    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    /// The available packages cache.
    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// The settings this dispatcher was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Warm up: read the store once and start a cache refresh.
    ///
    /// The refresh is not awaited.
    #[instrument(skip(self))]
    pub async fn startup(&self) -> Result<()> {
        let installed = store::timed(
            self.settings.operation_timeout(),
            "list packages",
            self.store.list(),
        )
        .await?;
        info!("{} packages installed", installed.len());

        if self.cache.ensure_fresh().is_some() {
            debug!("Started initial package refresh");
        }
        Ok(())
    }

    /// Answer a query typed after the prefix.
    ///
    /// While an operation is running this returns no rows and pushes a
    /// spinner through `reply` instead; the real rows follow on `reply` once
    /// the operation finishes.
    pub async fn search(&self, query: &str, reply: &ReplySender) -> Vec<ReplyItem> {
        if self.status.is_idle() {
            let _ = self.cache.ensure_fresh();
        }

        if !self.status.is_idle() {
            debug!(query, "Operation in progress, deferring reply");
            let _ = self.progress.start(query.to_string(), reply.clone());
            return Vec::new();
        }

        self.progress.cancel();
        self.router.reply_for(query).await
    }

    /// Run the action of a selected row.
    ///
    /// Returns the query the host should switch to, or `None` for an
    /// unknown payload. Fails with [`crate::AppError::Busy`] if another
    /// operation is running.
    pub fn execute(&self, id: &str, payload: &str) -> Result<Option<String>> {
        let action = match payload.parse::<Action>() {
            Ok(action) => action,
            Err(e) => {
                debug!("Ignoring row {}: {}", id, e);
                return Ok(None);
            }
        };

        match action {
            Action::Install => {
                let guard = self.status.begin_install(id)?;
                let _ = self.tasks.spawn_install(
                    guard,
                    id.to_string(),
                    self.settings.default_version_range.clone(),
                );
                Ok(Some(format!("{} install ", self.settings.prefix)))
            }
            Action::Remove => {
                let guard = self.status.begin_remove(id)?;
                let _ = self.tasks.spawn_remove(guard, id.to_string());
                Ok(Some(format!("{} remove ", self.settings.prefix)))
            }
        }
    }

    /// Install `name` and wait for the result.
    pub async fn install_package(&self, name: &str, version_range: &str) -> Result<()> {
        let guard = self.status.begin_install(name)?;
        self.tasks.install(guard, name, version_range).await
    }

    /// Remove `name` and wait for the result.
    pub async fn remove_package(&self, name: &str) -> Result<()> {
        let guard = self.status.begin_remove(name)?;
        self.tasks.remove(guard, name).await
    }

    /// Stop background feedback. Running operations are left alone.
    pub fn shutdown(&self) {
        if !self.status.is_idle() {
            warn!("Shutting down while {} is in progress", self.status.current());
        }
        self.progress.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ReplyUpdate;
    use crate::error::AppError;
    use crate::notification::{self, Notification, NotificationType};
    use crate::progress::SPINNER_ID;
    use crate::registry::PackageDescriptor;
    use crate::status::Operation;
    use crate::store::InstalledPackage;
    use crate::testing::{descriptor, wait_until_idle, MockRegistry, MockStore};
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Harness {
        dispatcher: Dispatcher,
        registry: Arc<MockRegistry>,
        store: Arc<MockStore>,
        toasts: UnboundedReceiver<Notification>,
    }

    fn harness(registry: MockRegistry, store: MockStore) -> Harness {
        let registry = Arc::new(registry);
        let store = Arc::new(store);
        let (notifier, toasts) = notification::channel();
        let dispatcher = Dispatcher::new(
            &Settings::default(),
            registry.clone(),
            store.clone(),
            notifier,
        );
        Harness {
            dispatcher,
            registry,
            store,
            toasts,
        }
    }

    fn foo_plugin() -> Vec<PackageDescriptor> {
        vec![PackageDescriptor::new("foo-plugin", "1.0.0", "x")]
    }

    #[tokio::test]
    async fn test_startup_triggers_refresh() {
        let h = harness(MockRegistry::returning(foo_plugin()), MockStore::empty());

        h.dispatcher.startup().await.unwrap();
        wait_until_idle(h.dispatcher.status()).await;

        assert_eq!(h.registry.calls(), 1);
        assert_eq!(h.dispatcher.cache().snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_during_refresh_shows_spinner_then_rows() {
        let h = harness(MockRegistry::returning(foo_plugin()).gated(), MockStore::empty());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let rows = h.dispatcher.search("install foo", &tx).await;
        assert!(rows.is_empty());
        assert_eq!(h.dispatcher.status().current(), Operation::Fetching);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let rows = h.dispatcher.search("install foo", &tx).await;
        assert!(rows.is_empty());

        // the first loop was cancelled after pushing its spinner
        for _ in 0..2 {
            let ReplyUpdate::Items(rows) = rx.recv().await.unwrap() else {
                panic!("expected spinner row");
            };
            assert_eq!(rows[0].id, SPINNER_ID);
        }

        h.registry.release();
        assert_eq!(rx.recv().await.unwrap(), ReplyUpdate::remove(SPINNER_ID));
        let ReplyUpdate::Items(rows) = rx.recv().await.unwrap() else {
            panic!("expected install rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "foo-plugin");
        assert_eq!(rows[0].payload, Some(Action::Install));
        assert_eq!(h.registry.calls(), 1);
    }

    #[tokio::test]
    async fn test_searches_within_ttl_query_registry_once() {
        let h = harness(MockRegistry::returning(foo_plugin()), MockStore::empty());
        let (tx, _rx) = mpsc::unbounded_channel();

        for query in ["install", "list", "install foo", "xyz", "remove"] {
            let _ = h.dispatcher.search(query, &tx).await;
            wait_until_idle(h.dispatcher.status()).await;
        }

        assert_eq!(h.registry.calls(), 1);
        let rows = h.dispatcher.search("install foo", &tx).await;
        assert_eq!(rows[0].id, "foo-plugin");
    }

    #[tokio::test]
    async fn test_second_execute_rejected_while_installing() {
        let h = harness(MockRegistry::returning(vec![]), MockStore::empty().gated());

        let next = h.dispatcher.execute("foo-plugin", "install").unwrap();
        assert_eq!(next.as_deref(), Some("/hpm install "));

        let err = h.dispatcher.execute("bar-plugin", "remove").unwrap_err();
        assert!(matches!(
            err,
            AppError::Busy(ref busy) if busy.active == Operation::Installing { name: "foo-plugin".to_string() }
        ));
        assert!(!h.dispatcher.status().is_idle());

        h.store.release();
        wait_until_idle(h.dispatcher.status()).await;
        let next = h.dispatcher.execute("foo-plugin", "remove").unwrap();
        assert_eq!(next.as_deref(), Some("/hpm remove "));
    }

    #[tokio::test]
    async fn test_execute_unknown_payload_is_ignored() {
        let h = harness(MockRegistry::returning(vec![]), MockStore::empty());
        assert_eq!(h.dispatcher.execute("foo", "upgrade").unwrap(), None);
        assert!(h.dispatcher.status().is_idle());
    }

    #[tokio::test]
    async fn test_execute_install_success() {
        let mut h = harness(MockRegistry::returning(vec![]), MockStore::empty().gated());

        h.dispatcher.execute("foo-plugin", "install").unwrap();
        assert_eq!(
            h.dispatcher.status().current(),
            Operation::Installing {
                name: "foo-plugin".to_string()
            }
        );

        h.store.release();
        wait_until_idle(h.dispatcher.status()).await;

        assert_eq!(h.store.installs(), vec![("foo-plugin".to_string(), "latest".to_string())]);
        let toast = h.toasts.recv().await.unwrap();
        assert_eq!(toast.notification_type, NotificationType::Success);
        assert_eq!(toast.duration_ms, 3000);
        assert!(toast.message.starts_with("foo-plugin installed"));
    }

    #[tokio::test]
    async fn test_install_failure_is_reported() {
        let mut h = harness(MockRegistry::returning(vec![]), MockStore::empty().failing("exit status 1"));

        let err = h
            .dispatcher
            .install_package("foo-plugin", "latest")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Store(_)));
        assert!(h.dispatcher.status().is_idle());
        let toast = h.toasts.recv().await.unwrap();
        assert_eq!(toast.notification_type, NotificationType::Error);
        assert_eq!(toast.message, "Failed to install foo-plugin: exit status 1");
    }

    #[tokio::test]
    async fn test_detached_install_failure_still_notifies() {
        let mut h = harness(MockRegistry::returning(vec![]), MockStore::empty().failing("offline"));

        h.dispatcher.execute("foo-plugin", "install").unwrap();
        let toast = h.toasts.recv().await.unwrap();

        assert_eq!(toast.notification_type, NotificationType::Error);
        wait_until_idle(h.dispatcher.status()).await;
    }

    #[tokio::test]
    async fn test_remove_package_updates_list() {
        let h = harness(
            MockRegistry::returning(vec![]),
            MockStore::with_packages(vec![
                InstalledPackage::new("alpha", "1.0.0"),
                InstalledPackage::new("beta", "1.0.0"),
            ]),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        h.dispatcher.startup().await.unwrap();
        wait_until_idle(h.dispatcher.status()).await;

        h.dispatcher.remove_package("alpha").await.unwrap();
        assert!(h.dispatcher.status().is_idle());

        let rows = h.dispatcher.search("list", &tx).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "beta");
    }

    #[tokio::test]
    async fn test_search_help_when_idle() {
        let h = harness(MockRegistry::returning(vec![descriptor("a", "1.0.0")]), MockStore::empty());
        let (tx, _rx) = mpsc::unbounded_channel();
        h.dispatcher.startup().await.unwrap();
        wait_until_idle(h.dispatcher.status()).await;

        let rows = h.dispatcher.search("li", &tx).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].redirect.as_deref(), Some("/hpm list "));
        h.dispatcher.shutdown();
    }
}
