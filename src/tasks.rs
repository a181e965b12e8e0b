//! Background install and remove tasks.
//!
//! The dispatcher claims the operation slot synchronously, then hands the
//! [`OperationGuard`] to a task spawned here. The host only observes the
//! outcome through the status slot and the notifications channel.
//!
//! # Task lifecycle
//!
//! 1. The caller claims the slot (`OperationStatus::begin_install` etc.)
//! 2. `TaskSpawner` spawns the store call, moving the guard into the task
//! 3. The task sends a success or error notification
//! 4. The guard drops when the task ends, returning the slot to idle
//! 5. A supervising task logs errors and turns panics into notifications

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::notification::{Notification, Notifier};
use crate::status::OperationGuard;
use crate::store::{self, PackageStore};

/// Spawns install and remove operations against the store.
#[derive(Clone)]
pub struct TaskSpawner {
    store: Arc<dyn PackageStore>,
    notifier: Notifier,
    timeout: Duration,
    /// Host name used in restart hints.
    host_name: String,
}

impl TaskSpawner {
    /// Create a spawner.
    pub fn new(
        store: Arc<dyn PackageStore>,
        notifier: Notifier,
        timeout: Duration,
        host_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            timeout,
            host_name: host_name.into(),
        }
    }

    /// Spawn an install of `name` without waiting for it.
    pub fn spawn_install(
        &self,
        guard: OperationGuard,
        name: String,
        version_range: String,
    ) -> JoinHandle<Result<()>> {
        let spawner = self.clone();
        let label = format!("install {}", name);
        self.supervise(label, async move { spawner.install(guard, &name, &version_range).await })
    }

    /// Spawn a removal of `name` without waiting for it.
    pub fn spawn_remove(&self, guard: OperationGuard, name: String) -> JoinHandle<Result<()>> {
        let spawner = self.clone();
        let label = format!("remove {}", name);
        self.supervise(label, async move { spawner.remove(guard, &name).await })
    }

    /// Install `name`, holding `guard` until the store call finishes.
    pub async fn install(
        &self,
        guard: OperationGuard,
        name: &str,
        version_range: &str,
    ) -> Result<()> {
        info!("Installing {}@{}", name, version_range);

        let result = store::timed(
            self.timeout,
            &format!("install {}", name),
            self.store.install(name, version_range),
        )
        .await;
        drop(guard);

        match result {
            Ok(()) => {
                info!("{} installed", name);
                self.notifier.notify(Notification::success(format!(
                    "{} installed, <b>Restart</b> {} to take effect",
                    name, self.host_name
                )));
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notification::error(e.to_string()));
                Err(AppError::Store(e))
            }
        }
    }

    /// Remove `name`, holding `guard` until the store call finishes.
    pub async fn remove(&self, guard: OperationGuard, name: &str) -> Result<()> {
        info!("Removing {}", name);

        let result = store::timed(
            self.timeout,
            &format!("remove {}", name),
            self.store.remove(name),
        )
        .await;
        drop(guard);

        match result {
            Ok(()) => {
                info!("{} removed", name);
                self.notifier.notify(Notification::success(format!(
                    "{} removed, <b>Restart</b> {} to take effect",
                    name, self.host_name
                )));
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notification::error(e.to_string()));
                Err(AppError::Store(e))
            }
        }
    }

    /// Run `task` detached, logging its error and reporting panics.
    fn supervise<F>(&self, label: String, task: F) -> JoinHandle<Result<()>>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let notifier = self.notifier.clone();
        let inner = tokio::spawn(task);

        tokio::spawn(async move {
            match inner.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!("Task '{}' failed: {}", label, e);
                    Err(e)
                }
                Err(join_error) => {
                    let message = format!("{} aborted: {}", label, join_error);
                    error!("{}", message);
                    notifier.notify(Notification::error(message.clone()));
                    Err(AppError::Other(message))
                }
            }
        })
    }
}
