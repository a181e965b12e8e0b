//! Single-slot operation status.
//!
//! At most one long-running operation (registry refresh, install or remove)
//! runs at a time. Callers claim the slot with one of the `begin_*` methods
//! before their first `.await`; the returned [`OperationGuard`] puts the slot
//! back to [`Operation::Idle`] when dropped, on success, error and panic
//! alike.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, error};

/// The operation currently occupying the slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operation {
    /// Nothing is running.
    #[default]
    Idle,
    /// Refreshing the available packages cache.
    Fetching,
    /// Installing a package.
    Installing { name: String },
    /// Removing a package.
    Removing { name: String },
}

impl Operation {
    /// Check if this is a busy state.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Operation::Idle)
    }

    /// Human-readable status text, empty for `Idle`.
    pub fn message(&self) -> String {
        match self {
            Operation::Idle => String::new(),
            Operation::Fetching => "fetching available packages...".to_string(),
            Operation::Installing { name } => format!("installing <b>{}</b>", name),
            Operation::Removing { name } => format!("removing <b>{}</b>", name),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Idle => write!(f, "idle"),
            Operation::Fetching => write!(f, "fetching packages"),
            Operation::Installing { name } => write!(f, "installing {}", name),
            Operation::Removing { name } => write!(f, "removing {}", name),
        }
    }
}

/// Returned when the slot is already taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("busy: {active} is in progress")]
pub struct Busy {
    /// The operation holding the slot.
    pub active: Operation,
}

/// Shared handle to the operation slot.
///
/// Cloning yields another handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct OperationStatus {
    slot: Arc<Mutex<Operation>>,
}

impl OperationStatus {
    /// Create an idle status slot.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Operation> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if no operation is running.
    pub fn is_idle(&self) -> bool {
        !self.lock().is_busy()
    }

    /// Get a copy of the current operation.
    pub fn current(&self) -> Operation {
        self.lock().clone()
    }

    /// Status text for the running operation, empty when idle.
    pub fn status_message(&self) -> String {
        self.lock().message()
    }

    /// Claim the slot for a registry refresh.
    pub fn begin_fetch(&self) -> Result<OperationGuard, Busy> {
        self.try_begin(Operation::Fetching)
    }

    /// Claim the slot for installing `name`.
    pub fn begin_install(&self, name: impl Into<String>) -> Result<OperationGuard, Busy> {
        self.try_begin(Operation::Installing { name: name.into() })
    }

    /// Claim the slot for removing `name`.
    pub fn begin_remove(&self, name: impl Into<String>) -> Result<OperationGuard, Busy> {
        self.try_begin(Operation::Removing { name: name.into() })
    }

    fn try_begin(&self, operation: Operation) -> Result<OperationGuard, Busy> {
        let mut slot = self.lock();
        if slot.is_busy() {
            return Err(Busy {
                active: slot.clone(),
            });
        }
        debug!(operation = %operation, "Operation started");
        *slot = operation.clone();
        Ok(OperationGuard {
            slot: Arc::clone(&self.slot),
            operation,
        })
    }
}

/// Holds the slot for one operation and releases it on drop.
#[derive(Debug)]
#[must_use = "the operation ends as soon as the guard is dropped"]
pub struct OperationGuard {
    slot: Arc<Mutex<Operation>>,
    operation: Operation,
}

impl OperationGuard {
    /// The operation this guard holds.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if *slot != self.operation {
            error!(
                expected = %self.operation,
                found = %*slot,
                "Operation slot was overwritten while held"
            );
        }
        *slot = Operation::Idle;
        debug!(operation = %self.operation, "Operation finished");
    }
}
