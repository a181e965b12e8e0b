//! plugman - a launcher-style package manager for host plugins
//!
//! Queries typed after the plugin prefix (`/hpm` by default) are parsed into
//! `install`, `remove` and `list` commands and answered with result rows.
//! Installs and removals run in the background; one operation at a time.

pub mod cache;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod notification;
pub mod progress;
pub mod registry;
pub mod status;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use dispatcher::Dispatcher;
pub use error::{AppError, Result};
