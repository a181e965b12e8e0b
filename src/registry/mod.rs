//! Remote package registry.
//!
//! [`PackageRegistry`] is the seam the cache queries for discoverable
//! packages; [`RegistryClient`] implements it over HTTP.

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::RegistryClient;
pub use error::{RegistryError, Result};
pub use types::{PackageDescriptor, SearchHit, SearchResponse};

/// Source of remotely discoverable packages.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Fetch packages matching `topic`, ranked by the registry.
    async fn search(&self, topic: &str) -> Result<Vec<PackageDescriptor>>;
}
