//! HTTP registry client.
//!
//! Queries an npmsearch-style endpoint for packages whose name matches a
//! topic, sorted by rating. Handles request/response processing, error
//! mapping and retry logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::error::{RegistryError, Result};
use super::types::{PackageDescriptor, SearchResponse};
use super::PackageRegistry;
use crate::config::Settings;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Fields requested from the search endpoint.
const SEARCH_FIELDS: &str = "name,rating,version,description";

/// The registry HTTP client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// The HTTP client.
    client: Client,
    /// The base URL of the registry.
    base_url: String,
}

impl RegistryClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("plugman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RegistryError::Network)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    /// Create a client from application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_timeout(
            &settings.registry_url,
            Duration::from_secs(settings.operation_timeout_secs.min(DEFAULT_TIMEOUT_SECS)),
        )
    }

    /// Build the search URL for a topic.
    fn search_url(&self, topic: &str) -> String {
        format!(
            "{}/query?q=name:{}&fields={}&default_operator=AND&sort=rating:desc",
            self.base_url,
            urlencoding::encode(topic),
            SEARCH_FIELDS
        )
    }

    /// Perform a GET request with retry logic for transient failures.
    #[instrument(skip(self), fields(url = %url))]
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempts = 0;
        let mut last_error: Option<RegistryError> = None;

        while attempts < MAX_RETRIES {
            attempts += 1;
            debug!("Request attempt {}/{}", attempts, MAX_RETRIES);

            match self.execute_get::<T>(url).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if e.is_retryable() && attempts < MAX_RETRIES {
                        let delay = calculate_retry_delay(attempts);
                        warn!(
                            "Request failed (attempt {}), retrying in {}ms: {}",
                            attempts, delay, e
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RegistryError::ServerError("Max retries exceeded".to_string())))
    }

    /// Execute a single GET request.
    async fn execute_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl PackageRegistry for RegistryClient {
    #[instrument(skip(self))]
    async fn search(&self, topic: &str) -> Result<Vec<PackageDescriptor>> {
        let url = self.search_url(topic);
        let response: SearchResponse = self.get(&url).await?;
        let packages = response.into_descriptors();
        debug!("Registry returned {} packages", packages.len());
        Ok(packages)
    }
}

/// Check the HTTP status and parse the JSON body.
async fn handle_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let url = response.url().to_string();

    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| RegistryError::InvalidResponse(format!("Failed to parse response: {}", e)))
    } else {
        let body = response.text().await.unwrap_or_default();
        debug!("Error response body: {}", body);
        Err(error_from_response(status, &url, &body))
    }
}

/// Create an error from a failed response, preferring the body's message.
fn error_from_response(status: StatusCode, url: &str, body: &str) -> RegistryError {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("error").and_then(|v| v.as_str()) {
            return RegistryError::from_status(status, message);
        }
    }
    RegistryError::from_status(status, url)
}

/// Calculate retry delay with exponential backoff.
fn calculate_retry_delay(attempt: u32) -> u64 {
    RETRY_DELAY_MS * 2u64.pow(attempt - 1)
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
