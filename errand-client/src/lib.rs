//! Errand HTTP Client
//!
//! A simple, type-safe HTTP client for the Errand orchestrator API.
//!
//! # Example
//!
//! ```no_run
//! use errand_client::ErrandClient;
//! use errand_core::dto::job::CreateJob;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ErrandClient::new("http://localhost:8000");
//!
//!     let job = client.submit_job(CreateJob::new("write a haiku to haiku.txt")).await?;
//!     println!("Submitted job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod service;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the Errand orchestrator API
///
/// Methods are organized into two groups:
/// - Service endpoints (banner, health, stats)
/// - Job lifecycle (submit, get, list, delete, wait, artifact download)
#[derive(Debug, Clone)]
pub struct ErrandClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ErrandClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use errand_client::ErrandClient;
    ///
    /// let client = ErrandClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL from raw path segments
    ///
    /// Each segment is percent-encoded on its own, so a segment containing
    /// `/` or `..` reaches the server verbatim instead of being normalized.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("Invalid base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidRequest(format!("Base URL cannot have a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await?;
        Ok(())
    }

    /// Handle an API response with a raw body
    async fn handle_bytes_response(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let response = self.check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(
                status.as_u16(),
                extract_error_message(&error_text),
            ));
        }

        Ok(response)
    }
}

/// Pull the message out of an `{"error": "..."}` body, or keep the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
