//! Backend mutation endpoint boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use stratus_types::QueueMethod;

/// Default timeout for backend replay calls. Background sync tolerates
/// slower round-trips than interactive fetches.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a backend mutation endpoint.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport failure, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {0}")]
    Status(u16),
}

/// Delivers mutations to the backend.
///
/// The core does not interpret responses beyond success or failure; the
/// backend's own idempotency governs duplicate application.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Deliver one mutation. `Ok(())` means the backend acknowledged it.
    async fn deliver(
        &self,
        queue_name: &str,
        method: QueueMethod,
        data: &serde_json::Value,
    ) -> Result<(), BackendError>;
}

/// HTTP backend mapping queue methods onto REST verbs per queue resource.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend client against the given base URL.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn deliver(
        &self,
        queue_name: &str,
        method: QueueMethod,
        data: &serde_json::Value,
    ) -> Result<(), BackendError> {
        let url = format!("{}/api/{}", self.base_url.trim_end_matches('/'), queue_name);
        debug!("Delivering {} to {}", method, url);

        let request = match method {
            QueueMethod::Create => self.client.post(&url),
            QueueMethod::Update => self.client.put(&url),
            QueueMethod::Delete => self.client.delete(&url),
        };

        let response = request.json(data).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}
