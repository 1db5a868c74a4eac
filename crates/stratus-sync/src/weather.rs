//! Weather data source boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use stratus_types::{Coordinates, WeatherReport};

/// Default timeout for interactive weather fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a weather data source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Provider returned status {0}")]
    Status(u16),

    /// The provider payload did not project into a report.
    #[error("Malformed provider payload: {0}")]
    Decode(#[from] stratus_types::ParseError),
}

/// A fetched weather result: the typed projection plus the raw payload
/// that goes into the cache verbatim.
#[derive(Debug, Clone)]
pub struct FetchedWeather {
    /// Typed projection used by notification criteria and display.
    pub report: WeatherReport,
    /// Opaque provider payload for the cache.
    pub payload: serde_json::Value,
}

/// A source of current weather for a coordinate pair.
///
/// Any HTTP/JSON provider satisfying this shape is acceptable; tests use
/// scripted implementations.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch current weather for the given coordinates.
    async fn fetch(&self, coordinates: &Coordinates) -> Result<FetchedWeather, FetchError>;
}

/// HTTP weather source hitting the compact widget endpoint.
#[derive(Debug, Clone)]
pub struct HttpWeatherSource {
    client: Client,
    base_url: String,
}

impl HttpWeatherSource {
    /// Create a source against the given base URL.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<FetchedWeather, FetchError> {
        let url = format!(
            "{}/api/widget-data?lat={}&lon={}",
            self.base_url.trim_end_matches('/'),
            coordinates.latitude,
            coordinates.longitude
        );
        debug!("Fetching weather from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let payload: serde_json::Value = response.json().await?;
        let report = WeatherReport::from_payload(&payload)?;

        Ok(FetchedWeather { report, payload })
    }
}
