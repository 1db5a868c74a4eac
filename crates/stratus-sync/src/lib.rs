//! Cache policy and sync queue for the Stratus offline weather sync core.
//!
//! This crate decides when cached weather is servable without a network
//! round-trip and guarantees eventual delivery of mutations made while the
//! backend is unreachable.
//!
//! # Components
//!
//! - [`policy`] - location-key derivation and freshness decisions
//! - [`Outbox`] - attempt-then-fallback submission and strict-FIFO replay
//! - [`WeatherSource`] / [`BackendClient`] - injectable network boundaries
//!   with reqwest-based HTTP implementations
//!
//! # Example
//!
//! ```no_run
//! use stratus_store::Store;
//! use stratus_sync::{HttpBackend, Outbox, backend::DEFAULT_BACKEND_TIMEOUT};
//! use stratus_types::QueueMethod;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open_default()?;
//! let backend = HttpBackend::new("https://api.example.com", DEFAULT_BACKEND_TIMEOUT)?;
//! let outbox = Outbox::new(Box::new(backend));
//!
//! // Delivered now, or queued for the next flush - never an error
//! let outcome = outbox
//!     .submit(&store, "favorites", QueueMethod::Create,
//!             serde_json::json!({"lat": 40.7, "lon": -74.0}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod outbox;
pub mod policy;
pub mod weather;

pub use backend::{BackendClient, BackendError, HttpBackend};
pub use outbox::{FlushReport, Outbox, SubmitOutcome};
pub use policy::{CacheLookup, is_fresh, location_key, resolve};
pub use weather::{FetchError, FetchedWeather, HttpWeatherSource, WeatherSource};
