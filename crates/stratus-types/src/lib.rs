//! Platform-agnostic types for the Stratus offline weather sync core.
//!
//! This crate provides shared types used by the persistent store
//! (stratus-store), the sync layer (stratus-sync), and the refresh
//! service (stratus-service).
//!
//! # Features
//!
//! - Coordinate and weather condition data types
//! - Typed projection of opaque provider payloads
//! - Queue method taxonomy for the sync queue
//! - Error types for payload parsing
//!
//! # Example
//!
//! ```
//! use stratus_types::{QueueMethod, WeatherCondition};
//!
//! assert_eq!(WeatherCondition::from_category("rain"), WeatherCondition::Rain);
//! assert_eq!("delete".parse::<QueueMethod>()?, QueueMethod::Delete);
//! # Ok::<(), stratus_types::ParseError>(())
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{Coordinates, QueueMethod, WeatherCondition, WeatherReport};
