//! Error types for stratus-store.

use std::path::PathBuf;

/// Result type for stratus-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stratus-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Coordinates are non-finite or outside geographic bounds.
    ///
    /// This is a caller bug, surfaced synchronously and never retried.
    #[error("Invalid coordinates: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// A favorite label was empty or whitespace-only.
    #[error("Favorite label must not be empty")]
    EmptyLabel,

    /// A stored value failed to round-trip through JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted enum representation was unrecognized.
    #[error("Corrupt record: {0}")]
    Parse(#[from] stratus_types::ParseError),
}
