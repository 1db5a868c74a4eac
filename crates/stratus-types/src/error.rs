//! Error types for data parsing in stratus-types.

use thiserror::Error;

/// Errors that can occur when parsing weather provider payloads or
/// persisted enum representations.
///
/// This error type is platform-agnostic and does not include storage or
/// network errors (those belong in stratus-store and stratus-sync).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A required field is missing from a provider payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but has an unusable value.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    /// An unrecognized queue method string.
    #[error("Unknown queue method: {0}")]
    UnknownMethod(String),
}

/// Result type alias using stratus-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
