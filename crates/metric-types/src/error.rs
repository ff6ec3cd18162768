//! Error types for metric-types crate.

use thiserror::Error;

/// Errors that can occur while decoding a message payload into metrics.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Metric '{0}' has no fields")]
    NoFields(String),

    #[error("Unsupported data format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;
