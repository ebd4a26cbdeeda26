//! Error types for cartpulse.

use std::io;
use thiserror::Error;

/// Result type alias for cartpulse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cartpulse operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage I/O error.
    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The persisted record would not fit in the configured quota.
    #[error("Storage quota exceeded: record needs {needed} bytes, limit is {limit}")]
    QuotaExceeded {
        /// Serialized size of the rejected record.
        needed: usize,
        /// Configured byte ceiling.
        limit: usize,
    },

    /// Transport-level failure (connection refused, DNS, timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote answered with a non-success status.
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// Remote answered 2xx with a body we could not use.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No persisted record exists.
    #[error("No persisted session record")]
    RecordNotFound,

    /// Host signal could not be understood.
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
