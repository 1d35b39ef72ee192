//! Error types for the rochefort client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RochefortError
pub type Result<T> = std::result::Result<T, RochefortError>;

/// Unified error type for rochefort client operations
#[derive(Debug, Error)]
pub enum RochefortError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Encoding / Decoding Errors
    // -------------------------------------------------------------------------
    /// A negative value was supplied where an unsigned offset is required
    #[error("Invalid offset: {0}")]
    InvalidOffset(i64),

    /// The stream ended in the middle of a frame
    #[error("Truncated stream: {buffered} bytes buffered, {needed} needed")]
    TruncatedStream { buffered: usize, needed: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Invalid search query: {0}")]
    SearchQueryInvalid(String),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Non-success status returned by the remote engine
    #[error("Server error: status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RochefortError {
    /// Map an I/O error raised while reading a response body.
    ///
    /// Read deadlines surface as `TimedOut` or `WouldBlock` depending on the
    /// platform, or as a wrapped reqwest timeout; all become `Timeout`.
    pub(crate) fn from_body_io(err: std::io::Error) -> Self {
        let wrapped_timeout = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .map_or(false, reqwest::Error::is_timeout);

        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                RochefortError::Timeout(err.to_string())
            }
            _ if wrapped_timeout => RochefortError::Timeout(err.to_string()),
            _ => RochefortError::Io(err),
        }
    }
}

impl From<serde_json::Error> for RochefortError {
    fn from(err: serde_json::Error) -> Self {
        RochefortError::Serialization(err.to_string())
    }
}
