//! Configuration for the rochefort client
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::protocol::OffsetEncoding;

/// Default read/connect timeout, matching the one-second default of the
/// service's other clients
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default maximum payload accepted per decoded frame (1 GiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1024 * 1024 * 1024;

/// Default size of each read from a streaming response body
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Main configuration for a rochefort client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Base URL of the service. Operation paths (`append`, `get`, ...) are
    /// resolved relative to it, so a path prefix is kept:
    ///   http://host:8000/        -> http://host:8000/append
    ///   http://host:8000/store   -> http://host:8000/store/append
    pub base_url: String,

    // -------------------------------------------------------------------------
    // Timeout Configuration
    // -------------------------------------------------------------------------
    /// Response read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection open timeout (milliseconds)
    pub connect_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Wire format for getMulti offset lists
    pub offset_encoding: OffsetEncoding,

    /// Max payload length accepted in a single frame (in bytes)
    pub max_payload_size: u32,

    /// Bytes requested per read when streaming a response body
    pub read_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            offset_encoding: OffsetEncoding::Binary,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the service base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the getMulti offset encoding
    pub fn offset_encoding(mut self, encoding: OffsetEncoding) -> Self {
        self.config.offset_encoding = encoding;
        self
    }

    /// Set the maximum accepted frame payload (in bytes)
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set the streaming read chunk size (in bytes, at least 1)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size.max(1);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Per-call overrides of the client-wide timeouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides `ClientConfig::read_timeout_ms` when set
    pub read_timeout: Option<Duration>,

    /// Overrides `ClientConfig::connect_timeout_ms` when set
    pub connect_timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Resolve against the client config
    pub fn resolve(&self, config: &ClientConfig) -> Timeouts {
        Timeouts {
            read: self.read_timeout.unwrap_or_else(|| config.read_timeout()),
            connect: self.connect_timeout.unwrap_or_else(|| config.connect_timeout()),
        }
    }
}

/// Effective timeouts handed to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            connect: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}
