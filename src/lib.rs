//! # rochefort
//!
//! Client for the rochefort "disk speed append + offset" service:
//! - Append records and address them by opaque 64-bit offsets
//! - In-place modification within a reserved allocation
//! - Bulk fetch, streaming scan and tag search over length-prefixed frames
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Client                               │
//! │  append · modify · get · getMulti · scan · search · stats    │
//! └──────────────┬───────────────────────────────▲──────────────┘
//!                │ HttpRequest                   │ frames
//!                ▼                               │
//!   ┌─────────────────────────┐        ┌─────────┴───────────┐
//!   │  Request encoding       │        │   StreamDecoder     │
//!   │  (offsets, query JSON)  │        │ (4 / 12 byte hdrs)  │
//!   └────────────┬────────────┘        └─────────▲───────────┘
//!                │                               │ body bytes
//!                ▼                               │
//!   ┌────────────────────────────────────────────┴───────────┐
//!   │                     Transport                          │
//!   │         (HTTP via reqwest, or in-process loopback)     │
//!   └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rochefort::{AppendRequest, Client, ClientConfig, GetRequest};
//!
//! # fn main() -> rochefort::Result<()> {
//! let client = Client::connect(ClientConfig::builder().base_url("http://localhost:8000").build())?;
//! let offset = client.append(&AppendRequest::new("events", &b"hello"[..]).tag("greeting"))?;
//! let data = client.get(&GetRequest::new("events", offset))?;
//! assert_eq!(&data[..], b"hello");
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RochefortError, Result};
pub use config::{CallOptions, ClientConfig};
pub use client::{Client, FrameStream};
pub use protocol::{
    AppendRequest, DeleteRequest, Frame, GetMultiRequest, GetRequest, ModifyRequest, Namespace,
    Offset, OffsetEncoding, Position, Query, ScanRequest, SearchRequest, StatsRequest,
    StatsResponse,
};
pub use transport::{HttpTransport, LoopbackTransport, Transport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
