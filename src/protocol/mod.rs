//! Protocol Module
//!
//! Wire-level logic shared by every transport.
//!
//! ## Request Bodies
//! - append / modify: raw record bytes
//! - getMulti: offset list (see `codec`)
//! - stats: none, JSON counters back
//! - search: JSON query tree (see `query`)
//!
//! ## Streamed Response Bodies
//!
//! ### getMulti (plain layout)
//! ```text
//! ┌──────────┬──────────────────┬──────────┬──────────────────┐
//! │ Len (4)  │     Payload      │ Len (4)  │     Payload      │ ...
//! └──────────┴──────────────────┴──────────┴──────────────────┘
//! ```
//!
//! ### scan / search (scan layout)
//! ```text
//! ┌──────────┬────────────┬──────────────────┐
//! │ Len (4)  │ Offset (8) │     Payload      │ ...
//! └──────────┴────────────┴──────────────────┘
//! ```
//!
//! All integers little-endian.

mod types;
mod frame;
mod decoder;
mod query;
mod request;
mod response;
pub mod codec;

pub use types::{Namespace, Offset};
pub use frame::{Frame, HeaderLayout, PLAIN_HEADER_SIZE, SCAN_HEADER_SIZE};
pub use decoder::{FrameReader, StreamDecoder};
pub use query::Query;
pub use request::{
    AppendRequest, DeleteRequest, Endpoint, GetMultiRequest, GetRequest, HttpRequest, Method,
    ModifyRequest, Position, ScanRequest, SearchRequest, StatsRequest,
};
pub use response::{
    AppendResponse, HttpResponse, ResponseBody, StatsResponse, SuccessResponse,
};
pub use codec::{decode_offsets, encode_offsets, parse_offset, OffsetEncoding};
