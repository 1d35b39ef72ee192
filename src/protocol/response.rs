//! Response definitions
//!
//! Raw transport responses and the JSON bodies of append, modify, delete
//! and stats.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Result, RochefortError};
use super::Offset;

/// Streaming response body
pub type ResponseBody = Box<dyn Read + Send>;

/// A response as returned by a transport
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Body, consumed lazily
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    /// A response with an in-memory body
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status, std::io::Cursor::new(body.into()))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `ServerError`, capturing the body text
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self.status;
        let body = match self.into_bytes() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("<unreadable body: {}>", e),
        };
        tracing::warn!(status, body = %body, "server returned an error");

        Err(RochefortError::ServerError { status, body })
    }

    /// Read the whole body
    pub fn into_bytes(mut self) -> Result<Bytes> {
        let mut out = Vec::new();
        self.body
            .read_to_end(&mut out)
            .map_err(RochefortError::from_body_io)?;
        Ok(Bytes::from(out))
    }

    /// Read and parse a JSON body
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.into_bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Body of a successful append
///
/// The offset stays signed on the wire: a server reporting failure with a
/// negative offset is caught by `offset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResponse {
    pub offset: i64,
}

impl AppendResponse {
    pub fn offset(&self) -> Result<Offset> {
        Offset::try_from(self.offset)
    }
}

/// Body of modify and delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Body of stats
///
/// Missing fields read as zero, so older servers reporting only tag counts
/// still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Live records in the namespace
    #[serde(default)]
    pub records: u64,

    /// Logical payload bytes across those records
    #[serde(default)]
    pub bytes: u64,

    /// Offset the next append will receive
    #[serde(default)]
    pub offset: u64,

    /// Records per tag
    #[serde(default)]
    pub tags: BTreeMap<String, u64>,
}
