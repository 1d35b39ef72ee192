//! Request definitions
//!
//! One typed request per operation, and the transport-level `HttpRequest`
//! they lower into.

use bytes::Bytes;

use crate::config::{CallOptions, ClientConfig, Timeouts};
use crate::error::{Result, RochefortError};
use super::codec::{encode_offsets, OffsetEncoding, ENCODING_PARAM};
use super::{Namespace, Offset, Query};

/// HTTP methods used by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Service endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Append,
    Modify,
    Get,
    GetMulti,
    Scan,
    Query,
    Delete,
    Stats,
}

impl Endpoint {
    /// Path relative to the base URL
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Append => "append",
            Endpoint::Modify => "modify",
            Endpoint::Get => "get",
            Endpoint::GetMulti => "getMulti",
            Endpoint::Scan => "scan",
            Endpoint::Query => "query",
            Endpoint::Delete => "delete",
            Endpoint::Stats => "stat",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::Append | Endpoint::Modify | Endpoint::Delete | Endpoint::Stats => {
                Method::Post
            }
            Endpoint::Get | Endpoint::GetMulti | Endpoint::Scan | Endpoint::Query => Method::Get,
        }
    }
}

/// A fully encoded request ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub endpoint: Endpoint,

    /// Query parameters in send order; keys may repeat
    pub query: Vec<(&'static str, String)>,

    pub body: Bytes,

    pub timeouts: Timeouts,
}

impl HttpRequest {
    /// Start a request scoped to `namespace`
    pub fn new(endpoint: Endpoint, namespace: &Namespace) -> Self {
        Self {
            endpoint,
            query: vec![("namespace", namespace.as_str().to_string())],
            body: Bytes::new(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn method(&self) -> Method {
        self.endpoint.method()
    }

    /// First value of a query parameter
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query parameter
    pub fn query_params<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Namespace parameter (empty for the default namespace)
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.query_param("namespace").unwrap_or_default())
    }
}

// =============================================================================
// Modify Position
// =============================================================================

/// Where a modify write starts within a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Overwrite starting at this byte index
    At(u32),

    /// Append at the current logical end of the record
    End,
}

impl Position {
    /// Wire value of the `pos` parameter
    pub fn wire_value(self) -> i64 {
        match self {
            Position::At(pos) => i64::from(pos),
            Position::End => -1,
        }
    }

    pub fn from_wire(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Position::End),
            v => u32::try_from(v)
                .map(Position::At)
                .map_err(|_| RochefortError::Protocol(format!("Invalid modify position: {}", v))),
        }
    }
}

// =============================================================================
// Operation Requests
// =============================================================================

/// Append a record
#[derive(Debug, Clone, Default)]
pub struct AppendRequest {
    pub namespace: Namespace,
    pub data: Bytes,

    /// Reserved span, enabling later in-place growth
    pub alloc_size: Option<u32>,

    /// Tags indexed for search
    pub tags: Vec<String>,

    pub options: CallOptions,
}

impl AppendRequest {
    pub fn new(namespace: impl Into<Namespace>, data: impl Into<Bytes>) -> Self {
        Self {
            namespace: namespace.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn alloc_size(mut self, size: u32) -> Self {
        self.alloc_size = Some(size);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        let mut request = HttpRequest::new(Endpoint::Append, &self.namespace);
        if let Some(size) = self.alloc_size {
            request = request.param("allocSize", size);
        }
        for tag in &self.tags {
            request = request.param("tags", tag);
        }
        request
            .body(self.data.clone())
            .timeouts(self.options.resolve(config))
    }
}

/// Overwrite or extend part of a previously appended record
#[derive(Debug, Clone)]
pub struct ModifyRequest {
    pub namespace: Namespace,
    pub offset: Offset,
    pub position: Position,
    pub data: Bytes,

    /// Truncate the logical length to the end of this write
    pub reset_length: bool,

    pub options: CallOptions,
}

impl ModifyRequest {
    pub fn new(
        namespace: impl Into<Namespace>,
        offset: Offset,
        position: Position,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            offset,
            position,
            data: data.into(),
            reset_length: false,
            options: CallOptions::default(),
        }
    }

    pub fn reset_length(mut self, reset: bool) -> Self {
        self.reset_length = reset;
        self
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        let mut request = HttpRequest::new(Endpoint::Modify, &self.namespace)
            .param("offset", self.offset)
            .param("pos", self.position.wire_value());
        if self.reset_length {
            request = request.param("resetLength", true);
        }
        request
            .body(self.data.clone())
            .timeouts(self.options.resolve(config))
    }
}

/// Fetch one record
#[derive(Debug, Clone)]
pub struct GetRequest {
    pub namespace: Namespace,
    pub offset: Offset,
    pub options: CallOptions,
}

impl GetRequest {
    pub fn new(namespace: impl Into<Namespace>, offset: Offset) -> Self {
        Self {
            namespace: namespace.into(),
            offset,
            options: CallOptions::default(),
        }
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        HttpRequest::new(Endpoint::Get, &self.namespace)
            .param("offset", self.offset)
            .timeouts(self.options.resolve(config))
    }
}

/// Fetch many records in one exchange
#[derive(Debug, Clone)]
pub struct GetMultiRequest {
    pub namespace: Namespace,
    pub offsets: Vec<Offset>,

    /// Overrides `ClientConfig::offset_encoding` when set
    pub encoding: Option<OffsetEncoding>,

    pub options: CallOptions,
}

impl GetMultiRequest {
    pub fn new(namespace: impl Into<Namespace>, offsets: impl IntoIterator<Item = Offset>) -> Self {
        Self {
            namespace: namespace.into(),
            offsets: offsets.into_iter().collect(),
            encoding: None,
            options: CallOptions::default(),
        }
    }

    pub fn encoding(mut self, encoding: OffsetEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        let encoding = self.encoding.unwrap_or(config.offset_encoding);
        let mut request = HttpRequest::new(Endpoint::GetMulti, &self.namespace);
        if let Some(flag) = encoding.flag() {
            request = request.param(ENCODING_PARAM, flag);
        }
        request
            .body(encode_offsets(&self.offsets, encoding))
            .timeouts(self.options.resolve(config))
    }
}

/// Stream every record of a namespace
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub namespace: Namespace,
    pub options: CallOptions,
}

impl ScanRequest {
    pub fn new(namespace: impl Into<Namespace>) -> Self {
        Self {
            namespace: namespace.into(),
            options: CallOptions::default(),
        }
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        HttpRequest::new(Endpoint::Scan, &self.namespace).timeouts(self.options.resolve(config))
    }
}

/// Stream the records matching a tag query
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub namespace: Namespace,
    pub query: Query,
    pub options: CallOptions,
}

impl SearchRequest {
    pub fn new(namespace: impl Into<Namespace>, query: Query) -> Self {
        Self {
            namespace: namespace.into(),
            query,
            options: CallOptions::default(),
        }
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Fails with `SearchQueryInvalid` for a malformed tree
    pub fn to_http(&self, config: &ClientConfig) -> Result<HttpRequest> {
        Ok(HttpRequest::new(Endpoint::Query, &self.namespace)
            .body(self.query.to_json()?)
            .timeouts(self.options.resolve(config)))
    }
}

/// Drop a namespace and all of its records
#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub namespace: Namespace,
    pub options: CallOptions,
}

impl DeleteRequest {
    pub fn new(namespace: impl Into<Namespace>) -> Self {
        Self {
            namespace: namespace.into(),
            options: CallOptions::default(),
        }
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        HttpRequest::new(Endpoint::Delete, &self.namespace).timeouts(self.options.resolve(config))
    }
}

/// Per-namespace counters
#[derive(Debug, Clone, Default)]
pub struct StatsRequest {
    pub namespace: Namespace,
    pub options: CallOptions,
}

impl StatsRequest {
    pub fn new(namespace: impl Into<Namespace>) -> Self {
        Self {
            namespace: namespace.into(),
            options: CallOptions::default(),
        }
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        HttpRequest::new(Endpoint::Stats, &self.namespace).timeouts(self.options.resolve(config))
    }
}
