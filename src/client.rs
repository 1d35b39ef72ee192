//! Client Module
//!
//! Composes request encoding, a transport and the stream decoder into the
//! service operations.
//!
//! ## Operations
//! - append / modify / delete / stats: JSON response
//! - get: raw body
//! - getMulti: plain frames, collected
//! - scan / search: scan frames, streamed through a fresh `FrameStream`

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::protocol::{
    AppendRequest, AppendResponse, DeleteRequest, FrameReader, GetMultiRequest, GetRequest,
    HeaderLayout, HttpRequest, HttpResponse, ModifyRequest, Offset, ResponseBody, ScanRequest,
    SearchRequest, StatsRequest, StatsResponse, StreamDecoder, SuccessResponse,
};
use crate::transport::{HttpTransport, Transport};

/// Lazy sequence of frames from a scan or search response
pub type FrameStream = FrameReader<ResponseBody>;

/// Client for one service endpoint
///
/// Every call is a single request/response exchange; the client holds no
/// per-call state, so it can be shared across threads when the transport
/// allows it.
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl Client<HttpTransport> {
    /// Create an HTTP client for `config.base_url`
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { config, transport })
    }
}

impl<T: Transport> Client<T> {
    /// Create a client over an existing transport
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Append a record and return its offset
    pub fn append(&self, request: &AppendRequest) -> Result<Offset> {
        let response: AppendResponse = self.send(request.to_http(&self.config))?.json()?;
        response.offset()
    }

    /// Modify a record in place; false if the engine rejected the write
    pub fn modify(&self, request: &ModifyRequest) -> Result<bool> {
        let response: SuccessResponse = self.send(request.to_http(&self.config))?.json()?;
        if !response.success {
            tracing::debug!(
                offset = %request.offset,
                position = request.position.wire_value(),
                "modify rejected"
            );
        }
        Ok(response.success)
    }

    /// Fetch one record
    pub fn get(&self, request: &GetRequest) -> Result<Bytes> {
        self.send(request.to_http(&self.config))?.into_bytes()
    }

    /// Fetch several records in one exchange
    ///
    /// Payloads come back in request order. The whole stream must decode;
    /// any error discards the partial result.
    pub fn get_multi(&self, request: &GetMultiRequest) -> Result<Vec<Bytes>> {
        if request.offsets.is_empty() {
            return Ok(Vec::new());
        }

        let response = self.send(request.to_http(&self.config))?;
        self.frames(response, HeaderLayout::Plain)
            .map(|frame| frame.map(|f| f.payload))
            .collect()
    }

    /// Stream every record in a namespace
    pub fn scan(&self, request: &ScanRequest) -> Result<FrameStream> {
        let response = self.send(request.to_http(&self.config))?;
        Ok(self.frames(response, HeaderLayout::Scan))
    }

    /// Stream the records matching a tag query
    pub fn search(&self, request: &SearchRequest) -> Result<FrameStream> {
        let http = request.to_http(&self.config)?;
        tracing::debug!(query = %request.query, "search");
        let response = self.send(http)?;
        Ok(self.frames(response, HeaderLayout::Scan))
    }

    /// Drop a namespace
    pub fn delete(&self, request: &DeleteRequest) -> Result<bool> {
        let response: SuccessResponse = self.send(request.to_http(&self.config))?.json()?;
        Ok(response.success)
    }

    /// Per-namespace counters
    pub fn stats(&self, request: &StatsRequest) -> Result<StatsResponse> {
        self.send(request.to_http(&self.config))?.json()
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(
            endpoint = request.endpoint.path(),
            namespace = %request.namespace(),
            body_len = request.body.len(),
            "sending request"
        );

        self.transport.execute(request)?.error_for_status()
    }

    fn frames(&self, response: HttpResponse, layout: HeaderLayout) -> FrameStream {
        let decoder = StreamDecoder::with_max_payload(layout, self.config.max_payload_size);
        FrameReader::with_chunk_size(response.body, decoder, self.config.read_chunk_size)
    }
}
