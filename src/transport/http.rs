//! HTTP transport
//!
//! Blocking reqwest client. Each exchange runs on a worker thread that
//! forwards the response head and then body chunks over a bounded channel,
//! so deadlines apply to each wait instead of the whole exchange:
//! - head: connect timeout + read timeout from the start of the request
//! - body: read timeout between consecutive chunks
//!
//! A scan that keeps producing bytes never times out, however long it runs.

use std::io::{self, ErrorKind, Read};
use std::thread;
use std::time::Duration;

use bytes::{Buf, Bytes};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use reqwest::blocking::{Client as ReqwestClient, RequestBuilder};
use reqwest::Url;

use crate::config::ClientConfig;
use crate::error::{Result, RochefortError};
use crate::protocol::{HttpRequest, HttpResponse, Method};
use super::Transport;

/// Body chunks buffered ahead of the reader
const CHANNEL_DEPTH: usize = 16;

/// Transport speaking HTTP/1.1 to a running service
pub struct HttpTransport {
    /// Base URL, always ending in `/`
    base_url: Url,

    /// Shared client built with the configured connect timeout
    client: ReqwestClient,

    connect_timeout: Duration,

    /// Bytes the worker reads from the socket per chunk
    read_chunk_size: usize,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let connect_timeout = config.connect_timeout();
        let client = build_client(connect_timeout)?;

        Ok(Self {
            base_url,
            client,
            connect_timeout,
            read_chunk_size: config.read_chunk_size,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a request, query string included
    pub fn url_for(&self, request: &HttpRequest) -> Result<Url> {
        let mut url = self
            .base_url
            .join(request.endpoint.path())
            .map_err(|e| RochefortError::Config(format!("Invalid endpoint URL: {}", e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.url_for(&request)?;

        // The connect timeout is fixed per reqwest client; honor a per-call
        // override with a one-off client.
        let client = if request.timeouts.connect == self.connect_timeout {
            self.client.clone()
        } else {
            build_client(request.timeouts.connect)?
        };

        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = client.request(method, url);
        if !request.body.is_empty() {
            builder = builder.body(request.body.to_vec());
        }

        let (tx, rx) = channel::bounded(CHANNEL_DEPTH);
        let chunk_size = self.read_chunk_size;
        thread::Builder::new()
            .name("rochefort-http".to_string())
            .spawn(move || run_exchange(builder, chunk_size, tx))
            .map_err(|e| RochefortError::Transport(format!("Failed to spawn HTTP worker: {}", e)))?;

        let head_timeout = request.timeouts.connect + request.timeouts.read;
        match rx.recv_timeout(head_timeout) {
            Ok(Event::Head(status)) => Ok(HttpResponse::new(
                status,
                StreamingBody::new(rx, request.timeouts.read),
            )),
            Ok(Event::Rejected(e)) => Err(e),
            Ok(_) => Err(RochefortError::Transport(
                "Response body arrived before its head".to_string(),
            )),
            Err(RecvTimeoutError::Timeout) => Err(RochefortError::Timeout(format!(
                "No response within {:?}",
                head_timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(RochefortError::Transport(
                "HTTP worker exited without a response".to_string(),
            )),
        }
    }
}

// =============================================================================
// Exchange Worker
// =============================================================================

/// Messages from the exchange worker to the caller
enum Event {
    /// Response head received
    Head(u16),

    Data(Bytes),

    /// Body complete
    End,

    /// The request failed before a response head arrived
    Rejected(RochefortError),

    /// A body read failed
    Failed(io::Error),
}

/// Send the request and pump the body into `tx` until it ends or the
/// receiver goes away.
///
/// reqwest carries no deadline here. A server that stalls mid-body parks the
/// worker until the connection closes; the caller has already timed out.
fn run_exchange(builder: RequestBuilder, chunk_size: usize, tx: Sender<Event>) {
    let mut response = match builder.send() {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(Event::Rejected(map_reqwest_error(e)));
            return;
        }
    };

    if tx.send(Event::Head(response.status().as_u16())).is_err() {
        return;
    }

    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        let event = match response.read(&mut chunk) {
            Ok(0) => Event::End,
            Ok(n) => Event::Data(Bytes::copy_from_slice(&chunk[..n])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => Event::Failed(e),
        };

        let last = !matches!(event, Event::Data(_));
        if tx.send(event).is_err() || last {
            return;
        }
    }
}

/// Response body fed by the exchange worker
///
/// Each `read` waits at most `read_timeout` for the next chunk and reports a
/// miss as `ErrorKind::TimedOut`.
struct StreamingBody {
    events: Receiver<Event>,
    read_timeout: Duration,
    pending: Bytes,
    finished: bool,
}

impl StreamingBody {
    fn new(events: Receiver<Event>, read_timeout: Duration) -> Self {
        Self {
            events,
            read_timeout,
            pending: Bytes::new(),
            finished: false,
        }
    }
}

impl Read for StreamingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            if self.finished {
                return Ok(0);
            }

            match self.events.recv_timeout(self.read_timeout) {
                Ok(Event::Data(data)) => self.pending = data,
                Ok(Event::End) => self.finished = true,
                Ok(Event::Failed(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                Ok(Event::Head(_)) | Ok(Event::Rejected(_)) => {
                    self.finished = true;
                    return Err(io::Error::new(
                        ErrorKind::InvalidData,
                        "unexpected response head inside body",
                    ));
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(
                        ErrorKind::TimedOut,
                        format!("no body bytes within {:?}", self.read_timeout),
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.finished = true;
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "HTTP worker exited mid-body",
                    ));
                }
            }
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Client without a whole-request deadline; waits are bounded by the caller
fn build_client(connect_timeout: Duration) -> Result<ReqwestClient> {
    ReqwestClient::builder()
        .connect_timeout(connect_timeout)
        .timeout(None::<Duration>)
        .build()
        .map_err(|e| RochefortError::Transport(format!("Failed to build HTTP client: {}", e)))
}

/// Parse the base URL and make sure relative joins keep its path
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| RochefortError::Config(format!("Invalid base URL {:?}: {}", raw, e)))?;

    if url.cannot_be_a_base() {
        return Err(RochefortError::Config(format!(
            "Base URL {:?} cannot carry a path",
            raw
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn map_reqwest_error(err: reqwest::Error) -> RochefortError {
    if err.is_timeout() {
        RochefortError::Timeout(err.to_string())
    } else {
        RochefortError::Transport(err.to_string())
    }
}
