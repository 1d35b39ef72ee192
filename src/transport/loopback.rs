//! Loopback transport
//!
//! Routes requests to an in-process `MemoryEngine` that follows the
//! service's append/modify/search contract. Useful for testing without a
//! running server.
//!
//! ## Engine Contract
//! - append reserves `max(allocSize, len(data))` bytes and zero-pads
//! - modify writes inside the reservation only; gaps are zero-filled,
//!   `pos = -1` writes at the current logical end
//! - search: `And` intersects, `Or` unions in append order
//!
//! Response bodies can be cut into small chunks and faults can be queued to
//! exercise the client's streaming paths. Request recording is opt-in.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::io::{self, Read};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, RochefortError};
use crate::protocol::{
    decode_offsets, parse_offset, AppendResponse, Endpoint, Frame, HttpRequest, HttpResponse,
    Namespace, Offset, OffsetEncoding, Position, Query, StatsResponse, SuccessResponse,
};
use crate::protocol::codec::ENCODING_PARAM;
use super::Transport;

/// Bytes the engine accounts in front of every record: len (4) + time (8) + crc (4)
const RECORD_HEADER_SIZE: u64 = 16;

/// Namespace name used for the empty namespace
const DEFAULT_NAMESPACE: &str = "default";

// =============================================================================
// Engine
// =============================================================================

/// One allocated record
#[derive(Debug, Clone)]
struct StoredRecord {
    alloc_size: usize,

    /// Logical contents, never longer than `alloc_size`
    data: Vec<u8>,
}

/// Append log of a single namespace
#[derive(Debug, Default)]
struct NamespaceLog {
    /// Records keyed by offset; offsets grow with every append
    records: HashMap<u64, StoredRecord>,

    /// Append order
    order: Vec<u64>,

    /// Tag -> offsets, in append order
    postings: HashMap<String, Vec<u64>>,

    next_offset: u64,
}

impl NamespaceLog {
    fn append(&mut self, data: &[u8], alloc_size: Option<u32>, tags: &[String]) -> Offset {
        let offset = self.next_offset;
        let alloc_size = alloc_size.map_or(0, |s| s as usize).max(data.len());

        self.records.insert(
            offset,
            StoredRecord {
                alloc_size,
                data: data.to_vec(),
            },
        );
        self.order.push(offset);
        for tag in tags {
            let postings = self.postings.entry(tag.clone()).or_default();
            if postings.last() != Some(&offset) {
                postings.push(offset);
            }
        }
        self.next_offset += RECORD_HEADER_SIZE + alloc_size as u64;

        Offset(offset)
    }

    fn modify(&mut self, offset: Offset, position: Position, data: &[u8], reset_length: bool) -> bool {
        let record = match self.records.get_mut(&offset.get()) {
            Some(record) => record,
            None => return false,
        };

        let start = match position {
            Position::At(pos) => pos as usize,
            Position::End => record.data.len(),
        };
        let end = start + data.len();
        if end > record.alloc_size {
            return false;
        }

        if record.data.len() < end {
            record.data.resize(end, 0);
        }
        record.data[start..end].copy_from_slice(data);
        if reset_length {
            record.data.truncate(end);
        }

        true
    }

    fn stats(&self) -> StatsResponse {
        StatsResponse {
            records: self.order.len() as u64,
            bytes: self.records.values().map(|r| r.data.len() as u64).sum(),
            offset: self.next_offset,
            tags: self
                .postings
                .iter()
                .map(|(tag, offsets)| (tag.clone(), offsets.len() as u64))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn evaluate(&self, query: &Query) -> BTreeSet<u64> {
        match query {
            Query::Tag(name) => self
                .postings
                .get(name)
                .map(|offsets| offsets.iter().copied().collect())
                .unwrap_or_default(),
            Query::And(children) => {
                let mut sets = children.iter().map(|child| self.evaluate(child));
                let first = sets.next().unwrap_or_default();
                sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
            }
            Query::Or(children) => children
                .iter()
                .flat_map(|child| self.evaluate(child))
                .collect(),
        }
    }
}

/// In-memory implementation of the service contract
#[derive(Debug, Default)]
pub struct MemoryEngine {
    namespaces: RwLock<HashMap<String, NamespaceLog>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: &Namespace) -> String {
        if namespace.is_default() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            namespace.as_str().to_string()
        }
    }

    pub fn append(
        &self,
        namespace: &Namespace,
        data: &[u8],
        alloc_size: Option<u32>,
        tags: &[String],
    ) -> Offset {
        let mut namespaces = self.namespaces.write();
        namespaces
            .entry(Self::key(namespace))
            .or_default()
            .append(data, alloc_size, tags)
    }

    pub fn modify(
        &self,
        namespace: &Namespace,
        offset: Offset,
        position: Position,
        data: &[u8],
        reset_length: bool,
    ) -> bool {
        let mut namespaces = self.namespaces.write();
        namespaces
            .get_mut(&Self::key(namespace))
            .map_or(false, |log| log.modify(offset, position, data, reset_length))
    }

    pub fn get(&self, namespace: &Namespace, offset: Offset) -> Option<Bytes> {
        let namespaces = self.namespaces.read();
        namespaces
            .get(&Self::key(namespace))
            .and_then(|log| log.records.get(&offset.get()))
            .map(|record| Bytes::copy_from_slice(&record.data))
    }

    /// Every record in append order
    pub fn scan(&self, namespace: &Namespace) -> Vec<(Offset, Bytes)> {
        let namespaces = self.namespaces.read();
        let log = match namespaces.get(&Self::key(namespace)) {
            Some(log) => log,
            None => return Vec::new(),
        };

        log.order
            .iter()
            .map(|offset| {
                let record = &log.records[offset];
                (Offset(*offset), Bytes::copy_from_slice(&record.data))
            })
            .collect()
    }

    /// Records matching `query`, in append order
    pub fn search(&self, namespace: &Namespace, query: &Query) -> Vec<(Offset, Bytes)> {
        let namespaces = self.namespaces.read();
        let log = match namespaces.get(&Self::key(namespace)) {
            Some(log) => log,
            None => return Vec::new(),
        };

        // Offsets only grow, so ascending order is append order
        log.evaluate(query)
            .into_iter()
            .map(|offset| {
                let record = &log.records[&offset];
                (Offset(offset), Bytes::copy_from_slice(&record.data))
            })
            .collect()
    }

    /// Counters for a namespace; all zero if it does not exist
    pub fn stats(&self, namespace: &Namespace) -> StatsResponse {
        let namespaces = self.namespaces.read();
        namespaces
            .get(&Self::key(namespace))
            .map(NamespaceLog::stats)
            .unwrap_or_default()
    }

    /// Drop a namespace; true if it existed
    pub fn delete(&self, namespace: &Namespace) -> bool {
        self.namespaces.write().remove(&Self::key(namespace)).is_some()
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Fault injected into the next response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Reply with this status and body instead of handling the request
    Status(u16, String),

    /// Cut the response body after this many bytes
    TruncateAfter(usize),

    /// Deliver this many body bytes, then fail the read with `TimedOut`
    TimeoutAfter(usize),

    /// Fail the exchange before any response
    Timeout,
}

/// Transport backed by a `MemoryEngine`
pub struct LoopbackTransport {
    engine: Arc<MemoryEngine>,

    /// Max bytes returned by each body read
    chunk_size: usize,

    faults: Mutex<VecDeque<Fault>>,

    /// Keep a copy of every request
    record: bool,

    requests: Mutex<Vec<HttpRequest>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::with_engine(Arc::new(MemoryEngine::new()))
    }

    pub fn with_engine(engine: Arc<MemoryEngine>) -> Self {
        Self {
            engine,
            chunk_size: usize::MAX,
            faults: Mutex::new(VecDeque::new()),
            record: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Deliver response bodies in reads of at most `chunk_size` bytes
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn engine(&self) -> &Arc<MemoryEngine> {
        &self.engine
    }

    /// Queue a fault for the next request
    pub fn inject(&self, fault: Fault) {
        self.faults.lock().push_back(fault);
    }

    /// Record every request for later inspection
    pub fn with_recording(mut self) -> Self {
        self.record = true;
        self
    }

    /// Requests recorded so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Drain the recorded requests
    pub fn take_requests(&self) -> Vec<HttpRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// Dispatch a request to the engine
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        match self.route(request) {
            Ok((status, body)) => HttpResponse::from_bytes(status, body),
            Err(e) => HttpResponse::from_bytes(400, e.to_string()),
        }
    }

    fn route(&self, request: &HttpRequest) -> Result<(u16, Bytes)> {
        let namespace = request.namespace();

        match request.endpoint {
            Endpoint::Append => {
                let alloc_size = request
                    .query_param("allocSize")
                    .map(|raw| {
                        raw.parse::<u32>().map_err(|_| {
                            RochefortError::Protocol(format!("Invalid allocSize: {}", raw))
                        })
                    })
                    .transpose()?;
                let tags: Vec<String> = request.query_params("tags").map(String::from).collect();

                let offset = self.engine.append(&namespace, &request.body, alloc_size, &tags);
                let response = AppendResponse {
                    offset: offset.get() as i64,
                };
                Ok((200, Bytes::from(serde_json::to_vec(&response)?)))
            }
            Endpoint::Modify => {
                let offset = parse_offset(required(request, "offset")?)?;
                let pos = required(request, "pos")?;
                let pos = pos
                    .parse::<i64>()
                    .map_err(|_| RochefortError::Protocol(format!("Invalid pos: {}", pos)))?;
                let reset_length = request.query_param("resetLength") == Some("true");

                let success = self.engine.modify(
                    &namespace,
                    offset,
                    Position::from_wire(pos)?,
                    &request.body,
                    reset_length,
                );
                Ok((200, Bytes::from(serde_json::to_vec(&SuccessResponse { success })?)))
            }
            Endpoint::Get => {
                let offset = parse_offset(required(request, "offset")?)?;
                match self.engine.get(&namespace, offset) {
                    Some(data) => Ok((200, data)),
                    None => Ok((404, Bytes::from(format!("no record at offset {}", offset)))),
                }
            }
            Endpoint::GetMulti => {
                let encoding = OffsetEncoding::from_flag(request.query_param(ENCODING_PARAM))?;
                let offsets = decode_offsets(&request.body, encoding)?;

                // Unknown offsets are skipped, not reported
                let mut body = BytesMut::new();
                for offset in offsets {
                    if let Some(data) = self.engine.get(&namespace, offset) {
                        Frame::plain(data).encode_into(&mut body)?;
                    }
                }
                Ok((200, body.freeze()))
            }
            Endpoint::Scan => {
                let records = self.engine.scan(&namespace);
                Ok((200, encode_scan_frames(records)?))
            }
            Endpoint::Query => {
                let query = Query::from_json(&request.body)?;
                let records = self.engine.search(&namespace, &query);
                Ok((200, encode_scan_frames(records)?))
            }
            Endpoint::Stats => {
                let stats = self.engine.stats(&namespace);
                Ok((200, Bytes::from(serde_json::to_vec(&stats)?)))
            }
            Endpoint::Delete => {
                let success = self.engine.delete(&namespace);
                Ok((200, Bytes::from(serde_json::to_vec(&SuccessResponse { success })?)))
            }
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::trace!(endpoint = ?request.endpoint, "loopback request");
        if self.record {
            self.requests.lock().push(request.clone());
        }

        let fault = self.faults.lock().pop_front();
        let response = match fault {
            Some(Fault::Timeout) => {
                return Err(RochefortError::Timeout("loopback deadline exceeded".to_string()))
            }
            Some(Fault::Status(status, body)) => HttpResponse::from_bytes(status, body),
            other => {
                let response = self.handle(&request);
                let status = response.status;
                let body = response.into_bytes()?;
                let (body, time_out_at_end) = match other {
                    Some(Fault::TruncateAfter(n)) => (body.slice(..n.min(body.len())), false),
                    Some(Fault::TimeoutAfter(n)) => (body.slice(..n.min(body.len())), true),
                    _ => (body, false),
                };
                HttpResponse::new(
                    status,
                    ChunkedBody {
                        data: body,
                        position: 0,
                        chunk_size: self.chunk_size,
                        time_out_at_end,
                    },
                )
            }
        };

        Ok(response)
    }
}

fn required<'a>(request: &'a HttpRequest, key: &str) -> Result<&'a str> {
    request
        .query_param(key)
        .ok_or_else(|| RochefortError::Protocol(format!("Missing query parameter: {}", key)))
}

fn encode_scan_frames(records: Vec<(Offset, Bytes)>) -> Result<Bytes> {
    let mut body = BytesMut::new();
    for (offset, data) in records {
        Frame::scan(offset, data).encode_into(&mut body)?;
    }
    Ok(body.freeze())
}

/// Body reader handing out bounded chunks
struct ChunkedBody {
    data: Bytes,
    position: usize,
    chunk_size: usize,
    time_out_at_end: bool,
}

impl Read for ChunkedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.data.len() - self.position;
        if remaining == 0 {
            if self.time_out_at_end {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "loopback read timed out"));
            }
            return Ok(0);
        }

        let n = remaining.min(buf.len()).min(self.chunk_size);
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}
