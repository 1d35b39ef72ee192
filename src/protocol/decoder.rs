//! Stream decoder
//!
//! Incremental parser turning a response body into frames.
//!
//! Bytes may arrive in chunks of any size. State persists between calls:
//! - `AwaitingHeader`: need `layout.header_size()` bytes
//! - `AwaitingPayload`: header parsed, need `length` payload bytes
//!
//! The same bytes produce the same frames no matter how they are chunked.

use std::io::{ErrorKind, Read};
use std::iter::FusedIterator;

use bytes::{Buf, BytesMut};

use crate::config::{DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_READ_CHUNK_SIZE};
use crate::error::{Result, RochefortError};
use super::{Frame, HeaderLayout, Offset};

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    AwaitingPayload { length: u32, offset: Option<Offset> },
}

/// Incremental frame decoder for one response stream
///
/// Not shareable between producers: feed it from a single consumer.
#[derive(Debug)]
pub struct StreamDecoder {
    layout: HeaderLayout,
    buffer: BytesMut,
    state: State,
    max_payload_size: u32,
}

impl StreamDecoder {
    pub fn new(layout: HeaderLayout) -> Self {
        Self::with_max_payload(layout, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Decoder for getMulti bodies (4-byte headers)
    pub fn plain() -> Self {
        Self::new(HeaderLayout::Plain)
    }

    /// Decoder for scan and search bodies (12-byte headers)
    pub fn scan() -> Self {
        Self::new(HeaderLayout::Scan)
    }

    /// Create a decoder rejecting payloads larger than `max_payload_size`
    pub fn with_max_payload(layout: HeaderLayout, max_payload_size: u32) -> Self {
        Self {
            layout,
            buffer: BytesMut::new(),
            state: State::AwaitingHeader,
            max_payload_size,
        }
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Buffer a chunk without extracting frames
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Buffer a chunk and extract every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.extend(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Extract the next complete frame, or `None` if more bytes are needed
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::AwaitingHeader => {
                    let header_size = self.layout.header_size();
                    if self.buffer.len() < header_size {
                        return Ok(None);
                    }

                    let (length, offset) = self.layout.parse_header(&self.buffer[..header_size])?;
                    if length > self.max_payload_size {
                        return Err(RochefortError::Protocol(format!(
                            "Payload size {} exceeds maximum {}",
                            length, self.max_payload_size
                        )));
                    }

                    self.buffer.advance(header_size);
                    self.state = State::AwaitingPayload { length, offset };
                }
                State::AwaitingPayload { length, offset } => {
                    if self.buffer.len() < length as usize {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(length as usize).freeze();
                    self.state = State::AwaitingHeader;

                    tracing::trace!(length, offset = ?offset, "decoded frame");
                    return Ok(Some(Frame {
                        length,
                        offset,
                        payload,
                    }));
                }
            }
        }
    }

    /// Signal end of stream
    ///
    /// Succeeds only on a frame boundary with nothing left over.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::AwaitingHeader if self.buffer.is_empty() => Ok(()),
            _ => {
                tracing::warn!(
                    buffered = self.buffer.len(),
                    needed = self.needed(),
                    "stream ended mid-frame"
                );
                Err(RochefortError::TruncatedStream {
                    buffered: self.buffer.len(),
                    needed: self.needed(),
                })
            }
        }
    }

    /// Bytes the current state is waiting for (header or payload)
    pub fn needed(&self) -> usize {
        match self.state {
            State::AwaitingHeader => self.layout.header_size(),
            State::AwaitingPayload { length, .. } => length as usize,
        }
    }

    /// Number of buffered, not yet consumed bytes
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True between frames with an empty buffer
    pub fn is_idle(&self) -> bool {
        self.state == State::AwaitingHeader && self.buffer.is_empty()
    }

    /// Drop buffered bytes and return to `AwaitingHeader`
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingHeader;
    }
}

/// Lazy frame iterator over a byte source
///
/// Reads the source in chunks, yields each frame as soon as it is complete,
/// and checks for truncation at end of input. After the first error the
/// iterator is exhausted; frames yielded before it stay valid.
pub struct FrameReader<R> {
    source: R,
    decoder: StreamDecoder,
    chunk: Vec<u8>,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R, decoder: StreamDecoder) -> Self {
        Self::with_chunk_size(source, decoder, DEFAULT_READ_CHUNK_SIZE)
    }

    pub fn with_chunk_size(source: R, decoder: StreamDecoder, chunk_size: usize) -> Self {
        Self {
            source,
            decoder,
            chunk: vec![0u8; chunk_size.max(1)],
            done: false,
        }
    }

    /// Layout of the frames being decoded
    pub fn layout(&self) -> HeaderLayout {
        self.decoder.layout()
    }

    fn fail(&mut self, err: RochefortError) -> Option<Result<Frame>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            match self.decoder.next_frame() {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => {}
                Err(e) => return self.fail(e),
            }

            match self.source.read(&mut self.chunk) {
                Ok(0) => {
                    self.done = true;
                    return self.decoder.finish().err().map(Err);
                }
                Ok(n) => self.decoder.extend(&self.chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return self.fail(RochefortError::from_body_io(e)),
            }
        }
    }
}

impl<R: Read> FusedIterator for FrameReader<R> {}
