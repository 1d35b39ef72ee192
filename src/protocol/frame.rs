//! Frame definitions
//!
//! A frame is one length-prefixed record in a getMulti, scan or search
//! response body.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, RochefortError};
use super::Offset;

/// Plain header: len (4)
pub const PLAIN_HEADER_SIZE: usize = 4;

/// Scan header: len (4) + offset (8)
pub const SCAN_HEADER_SIZE: usize = 12;

/// Shape of the per-frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// `[len: u32 LE]`, used by getMulti
    Plain,

    /// `[len: i32 LE][offset: i64 LE]`, used by scan and search
    Scan,
}

impl HeaderLayout {
    /// Number of header bytes preceding each payload
    pub fn header_size(self) -> usize {
        match self {
            HeaderLayout::Plain => PLAIN_HEADER_SIZE,
            HeaderLayout::Scan => SCAN_HEADER_SIZE,
        }
    }

    /// Parse a complete header into payload length and optional offset.
    ///
    /// `header` must hold at least `header_size()` bytes.
    pub fn parse_header(self, mut header: &[u8]) -> Result<(u32, Option<Offset>)> {
        if header.len() < self.header_size() {
            return Err(RochefortError::Protocol(format!(
                "Incomplete frame header: expected {} bytes, got {}",
                self.header_size(),
                header.len()
            )));
        }

        match self {
            HeaderLayout::Plain => Ok((header.get_u32_le(), None)),
            HeaderLayout::Scan => {
                let length = header.get_i32_le();
                let offset = header.get_i64_le();

                let length = u32::try_from(length).map_err(|_| {
                    RochefortError::Protocol(format!("Negative frame length: {}", length))
                })?;
                Ok((length, Some(Offset::try_from(offset)?)))
            }
        }
    }
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload length as announced by the header
    pub length: u32,

    /// Record offset (scan layout only)
    pub offset: Option<Offset>,

    /// Exactly `length` bytes
    pub payload: Bytes,
}

impl Frame {
    /// Create a getMulti-style frame
    pub fn plain(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            length: payload.len() as u32,
            offset: None,
            payload,
        }
    }

    /// Create a scan-style frame
    pub fn scan(offset: Offset, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            length: payload.len() as u32,
            offset: Some(offset),
            payload,
        }
    }

    /// Layout implied by the presence of an offset
    pub fn layout(&self) -> HeaderLayout {
        if self.offset.is_some() {
            HeaderLayout::Scan
        } else {
            HeaderLayout::Plain
        }
    }

    /// Serialize header + payload onto `out`
    pub fn encode_into(&self, out: &mut BytesMut) -> Result<()> {
        if self.payload.len() != self.length as usize {
            return Err(RochefortError::Protocol(format!(
                "Frame length {} does not match payload of {} bytes",
                self.length,
                self.payload.len()
            )));
        }

        out.reserve(self.layout().header_size() + self.payload.len());
        match self.offset {
            None => out.put_u32_le(self.length),
            Some(offset) => {
                let length = i32::try_from(self.length).map_err(|_| {
                    RochefortError::Protocol(format!(
                        "Frame length {} does not fit a scan header",
                        self.length
                    ))
                })?;
                let offset = i64::try_from(offset.get()).map_err(|_| {
                    RochefortError::Protocol(format!(
                        "Offset {} does not fit a scan header",
                        offset
                    ))
                })?;
                out.put_i32_le(length);
                out.put_i64_le(offset);
            }
        }
        out.put_slice(&self.payload);

        Ok(())
    }

    /// Serialize to a fresh buffer
    pub fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.encode_into(&mut out)?;
        Ok(out.freeze())
    }
}
