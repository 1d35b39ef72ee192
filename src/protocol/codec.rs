//! Offset list codec
//!
//! Encoding and decoding of getMulti request bodies.
//!
//! ## Wire Format
//!
//! ### Binary (canonical)
//! ```text
//! ┌──────────────┬──────────────┬─────┬──────────────┐
//! │ Offset 1 (8) │ Offset 2 (8) │ ... │ Offset N (8) │
//! └──────────────┴──────────────┴─────┴──────────────┘
//! ```
//! Unsigned little-endian, input order, no separators.
//!
//! ### CSV
//! ```text
//! 0,4096,8192
//! ```
//! Selected on the server by the `encoding=csv` query flag.

use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, RochefortError};
use super::Offset;

/// Width of one binary-encoded offset
pub const OFFSET_SIZE: usize = 8;

/// Query parameter carrying the encoding flag
pub const ENCODING_PARAM: &str = "encoding";

/// Wire format of a getMulti offset list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffsetEncoding {
    /// 8 bytes per offset, little-endian
    #[default]
    Binary,

    /// Comma-joined decimal strings
    Csv,
}

impl OffsetEncoding {
    /// Value of the `encoding` query flag, `None` for the canonical format
    pub fn flag(self) -> Option<&'static str> {
        match self {
            OffsetEncoding::Binary => None,
            OffsetEncoding::Csv => Some("csv"),
        }
    }

    /// Select the encoding from an optional `encoding` flag value
    pub fn from_flag(flag: Option<&str>) -> Result<Self> {
        match flag {
            None | Some("") | Some("binary") => Ok(OffsetEncoding::Binary),
            Some("csv") => Ok(OffsetEncoding::Csv),
            Some(other) => Err(RochefortError::Protocol(format!(
                "Unknown offset encoding: {}",
                other
            ))),
        }
    }
}

/// Encode an offset list into a request body
pub fn encode_offsets(offsets: &[Offset], encoding: OffsetEncoding) -> Bytes {
    match encoding {
        OffsetEncoding::Binary => {
            let mut body = BytesMut::with_capacity(offsets.len() * OFFSET_SIZE);
            for offset in offsets {
                body.put_slice(&offset.to_le_bytes());
            }
            body.freeze()
        }
        OffsetEncoding::Csv => {
            let mut body = String::with_capacity(offsets.len() * 8);
            for (i, offset) in offsets.iter().enumerate() {
                if i > 0 {
                    body.push(',');
                }
                // Writing to a String cannot fail
                let _ = write!(body, "{}", offset);
            }
            Bytes::from(body)
        }
    }
}

/// Decode a request body back into an offset list
pub fn decode_offsets(body: &[u8], encoding: OffsetEncoding) -> Result<Vec<Offset>> {
    match encoding {
        OffsetEncoding::Binary => decode_binary(body),
        OffsetEncoding::Csv => decode_csv(body),
    }
}

fn decode_binary(body: &[u8]) -> Result<Vec<Offset>> {
    if body.len() % OFFSET_SIZE != 0 {
        return Err(RochefortError::Protocol(format!(
            "Offset list of {} bytes is not a multiple of {}",
            body.len(),
            OFFSET_SIZE
        )));
    }

    let offsets = body
        .chunks_exact(OFFSET_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; OFFSET_SIZE];
            raw.copy_from_slice(chunk);
            Offset::from_le_bytes(raw)
        })
        .collect();

    Ok(offsets)
}

fn decode_csv(body: &[u8]) -> Result<Vec<Offset>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| RochefortError::Protocol(format!("Offset list is not UTF-8: {}", e)))?;
    let text = text.trim();

    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(',').map(parse_offset).collect()
}

/// Parse one decimal offset; negative values are `InvalidOffset`
pub fn parse_offset(raw: &str) -> Result<Offset> {
    let raw = raw.trim();

    if let Ok(value) = raw.parse::<u64>() {
        return Ok(Offset(value));
    }

    match raw.parse::<i64>() {
        Ok(value) => Offset::try_from(value),
        Err(_) => Err(RochefortError::Protocol(format!(
            "Invalid offset literal: {:?}",
            raw
        ))),
    }
}
