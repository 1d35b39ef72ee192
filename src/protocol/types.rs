//! Core value types
//!
//! Namespaces and offsets as they appear on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RochefortError};

/// Opaque handle identifying a record's byte position in a namespace log
///
/// Always unsigned on the wire. Signed inputs (JSON responses, CLI arguments)
/// go through `TryFrom<i64>` so a negative value is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(pub u64);

impl Offset {
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Offset(u64::from_le_bytes(bytes))
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset(value)
    }
}

impl TryFrom<i64> for Offset {
    type Error = RochefortError;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value)
            .map(Offset)
            .map_err(|_| RochefortError::InvalidOffset(value))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical partition of the append log
///
/// The empty string selects the server's default namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Namespace(name.into())
    }

    /// The default namespace
    pub fn default_namespace() -> Self {
        Namespace(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Namespace(name.to_string())
    }
}

impl From<String> for Namespace {
    fn from(name: String) -> Self {
        Namespace(name)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}
