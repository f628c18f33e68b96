//! Storage file identifiers
//!
//! A storage file identifier names one logical stored blob: 128 bits from a
//! cryptographically strong random source, rendered as 32 uppercase hex
//! characters. Identifiers are globally unique and never reused.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Globally unique identifier of one stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageFileId(String);

impl StorageFileId {
    /// Generates a fresh identifier from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        Self(hex)
    }

    /// Wraps an identifier previously produced by [`generate`](Self::generate)
    /// and read back from the store.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
