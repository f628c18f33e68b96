//! CRC-32 checksum engine
//!
//! Incremental accumulator over byte buffers, CRC-32 (IEEE polynomial).
//! Folding buffers `b1, b2, …, bn` sequentially equals folding the single
//! concatenation `b1‖b2‖…‖bn`; the ingestion and export pipelines rely on
//! this to verify a whole-file checksum against a chunk-wise re-checksum.

use std::fmt;

use crc32fast::Hasher;

/// Running CRC-32 accumulator.
///
/// A fresh accumulator holds the zero value; digesting nothing leaves it
/// there. Independent instances never share state.
#[derive(Clone)]
pub struct Crc32 {
    hasher: Hasher,
}

impl Crc32 {
    /// Creates a zero-valued accumulator.
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Folds one buffer into the running value.
    pub fn digest(&mut self, buffer: &[u8]) {
        self.hasher.update(buffer);
    }

    /// Returns the current checksum without consuming the accumulator.
    pub fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crc32").field("value", &self.value()).finish()
    }
}

/// Computes a CRC-32 checksum over the provided data in one call.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.digest(data);
    crc.value()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
