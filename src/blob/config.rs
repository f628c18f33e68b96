//! Blob engine configuration

use serde::{Deserialize, Serialize};

/// Default chunk window size in bytes.
///
/// A writer convention, not a schema constraint: stored chunks are at most
/// this long, and only the final chunk of a blob may be shorter.
pub const DEFAULT_CHUNK_SIZE: usize = 250_000;

/// Blob engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Chunk window size in bytes (default: 250,000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

impl BlobConfig {
    /// Create a config with the given chunk window size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}
