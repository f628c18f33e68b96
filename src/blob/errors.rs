//! Blob engine error types
//!
//! A closed taxonomy: every failure the engine can surface carries a stable
//! category, a human-readable message, and the low-level cause where one
//! exists. Ingestion failures are surfaced only after the enclosing
//! transaction has rolled back; export failures roll back nothing but keep
//! "does not exist" and "exists but is corrupted" distinct.

use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Result type for blob engine operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Stable failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Store unreachable
    Connection,
    /// Transactional unit failed (begin/commit/rollback or any write inside it)
    Transaction,
    /// Source or sink read/write failure
    Io,
    /// Checksum mismatch or inconsistent persisted state
    Integrity,
    /// Missing storage file
    NotFound,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Connection => "CONNECTION",
            ErrorCategory::Transaction => "TRANSACTION",
            ErrorCategory::Io => "IO",
            ErrorCategory::Integrity => "INTEGRITY",
            ErrorCategory::NotFound => "NOT_FOUND",
        }
    }
}

/// Blob engine errors
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Storage file not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Checksum mismatch: computed {computed:#010x}, expected {expected:#010x}")]
    ChecksumMismatch { computed: u32, expected: u32 },

    #[error("Storage header {header_id} missing for file {file_id}")]
    MissingHeader { file_id: String, header_id: i64 },

    #[error("Data chunk {chunk_id} missing for header {header_id}")]
    MissingChunk { header_id: i64, chunk_id: i64 },

    #[error("Source length changed during ingestion: read {read} bytes, declared {declared}")]
    LengthMismatch { read: u64, declared: u64 },

    #[error("Malformed {table} row: {reason}")]
    MalformedRow {
        table: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BlobError {
    /// Wraps a source/sink failure with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BlobError::Io {
            context: context.into(),
            source,
        }
    }

    /// Maps the error onto its stable category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BlobError::NotFound(_) => ErrorCategory::NotFound,
            BlobError::Io { .. } => ErrorCategory::Io,
            BlobError::ChecksumMismatch { .. }
            | BlobError::MissingHeader { .. }
            | BlobError::MissingChunk { .. }
            | BlobError::LengthMismatch { .. }
            | BlobError::MalformedRow { .. } => ErrorCategory::Integrity,
            BlobError::Store(StoreError::Connection(_)) => ErrorCategory::Connection,
            // Everything else the store reports aborts the transactional unit
            BlobError::Store(_) => ErrorCategory::Transaction,
        }
    }
}
