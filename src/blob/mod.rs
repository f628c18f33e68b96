//! Chunked blob storage engine
//!
//! Persists arbitrary binary payloads in a relational store by splitting
//! them into an ordered sequence of bounded-size chunks, tracked by a header
//! carrying the declared length and a CRC-32 checksum, and reassembles them
//! losslessly on export.
//!
//! # Design Principles
//!
//! - Integrity over throughput: the source is read twice and two independent
//!   checksum accumulators must agree before anything commits
//! - Explicit failure over silent recovery
//! - One in-flight buffer: memory use is bounded independent of blob size
//!
//! # Invariants Enforced
//!
//! - The chunk payloads of a header sum to the header's declared length
//! - The CRC-32 of the concatenated chunks equals the header's checksum
//! - Storage file ids are globally unique and never reused
//! - No file row is visible without its header and full chunk set
//!
//! # Concurrency
//!
//! One store handle models one connection with at most one open transaction.
//! Overlapping `store`/`export` calls on the same handle are not serialized
//! by the engine; callers that share a handle across threads must serialize
//! transactional work themselves.

mod checksum;
mod config;
mod errors;
mod file_id;
mod model;
mod reader;
mod source;
mod writer;

pub use checksum::{compute_checksum, verify_checksum, Crc32};
pub use config::{BlobConfig, DEFAULT_CHUNK_SIZE};
pub use errors::{BlobError, BlobResult, ErrorCategory};
pub use file_id::StorageFileId;
pub use model::{
    data_chunks_spec, storage_files_spec, storage_headers_spec, DataChunk, StorageFile,
    StorageHeader, DATA_CHUNKS, STORAGE_FILES, STORAGE_HEADERS,
};
pub use reader::{BlobReader, ExportStream};
pub use source::{ByteSource, FileSource, SliceSource};
pub use writer::BlobWriter;

use crate::store::RelationalStore;

/// Blob engine facade: the ingestion and export pipelines over one injected
/// store handle.
pub struct BlobStore<'a, S: RelationalStore> {
    db: &'a S,
    config: BlobConfig,
}

impl<'a, S: RelationalStore> BlobStore<'a, S> {
    /// Engine with the default chunk window size.
    pub fn new(db: &'a S) -> Self {
        Self::with_config(db, BlobConfig::default())
    }

    pub fn with_config(db: &'a S, config: BlobConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    /// Creates the three engine tables if they do not already exist.
    pub fn initialize(&self) -> BlobResult<()> {
        self.db.create_table(&storage_headers_spec())?;
        self.db.create_table(&storage_files_spec())?;
        self.db.create_table(&data_chunks_spec())?;
        Ok(())
    }

    /// Stores one source as a new blob. See [`BlobWriter::store`].
    pub fn store<F>(
        &self,
        source: &mut dyn ByteSource,
        owner_id: i64,
        file_name: &str,
        finalize: F,
    ) -> BlobResult<StorageFileId>
    where
        F: FnOnce(&StorageFileId) -> BlobResult<()>,
    {
        BlobWriter::new(self.db, &self.config).store(source, owner_id, file_name, finalize)
    }

    /// Opens an export stream for a stored blob. See [`BlobReader::export`].
    pub fn export(&self, storage_file_id: &str) -> BlobResult<ExportStream<'a, S>> {
        BlobReader::new(self.db).export(storage_file_id)
    }
}
