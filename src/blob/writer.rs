//! Ingestion pipeline
//!
//! Streams a source into header + chunk rows atomically, verifying integrity
//! before commit. The source is read twice on purpose: once to pre-compute
//! the whole-file checksum, once to chunk and re-verify with an independent
//! accumulator. The two values must agree before anything is committed.
//!
//! # Invariants Enforced
//!
//! - Chunk rows are inserted strictly in read order, one in flight at a time
//! - No header, file, or chunk row from a failed attempt remains visible
//! - The finalize hook runs only on the success path, before commit

use super::checksum::Crc32;
use super::config::BlobConfig;
use super::errors::{BlobError, BlobResult};
use super::file_id::StorageFileId;
use super::model::{DataChunk, StorageFile, StorageHeader, DATA_CHUNKS, STORAGE_FILES, STORAGE_HEADERS};
use super::source::ByteSource;
use crate::observability::Logger;
use crate::store::{RelationalStore, TransactionCoordinator};

/// One-shot ingestion pipeline over an injected store handle.
pub struct BlobWriter<'a, S: RelationalStore> {
    db: &'a S,
    config: &'a BlobConfig,
}

impl<'a, S: RelationalStore> BlobWriter<'a, S> {
    pub fn new(db: &'a S, config: &'a BlobConfig) -> Self {
        Self { db, config }
    }

    /// Stores one source as a new blob and returns its storage file id.
    ///
    /// `finalize` is invoked with the new id after the chunk-pass checksum
    /// has been verified and before the transaction commits; it may perform
    /// bookkeeping in the same transaction (its writes commit or roll back
    /// with everything else). It is guaranteed not to run on any failure
    /// path.
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
        // A zero window size would never make progress
        let window_len = self.config.chunk_size.max(1);

        let declared_size = source
            .size()
            .map_err(|e| BlobError::io("Failed to probe source length", e))?;

        // Pass one: whole-file checksum
        let mut pre_pass = Crc32::new();
        while let Some(window) = source
            .next_window(window_len)
            .map_err(|e| BlobError::io("Failed to read source during checksum pre-pass", e))?
        {
            pre_pass.digest(&window);
        }
        let expected_crc = pre_pass.value();

        source
            .rewind()
            .map_err(|e| BlobError::io("Failed to rewind source for chunking pass", e))?;

        let file_id = StorageFileId::generate();

        // Pass two: header, file, and chunk rows as one atomic unit
        let txn = TransactionCoordinator::new(self.db);
        let (total_bytes, total_chunks) = txn.run(|| {
            let header_id = self
                .db
                .insert(STORAGE_HEADERS, &StorageHeader::insert_row(expected_crc, declared_size))?;
            self.db.insert(
                STORAGE_FILES,
                &StorageFile::insert_row(&file_id, header_id, file_name, owner_id),
            )?;

            let mut chunk_pass = Crc32::new();
            let mut total_bytes = 0u64;
            let mut total_chunks = 0u64;
            while let Some(window) = source
                .next_window(window_len)
                .map_err(|e| BlobError::io("Failed to read source window", e))?
            {
                chunk_pass.digest(&window);
                total_bytes += window.len() as u64;
                total_chunks += 1;
                // One in-flight chunk: the next window is only read after
                // this insert is acknowledged
                self.db
                    .insert(DATA_CHUNKS, &DataChunk::insert_row(header_id, window))?;
            }

            if total_bytes != declared_size {
                return Err(BlobError::LengthMismatch {
                    read: total_bytes,
                    declared: declared_size,
                });
            }
            let written_crc = chunk_pass.value();
            if written_crc != expected_crc {
                return Err(BlobError::ChecksumMismatch {
                    computed: written_crc,
                    expected: expected_crc,
                });
            }

            finalize(&file_id)?;
            Ok((total_bytes, total_chunks))
        })?;

        Logger::info(
            "BLOB_STORE_COMPLETE",
            &[
                ("storage_file_id", file_id.as_str()),
                ("file_name", file_name),
                ("owner_id", &owner_id.to_string()),
                ("file_size", &total_bytes.to_string()),
                ("total_chunks", &total_chunks.to_string()),
                ("crc", &format!("{:08x}", expected_crc)),
            ],
        );
        Ok(file_id)
    }
}
