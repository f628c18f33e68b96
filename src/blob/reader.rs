//! Export pipeline
//!
//! Streams chunk rows back into a byte sequence, verifying integrity against
//! the header. Verification happens only after the entire output has been
//! yielded: a consumer may observe corrupted bytes before the corruption
//! error is raised. That ordering is part of the contract and is pinned by
//! tests. When the final checksum matches, the output is byte-for-byte
//! identical to what was ingested.

use std::io::Write;

use super::checksum::Crc32;
use super::errors::{BlobError, BlobResult};
use super::file_id::StorageFileId;
use super::model::{DataChunk, StorageFile, StorageHeader, DATA_CHUNKS, STORAGE_FILES, STORAGE_HEADERS};
use crate::observability::Logger;
use crate::store::{RelationalStore, Row};

/// Export pipeline over an injected store handle.
pub struct BlobReader<'a, S: RelationalStore> {
    db: &'a S,
}

impl<'a, S: RelationalStore> BlobReader<'a, S> {
    pub fn new(db: &'a S) -> Self {
        Self { db }
    }

    /// Opens an export stream for the given storage file id.
    ///
    /// A missing file row is `NotFound`. A file row whose header is gone is
    /// an integrity error: ingestion atomicity means it should never happen,
    /// but it must stay distinguishable from "does not exist".
    pub fn export(&self, storage_file_id: &str) -> BlobResult<ExportStream<'a, S>> {
        let file_row = self
            .db
            .get_single(
                STORAGE_FILES,
                &Row::new().with("storage_file_id", storage_file_id),
            )?
            .ok_or_else(|| BlobError::NotFound(storage_file_id.to_string()))?;
        let file = StorageFile::from_row(&file_row)?;

        let header_row = self.db.get_by_key(STORAGE_HEADERS, file.header_id)?;
        let Some(header_row) = header_row else {
            Logger::warn(
                "BLOB_ORPHANED_FILE_ROW",
                &[
                    ("storage_file_id", storage_file_id),
                    ("header_id", &file.header_id.to_string()),
                ],
            );
            return Err(BlobError::MissingHeader {
                file_id: storage_file_id.to_string(),
                header_id: file.header_id,
            });
        };
        let header = StorageHeader::from_row(&header_row)?;

        let chunk_ids = self.db.get_ordered_keys(
            DATA_CHUNKS,
            &Row::new().with("header_id", file.header_id),
            "chunk_id",
        )?;

        Ok(ExportStream {
            db: self.db,
            file,
            header,
            chunk_ids: chunk_ids.into_iter(),
            checksum: Crc32::new(),
            bytes_out: 0,
            chunks_out: 0,
            finished: false,
        })
    }
}

/// Pull-based stream of chunk payloads in ascending chunk order.
///
/// One payload is in flight at a time. After the final chunk the accumulated
/// checksum is compared to the header's; a mismatch is surfaced as the
/// stream's last item, after every byte has already been yielded.
pub struct ExportStream<'a, S: RelationalStore> {
    db: &'a S,
    file: StorageFile,
    header: StorageHeader,
    chunk_ids: std::vec::IntoIter<i64>,
    checksum: Crc32,
    bytes_out: u64,
    chunks_out: u64,
    finished: bool,
}

impl<'a, S: RelationalStore> std::fmt::Debug for ExportStream<'a, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportStream")
            .field("file", &self.file)
            .field("header", &self.header)
            .field("bytes_out", &self.bytes_out)
            .field("chunks_out", &self.chunks_out)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<'a, S: RelationalStore> ExportStream<'a, S> {
    /// Byte length declared by the header.
    pub fn declared_len(&self) -> u64 {
        self.header.file_size
    }

    /// Original file name, if one was recorded.
    pub fn file_name(&self) -> Option<&str> {
        self.file.file_name.as_deref()
    }

    pub fn storage_file_id(&self) -> &StorageFileId {
        &self.file.storage_file_id
    }

    fn next_chunk(&mut self) -> BlobResult<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        match self.chunk_ids.next() {
            Some(chunk_id) => {
                let row = self
                    .db
                    .get_by_key(DATA_CHUNKS, chunk_id)?
                    .ok_or(BlobError::MissingChunk {
                        header_id: self.header.header_id,
                        chunk_id,
                    })?;
                let chunk = DataChunk::from_row(&row)?;
                self.checksum.digest(&chunk.payload);
                self.bytes_out += chunk.payload.len() as u64;
                self.chunks_out += 1;
                Ok(Some(chunk.payload))
            }
            None => {
                self.finished = true;
                let computed = self.checksum.value();
                if computed != self.header.crc {
                    return Err(BlobError::ChecksumMismatch {
                        computed,
                        expected: self.header.crc,
                    });
                }
                Logger::info(
                    "BLOB_EXPORT_COMPLETE",
                    &[
                        ("storage_file_id", self.file.storage_file_id.as_str()),
                        ("file_size", &self.header.file_size.to_string()),
                        ("total_bytes", &self.bytes_out.to_string()),
                        ("total_chunks", &self.chunks_out.to_string()),
                        ("crc", &format!("{:08x}", computed)),
                    ],
                );
                Ok(None)
            }
        }
    }

    /// Drains the stream into `sink`.
    ///
    /// Returns the number of bytes written. On a trailing integrity error the
    /// already-written bytes remain in the sink.
    pub fn write_to<W: Write>(&mut self, sink: &mut W) -> BlobResult<u64> {
        let mut written = 0u64;
        loop {
            match self.next_chunk()? {
                Some(payload) => {
                    sink.write_all(&payload)
                        .map_err(|e| BlobError::io("Failed to write export output", e))?;
                    written += payload.len() as u64;
                }
                None => return Ok(written),
            }
        }
    }
}

impl<'a, S: RelationalStore> Iterator for ExportStream<'a, S> {
    type Item = BlobResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => None,
            Err(error) => {
                // Stop producing output after any failure
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}
