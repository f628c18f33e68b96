//! Blob engine atomicity and corruption tests
//!
//! Ingestion is all-or-nothing: any failure inside the transactional unit
//! rolls back every row of the attempt. Export never rolls anything back,
//! but "does not exist" and "exists but corrupted" stay distinct, and the
//! corruption error is raised only after the corrupt bytes have already
//! been streamed.

use std::cell::Cell;
use std::io;

use blobdb::blob::{BlobConfig, BlobError, BlobStore, ByteSource, ErrorCategory, SliceSource};
use blobdb::store::{ColumnSpec, MemoryStore, RelationalStore, Row, TableSpec};

// =============================================================================
// Test Utilities
// =============================================================================

/// Source that reads cleanly on the checksum pre-pass, then fails partway
/// through the chunking pass.
struct FailingSource {
    data: Vec<u8>,
    position: usize,
    rewound: bool,
    fail_after: usize,
}

impl FailingSource {
    fn new(data: Vec<u8>, fail_after: usize) -> Self {
        Self {
            data,
            position: 0,
            rewound: false,
            fail_after,
        }
    }
}

impl ByteSource for FailingSource {
    fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn next_window(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        if self.rewound && self.position >= self.fail_after {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device disappeared",
            ));
        }
        if self.position >= self.data.len() {
            return Ok(None);
        }
        let end = self.data.len().min(self.position + max_len);
        let window = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(Some(window))
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.rewound = true;
        self.position = 0;
        Ok(())
    }
}

/// Source whose second pass yields fewer bytes than the probed length.
struct ShrinkingSource {
    data: Vec<u8>,
    position: usize,
    rewound: bool,
}

impl ShrinkingSource {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            rewound: false,
        }
    }
}

impl ByteSource for ShrinkingSource {
    fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn next_window(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let limit = if self.rewound {
            self.data.len() / 2
        } else {
            self.data.len()
        };
        if self.position >= limit {
            return Ok(None);
        }
        let end = limit.min(self.position + max_len);
        let window = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(Some(window))
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.rewound = true;
        self.position = 0;
        Ok(())
    }
}

fn small_chunk_engine(db: &MemoryStore) -> BlobStore<'_, MemoryStore> {
    let blobs = BlobStore::with_config(db, BlobConfig::with_chunk_size(4));
    blobs.initialize().unwrap();
    blobs
}

fn row_counts(db: &MemoryStore) -> (usize, usize, usize) {
    let headers = db
        .get_ordered("storage_headers", &Row::new(), "header_id")
        .unwrap()
        .len();
    let files = db
        .get_ordered("storage_files", &Row::new(), "storage_file_id")
        .unwrap()
        .len();
    let chunks = db
        .get_ordered("data_chunks", &Row::new(), "chunk_id")
        .unwrap()
        .len();
    (headers, files, chunks)
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// =============================================================================
// Ingestion Atomicity
// =============================================================================

#[test]
fn test_failed_source_read_leaves_no_rows() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    // Fails on the third window of the chunking pass, after two chunk inserts
    let mut source = FailingSource::new(patterned(16), 8);
    let result = blobs.store(&mut source, 1, "doomed.bin", |_| Ok(()));

    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Io);
    assert_eq!(
        row_counts(&db),
        (0, 0, 0),
        "no row from the failed attempt may remain visible"
    );
}

#[test]
fn test_finalize_hook_not_invoked_on_failure() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let invoked = Cell::new(false);
    let mut source = FailingSource::new(patterned(16), 8);
    let result = blobs.store(&mut source, 1, "doomed.bin", |_| {
        invoked.set(true);
        Ok(())
    });

    assert!(result.is_err());
    assert!(
        !invoked.get(),
        "finalize hook must never run on a failure path"
    );
}

#[test]
fn test_finalize_hook_runs_inside_transaction() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);
    db.create_table(&TableSpec::new(
        "user_files",
        vec![
            ColumnSpec::text_id("storage_file_id"),
            ColumnSpec::integer("user_id").not_null(),
        ],
    ))
    .unwrap();

    let mut source = SliceSource::new(patterned(10));
    let id = blobs
        .store(&mut source, 42, "owned.bin", |file_id| {
            // The file row must already be visible to the hook
            let visible = db.get_single(
                "storage_files",
                &Row::new().with("storage_file_id", file_id.as_str()),
            )?;
            assert!(visible.is_some(), "hook runs before commit, inside the txn");

            // Ownership registration commits atomically with the blob
            db.insert(
                "user_files",
                &Row::new()
                    .with("storage_file_id", file_id.as_str())
                    .with("user_id", 42i64),
            )?;
            Ok(())
        })
        .unwrap();

    let ownership = db
        .get_single(
            "user_files",
            &Row::new().with("storage_file_id", id.as_str()),
        )
        .unwrap();
    assert!(ownership.is_some());
}

#[test]
fn test_finalize_hook_failure_rolls_back_everything() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let mut source = SliceSource::new(patterned(10));
    let result = blobs.store(&mut source, 1, "refused.bin", |_| {
        Err(BlobError::io(
            "Finalize hook failed",
            io::Error::new(io::ErrorKind::Other, "bookkeeping refused"),
        ))
    });

    assert!(result.is_err());
    assert_eq!(row_counts(&db), (0, 0, 0));
}

#[test]
fn test_length_drift_between_passes_is_integrity_error() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let mut source = ShrinkingSource::new(patterned(16));
    let err = blobs
        .store(&mut source, 1, "shrunk.bin", |_| Ok(()))
        .unwrap_err();

    assert!(matches!(err, BlobError::LengthMismatch { read: 8, declared: 16 }));
    assert_eq!(err.category(), ErrorCategory::Integrity);
    assert_eq!(row_counts(&db), (0, 0, 0));
}

#[test]
fn test_store_usable_after_failed_ingestion() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let mut failing = FailingSource::new(patterned(16), 8);
    assert!(blobs.store(&mut failing, 1, "bad.bin", |_| Ok(())).is_err());

    // The transaction must have been released
    let mut source = SliceSource::new(patterned(16));
    let id = blobs.store(&mut source, 1, "good.bin", |_| Ok(())).unwrap();

    let mut out = Vec::new();
    blobs
        .export(id.as_str())
        .unwrap()
        .write_to(&mut out)
        .unwrap();
    assert_eq!(out, patterned(16));
}

// =============================================================================
// Corruption Detection on Export
// =============================================================================

#[test]
fn test_corrupted_chunk_fails_export_with_integrity_error() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let mut source = SliceSource::new(patterned(12));
    let id = blobs.store(&mut source, 1, "hit.bin", |_| Ok(())).unwrap();

    // Flip the middle chunk's payload behind the engine's back
    let chunk_ids = db
        .get_ordered_keys("data_chunks", &Row::new(), "chunk_id")
        .unwrap();
    assert_eq!(chunk_ids.len(), 3);
    let changed = db
        .update(
            "data_chunks",
            &Row::new().with("chunk_id", chunk_ids[1]),
            &Row::new().with("payload", vec![0xFFu8; 4]),
        )
        .unwrap();
    assert_eq!(changed, 1);

    let mut out = Vec::new();
    let err = blobs
        .export(id.as_str())
        .unwrap()
        .write_to(&mut out)
        .unwrap_err();
    assert!(matches!(err, BlobError::ChecksumMismatch { .. }));
    assert_eq!(err.category(), ErrorCategory::Integrity);
}

#[test]
fn test_corrupt_bytes_stream_before_the_error() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let payload = patterned(12);
    let mut source = SliceSource::new(payload.clone());
    let id = blobs.store(&mut source, 1, "leak.bin", |_| Ok(())).unwrap();

    let chunk_ids = db
        .get_ordered_keys("data_chunks", &Row::new(), "chunk_id")
        .unwrap();
    db.update(
        "data_chunks",
        &Row::new().with("chunk_id", chunk_ids[1]),
        &Row::new().with("payload", vec![0xFFu8; 4]),
    )
    .unwrap();

    // Verification fires only after the whole output has been yielded: the
    // consumer sees all three windows, corrupt one included, then the error
    let items: Vec<_> = blobs.export(id.as_str()).unwrap().collect();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].as_ref().unwrap().as_slice(), &payload[0..4]);
    assert_eq!(items[1].as_ref().unwrap().as_slice(), &[0xFFu8; 4][..]);
    assert_eq!(items[2].as_ref().unwrap().as_slice(), &payload[8..12]);
    assert!(matches!(
        items[3],
        Err(BlobError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_chunk_vanishing_mid_export_is_integrity_error() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let mut source = SliceSource::new(patterned(12));
    let id = blobs.store(&mut source, 1, "race.bin", |_| Ok(())).unwrap();

    let chunk_ids = db
        .get_ordered_keys("data_chunks", &Row::new(), "chunk_id")
        .unwrap();

    // Open the stream first, then pull a chunk out from under it
    let mut stream = blobs.export(id.as_str()).unwrap();
    db.delete("data_chunks", &Row::new().with("chunk_id", chunk_ids[1]))
        .unwrap();

    let mut out = Vec::new();
    let err = stream.write_to(&mut out).unwrap_err();
    assert!(matches!(err, BlobError::MissingChunk { .. }));
    assert_eq!(err.category(), ErrorCategory::Integrity);
}

// =============================================================================
// NotFound vs Integrity
// =============================================================================

#[test]
fn test_export_unknown_id_is_not_found() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let err = blobs
        .export("00000000000000000000000000000000")
        .unwrap_err();
    assert!(matches!(err, BlobError::NotFound(_)));
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[test]
fn test_orphaned_file_row_is_integrity_not_notfound() {
    let db = MemoryStore::new();
    let blobs = small_chunk_engine(&db);

    let mut source = SliceSource::new(patterned(8));
    let id = blobs.store(&mut source, 1, "orphan.bin", |_| Ok(())).unwrap();

    let file_row = db
        .get_single(
            "storage_files",
            &Row::new().with("storage_file_id", id.as_str()),
        )
        .unwrap()
        .unwrap();
    let header_id = file_row.get("header_id").unwrap().as_integer().unwrap();
    db.delete("storage_headers", &Row::new().with("header_id", header_id))
        .unwrap();

    let err = blobs.export(id.as_str()).unwrap_err();
    assert!(matches!(err, BlobError::MissingHeader { .. }));
    assert_eq!(
        err.category(),
        ErrorCategory::Integrity,
        "an orphaned file row must stay distinguishable from NotFound"
    );
}
