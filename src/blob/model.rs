//! Persisted data model
//!
//! Three tables track one stored blob:
//!
//! - `storage_headers`: declared identity (byte length and CRC-32). Created
//!   once at the start of ingestion, immutable thereafter.
//! - `storage_files`: the externally visible name (random storage file id,
//!   owner, original file name, creation time). References exactly one
//!   header; the header is never shared across files.
//! - `data_chunks`: the payload, split into bounded windows. Chunk order is
//!   ascending `chunk_id`, which equals original stream order.
//!
//! A `storage_files` row is never visible without its header and full chunk
//! set; ingestion writes all three inside one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{BlobError, BlobResult};
use super::file_id::StorageFileId;
use crate::store::{ColumnSpec, Row, TableSpec, Value};

pub const STORAGE_HEADERS: &str = "storage_headers";
pub const STORAGE_FILES: &str = "storage_files";
pub const DATA_CHUNKS: &str = "data_chunks";

pub fn storage_headers_spec() -> TableSpec {
    TableSpec::new(
        STORAGE_HEADERS,
        vec![
            ColumnSpec::id("header_id"),
            ColumnSpec::integer("crc").not_null(),
            ColumnSpec::integer("file_size").not_null(),
        ],
    )
}

pub fn storage_files_spec() -> TableSpec {
    TableSpec::new(
        STORAGE_FILES,
        vec![
            ColumnSpec::text_id("storage_file_id"),
            ColumnSpec::integer("header_id").not_null(),
            ColumnSpec::text("file_name"),
            ColumnSpec::integer("owner_id").not_null(),
            ColumnSpec::timestamp("created_at"),
        ],
    )
}

pub fn data_chunks_spec() -> TableSpec {
    TableSpec::new(
        DATA_CHUNKS,
        vec![
            ColumnSpec::id("chunk_id"),
            ColumnSpec::integer("header_id").not_null(),
            ColumnSpec::blob("payload").not_null(),
        ],
    )
}

fn missing(table: &'static str, column: &str, expected: &str) -> BlobError {
    BlobError::MalformedRow {
        table,
        reason: format!("missing or non-{} column `{}`", expected, column),
    }
}

fn require_integer(row: &Row, table: &'static str, column: &str) -> BlobResult<i64> {
    row.get(column)
        .and_then(Value::as_integer)
        .ok_or_else(|| missing(table, column, "INTEGER"))
}

fn require_text<'r>(row: &'r Row, table: &'static str, column: &str) -> BlobResult<&'r str> {
    row.get(column)
        .and_then(Value::as_text)
        .ok_or_else(|| missing(table, column, "TEXT"))
}

/// Declared identity of one stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageHeader {
    pub header_id: i64,
    pub crc: u32,
    pub file_size: u64,
}

impl StorageHeader {
    /// Insert payload for a new header (the key is store-assigned).
    pub fn insert_row(crc: u32, file_size: u64) -> Row {
        Row::new()
            .with("crc", crc)
            .with("file_size", file_size as i64)
    }

    pub fn from_row(row: &Row) -> BlobResult<Self> {
        let header_id = require_integer(row, STORAGE_HEADERS, "header_id")?;
        let crc = require_integer(row, STORAGE_HEADERS, "crc")?;
        let crc = u32::try_from(crc).map_err(|_| BlobError::MalformedRow {
            table: STORAGE_HEADERS,
            reason: format!("crc {} out of range", crc),
        })?;
        let file_size = require_integer(row, STORAGE_HEADERS, "file_size")?;
        let file_size = u64::try_from(file_size).map_err(|_| BlobError::MalformedRow {
            table: STORAGE_HEADERS,
            reason: format!("negative file_size {}", file_size),
        })?;
        Ok(Self {
            header_id,
            crc,
            file_size,
        })
    }
}

/// Externally visible record of one stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFile {
    pub storage_file_id: StorageFileId,
    pub header_id: i64,
    pub file_name: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl StorageFile {
    /// Insert payload for a new file row (`created_at` is store-assigned).
    pub fn insert_row(
        storage_file_id: &StorageFileId,
        header_id: i64,
        file_name: &str,
        owner_id: i64,
    ) -> Row {
        Row::new()
            .with("storage_file_id", storage_file_id.as_str())
            .with("header_id", header_id)
            .with("file_name", file_name)
            .with("owner_id", owner_id)
    }

    pub fn from_row(row: &Row) -> BlobResult<Self> {
        let storage_file_id =
            StorageFileId::new(require_text(row, STORAGE_FILES, "storage_file_id")?);
        let header_id = require_integer(row, STORAGE_FILES, "header_id")?;
        let file_name = match row.get("file_name") {
            Some(Value::Text(name)) => Some(name.clone()),
            _ => None,
        };
        let owner_id = require_integer(row, STORAGE_FILES, "owner_id")?;
        let created_at = require_text(row, STORAGE_FILES, "created_at")?;
        let created_at = DateTime::parse_from_rfc3339(created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| BlobError::MalformedRow {
                table: STORAGE_FILES,
                reason: format!("unparseable created_at: {}", e),
            })?;
        Ok(Self {
            storage_file_id,
            header_id,
            file_name,
            owner_id,
            created_at,
        })
    }
}

/// One bounded, ordered fragment of a blob's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChunk {
    pub chunk_id: i64,
    pub header_id: i64,
    pub payload: Vec<u8>,
}

impl DataChunk {
    /// Insert payload for a new chunk row (the key is store-assigned).
    pub fn insert_row(header_id: i64, payload: Vec<u8>) -> Row {
        Row::new()
            .with("header_id", header_id)
            .with("payload", payload)
    }

    pub fn from_row(row: &Row) -> BlobResult<Self> {
        let chunk_id = require_integer(row, DATA_CHUNKS, "chunk_id")?;
        let header_id = require_integer(row, DATA_CHUNKS, "header_id")?;
        let payload = row
            .get("payload")
            .and_then(Value::as_blob)
            .ok_or_else(|| missing(DATA_CHUNKS, "payload", "BLOB"))?
            .to_vec();
        Ok(Self {
            chunk_id,
            header_id,
            payload,
        })
    }
}
