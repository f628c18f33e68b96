//! Column and table specifications
//!
//! Plain-data column descriptions used by `create_table`. The constructors
//! cover the shapes the engine's schema needs: integer surrogate keys, text
//! primary keys, plain integer/text/blob columns, and self-timestamping
//! columns.

use serde::{Deserialize, Serialize};

/// Column storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Text,
    Blob,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Server-side column defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// Fill with the store's current time at insert.
    CurrentTimestamp,
}

/// One column of a table specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnSpec {
    fn base(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            auto_increment: false,
            unique: false,
            nullable: true,
            default: None,
        }
    }

    /// INTEGER PRIMARY KEY AUTOINCREMENT, a surrogate key.
    pub fn id(name: impl Into<String>) -> Self {
        Self {
            primary_key: true,
            auto_increment: true,
            unique: true,
            nullable: false,
            ..Self::base(name, ColumnType::Integer)
        }
    }

    /// TEXT PRIMARY KEY UNIQUE NOT NULL, a caller-supplied key.
    pub fn text_id(name: impl Into<String>) -> Self {
        Self {
            primary_key: true,
            unique: true,
            nullable: false,
            ..Self::base(name, ColumnType::Text)
        }
    }

    /// Nullable INTEGER column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::base(name, ColumnType::Integer)
    }

    /// Nullable TEXT column.
    pub fn text(name: impl Into<String>) -> Self {
        Self::base(name, ColumnType::Text)
    }

    /// Nullable BLOB column.
    pub fn blob(name: impl Into<String>) -> Self {
        Self::base(name, ColumnType::Blob)
    }

    /// TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP.
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            default: Some(DefaultValue::CurrentTimestamp),
            ..Self::base(name, ColumnType::Text)
        }
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A table specification: name plus ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The integer surrogate-key column, if the table has one.
    pub fn surrogate_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.primary_key && c.auto_increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_column_flags() {
        let col = ColumnSpec::id("chunk_id");
        assert!(col.primary_key);
        assert!(col.auto_increment);
        assert!(col.unique);
        assert!(!col.nullable);
        assert_eq!(col.column_type, ColumnType::Integer);
    }

    #[test]
    fn test_text_id_column_flags() {
        let col = ColumnSpec::text_id("storage_file_id");
        assert!(col.primary_key);
        assert!(!col.auto_increment);
        assert!(col.unique);
        assert!(!col.nullable);
        assert_eq!(col.column_type, ColumnType::Text);
    }

    #[test]
    fn test_timestamp_column_default() {
        let col = ColumnSpec::timestamp("created_at");
        assert_eq!(col.default, Some(DefaultValue::CurrentTimestamp));
        assert!(!col.nullable);
    }

    #[test]
    fn test_surrogate_key_lookup() {
        let spec = TableSpec::new(
            "data_chunks",
            vec![
                ColumnSpec::id("chunk_id"),
                ColumnSpec::integer("header_id").not_null(),
                ColumnSpec::blob("payload").not_null(),
            ],
        );
        assert_eq!(spec.surrogate_key().map(|c| c.name.as_str()), Some("chunk_id"));
        assert!(spec.column("payload").is_some());
        assert!(spec.column("missing").is_none());
    }
}
