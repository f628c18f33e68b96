//! Relational store error types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Relational store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Transaction already active")]
    TransactionActive,

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("No such table: {0}")]
    NoSuchTable(String),

    #[error("No such column: {table}.{column}")]
    NoSuchColumn { table: String, column: String },

    #[error("NOT NULL constraint failed: {table}.{column}")]
    NotNullViolation { table: String, column: String },

    #[error("UNIQUE constraint failed: {table}.{column}")]
    UniqueViolation { table: String, column: String },

    #[error("Type mismatch for {table}.{column}: expected {expected}, got {actual}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
}
