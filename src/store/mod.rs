//! Relational store adapter for blobdb
//!
//! The engine does not talk to a concrete database. It depends on the small
//! transactional CRUD contract below, injected into the pipelines as an
//! explicit handle, so the engine can be tested against an in-memory store
//! and deployed against anything that can honor the contract.
//!
//! # Connection model
//!
//! One handle models one connection, and one connection carries at most one
//! open transaction. `begin_transaction` while a transaction is active is an
//! error; there are no nested transactions. Individual primitives are safe to
//! call from multiple threads, but interleaving transactional work from
//! concurrent callers on a single connection is not serialized here; that is
//! the caller's responsibility.

mod column;
mod errors;
mod memory;
mod txn;
mod value;

pub use column::{ColumnSpec, ColumnType, DefaultValue, TableSpec};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use txn::TransactionCoordinator;
pub use value::{Row, Value};

/// Minimal transactional CRUD contract the engine depends on.
///
/// Filters are equality matches: a filter row matches a stored row when every
/// listed column compares equal. Scans return rows ordered ascending by the
/// named column.
pub trait RelationalStore {
    /// Creates a table if it does not already exist.
    fn create_table(&self, spec: &TableSpec) -> StoreResult<()>;

    /// Opens a transaction. Fails if one is already active.
    fn begin_transaction(&self) -> StoreResult<()>;

    /// Commits the active transaction.
    fn commit(&self) -> StoreResult<()>;

    /// Rolls back the active transaction, discarding every write made inside
    /// it.
    fn rollback(&self) -> StoreResult<()>;

    /// Inserts a row and returns its surrogate key (the assigned
    /// autoincrement key, or a monotonically increasing rowid for tables
    /// without an integer surrogate key).
    fn insert(&self, table: &str, row: &Row) -> StoreResult<i64>;

    /// Returns all rows matching `filter`, ordered ascending by `order_by`.
    fn get_ordered(&self, table: &str, filter: &Row, order_by: &str) -> StoreResult<Vec<Row>>;

    /// Returns the values of `key_column` for all rows matching `filter`,
    /// ordered ascending. The column must hold integers.
    fn get_ordered_keys(&self, table: &str, filter: &Row, key_column: &str)
        -> StoreResult<Vec<i64>>;

    /// Point lookup by the table's integer surrogate key.
    fn get_by_key(&self, table: &str, key: i64) -> StoreResult<Option<Row>>;

    /// Returns the first row matching `filter`, if any.
    fn get_single(&self, table: &str, filter: &Row) -> StoreResult<Option<Row>>;

    /// Sets the given columns on every row matching `filter`. Returns the
    /// number of rows changed.
    fn update(&self, table: &str, filter: &Row, values: &Row) -> StoreResult<usize>;

    /// Deletes every row matching `filter`. Returns the number of rows
    /// removed.
    fn delete(&self, table: &str, filter: &Row) -> StoreResult<usize>;
}
