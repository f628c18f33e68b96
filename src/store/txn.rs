//! Transaction coordinator
//!
//! Wraps the store's begin/commit/rollback primitives so that a multi-row
//! unit of work is committed atomically or not at all. On any failure inside
//! the unit the transaction is rolled back and the failure is surfaced
//! unchanged; a rollback failure is logged but never masks the original
//! error.

use super::errors::StoreError;
use super::RelationalStore;
use crate::observability::Logger;

/// Serializes one begin/work/commit-or-rollback sequence.
///
/// One transaction per connection; a nested `run` fails when the store
/// refuses the inner `begin_transaction`.
pub struct TransactionCoordinator<'a, S: RelationalStore + ?Sized> {
    db: &'a S,
}

impl<'a, S: RelationalStore + ?Sized> TransactionCoordinator<'a, S> {
    pub fn new(db: &'a S) -> Self {
        Self { db }
    }

    /// Runs `body` inside a transaction.
    ///
    /// Commits when `body` returns `Ok`; rolls back on `Err` (and on a
    /// failed commit) so that zero rows from the unit remain visible.
    pub fn run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.db.begin_transaction().map_err(E::from)?;
        match body() {
            Ok(value) => match self.db.commit() {
                Ok(()) => Ok(value),
                Err(commit_error) => {
                    self.rollback_after_failure();
                    Err(E::from(commit_error))
                }
            },
            Err(error) => {
                self.rollback_after_failure();
                Err(error)
            }
        }
    }

    fn rollback_after_failure(&self) {
        if let Err(rollback_error) = self.db.rollback() {
            Logger::error(
                "TXN_ROLLBACK_FAILED",
                &[("error", &rollback_error.to_string())],
            );
        }
    }
}
