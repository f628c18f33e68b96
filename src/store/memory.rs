//! In-memory relational store
//!
//! A single-connection implementation of [`RelationalStore`] backed by plain
//! vectors. Transactions keep an undo journal: every write inside an open
//! transaction records how to reverse itself, `rollback` replays the journal
//! backwards, `commit` discards it. Enforces autoincrement keys, NOT NULL,
//! UNIQUE, and timestamp defaults.
//!
//! Table creation is not journaled; the engine creates its tables once, at
//! connection setup, outside any transaction.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::column::{ColumnSpec, ColumnType, DefaultValue, TableSpec};
use super::errors::{StoreError, StoreResult};
use super::value::{Row, Value};
use super::RelationalStore;
use crate::observability::Logger;

struct Table {
    spec: TableSpec,
    rows: Vec<Row>,
    next_key: i64,
}

impl Table {
    fn new(spec: TableSpec) -> Self {
        Self {
            spec,
            rows: Vec::new(),
            next_key: 1,
        }
    }
}

/// How to reverse one write, replayed backwards on rollback.
enum UndoOp {
    /// A row was appended; undoing pops it and restores the key counter.
    Insert {
        table: String,
        previous_next_key: i64,
    },
    /// A row was changed in place.
    Update {
        table: String,
        index: usize,
        previous: Row,
    },
    /// A row was removed from the given position.
    Delete {
        table: String,
        index: usize,
        row: Row,
    },
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Table>,
    journal: Option<Vec<UndoOp>>,
}

/// In-memory store modeling one database connection.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Connection("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Connection("store lock poisoned".to_string()))
    }
}

fn check_type(table: &str, column: &ColumnSpec, value: &Value) -> StoreResult<()> {
    let matches = matches!(
        (column.column_type, value),
        (ColumnType::Integer, Value::Integer(_))
            | (ColumnType::Text, Value::Text(_))
            | (ColumnType::Blob, Value::Blob(_))
    );
    if matches {
        Ok(())
    } else {
        Err(StoreError::TypeMismatch {
            table: table.to_string(),
            column: column.name.clone(),
            expected: column.column_type.as_str(),
            actual: value.type_name(),
        })
    }
}

fn check_columns_exist(table: &Table, row: &Row) -> StoreResult<()> {
    for (name, _) in row.iter() {
        if table.spec.column(name).is_none() {
            return Err(StoreError::NoSuchColumn {
                table: table.spec.name.clone(),
                column: name.clone(),
            });
        }
    }
    Ok(())
}

fn row_matches(row: &Row, filter: &Row) -> bool {
    filter.iter().all(|(name, value)| row.get(name) == Some(value))
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Integer(_) => 1,
        Value::Text(_) => 2,
        Value::Blob(_) => 3,
    }
}

fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Blob(x), Value::Blob(y)) => x.cmp(y),
        _ => value_rank(a).cmp(&value_rank(b)),
    }
}

impl RelationalStore for MemoryStore {
    fn create_table(&self, spec: &TableSpec) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.tables.contains_key(&spec.name) {
            Logger::trace("TABLE_EXISTS", &[("table", &spec.name)]);
            return Ok(());
        }
        Logger::info("TABLE_CREATED", &[("table", &spec.name)]);
        inner
            .tables
            .insert(spec.name.clone(), Table::new(spec.clone()));
        Ok(())
    }

    fn begin_transaction(&self) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.journal.is_some() {
            return Err(StoreError::TransactionActive);
        }
        Logger::trace("TXN_BEGIN", &[]);
        inner.journal = Some(Vec::new());
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.journal.take().is_none() {
            return Err(StoreError::NoActiveTransaction);
        }
        Logger::trace("TXN_COMMIT", &[]);
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut guard = self.write()?;
        let inner = &mut *guard;
        let journal = inner
            .journal
            .take()
            .ok_or(StoreError::NoActiveTransaction)?;
        Logger::trace("TXN_ROLLBACK", &[("ops", &journal.len().to_string())]);
        for op in journal.into_iter().rev() {
            match op {
                UndoOp::Insert {
                    table,
                    previous_next_key,
                } => {
                    if let Some(table) = inner.tables.get_mut(&table) {
                        table.rows.pop();
                        table.next_key = previous_next_key;
                    }
                }
                UndoOp::Update {
                    table,
                    index,
                    previous,
                } => {
                    if let Some(table) = inner.tables.get_mut(&table) {
                        if let Some(slot) = table.rows.get_mut(index) {
                            *slot = previous;
                        }
                    }
                }
                UndoOp::Delete { table, index, row } => {
                    if let Some(table) = inner.tables.get_mut(&table) {
                        let index = index.min(table.rows.len());
                        table.rows.insert(index, row);
                    }
                }
            }
        }
        Ok(())
    }

    fn insert(&self, table: &str, row: &Row) -> StoreResult<i64> {
        let mut guard = self.write()?;
        let inner = &mut *guard;
        let table_entry = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        check_columns_exist(table_entry, row)?;

        let table_name = table_entry.spec.name.clone();
        let assigned_key = table_entry.next_key;

        // Materialize the stored row in spec order, filling keys and defaults
        let mut stored = Row::new();
        for column in &table_entry.spec.columns {
            let value = match row.get(&column.name) {
                Some(value) if !value.is_null() => {
                    check_type(&table_name, column, value)?;
                    value.clone()
                }
                _ => {
                    if column.primary_key && column.auto_increment {
                        Value::Integer(assigned_key)
                    } else if column.default == Some(DefaultValue::CurrentTimestamp) {
                        Value::Text(Utc::now().to_rfc3339())
                    } else if column.nullable {
                        Value::Null
                    } else {
                        return Err(StoreError::NotNullViolation {
                            table: table_name,
                            column: column.name.clone(),
                        });
                    }
                }
            };
            stored.set(column.name.clone(), value);
        }

        for column in &table_entry.spec.columns {
            if !(column.unique || column.primary_key) {
                continue;
            }
            let Some(value) = stored.get(&column.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            // Freshly assigned autoincrement keys are unique by construction
            if column.auto_increment && *value == Value::Integer(assigned_key) {
                continue;
            }
            if table_entry
                .rows
                .iter()
                .any(|existing| existing.get(&column.name) == Some(value))
            {
                return Err(StoreError::UniqueViolation {
                    table: table_name,
                    column: column.name.clone(),
                });
            }
        }

        let previous_next_key = table_entry.next_key;
        let surrogate = table_entry.spec.surrogate_key().map(|c| c.name.clone());
        let returned_key = match surrogate
            .and_then(|name| stored.get(&name).and_then(Value::as_integer))
        {
            Some(key) => {
                table_entry.next_key = table_entry.next_key.max(key + 1);
                key
            }
            None => {
                // Tables without an integer surrogate key still hand back a
                // monotonically increasing rowid
                table_entry.next_key += 1;
                assigned_key
            }
        };

        table_entry.rows.push(stored);
        if let Some(journal) = inner.journal.as_mut() {
            journal.push(UndoOp::Insert {
                table: table.to_string(),
                previous_next_key,
            });
        }
        Ok(returned_key)
    }

    fn get_ordered(&self, table: &str, filter: &Row, order_by: &str) -> StoreResult<Vec<Row>> {
        let inner = self.read()?;
        let table = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        check_columns_exist(table, filter)?;
        if table.spec.column(order_by).is_none() {
            return Err(StoreError::NoSuchColumn {
                table: table.spec.name.clone(),
                column: order_by.to_string(),
            });
        }

        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|row| row_matches(row, filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            value_cmp(
                a.get(order_by).unwrap_or(&Value::Null),
                b.get(order_by).unwrap_or(&Value::Null),
            )
        });
        Ok(rows)
    }

    fn get_ordered_keys(
        &self,
        table: &str,
        filter: &Row,
        key_column: &str,
    ) -> StoreResult<Vec<i64>> {
        let rows = self.get_ordered(table, filter, key_column)?;
        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let value = row.get(key_column).unwrap_or(&Value::Null);
            match value.as_integer() {
                Some(key) => keys.push(key),
                None => {
                    return Err(StoreError::TypeMismatch {
                        table: table.to_string(),
                        column: key_column.to_string(),
                        expected: "INTEGER",
                        actual: value.type_name(),
                    })
                }
            }
        }
        Ok(keys)
    }

    fn get_by_key(&self, table: &str, key: i64) -> StoreResult<Option<Row>> {
        let inner = self.read()?;
        let table = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        let surrogate = table
            .spec
            .surrogate_key()
            .ok_or_else(|| StoreError::NoSuchColumn {
                table: table.spec.name.clone(),
                column: "(surrogate key)".to_string(),
            })?;
        let wanted = Value::Integer(key);
        Ok(table
            .rows
            .iter()
            .find(|row| row.get(&surrogate.name) == Some(&wanted))
            .cloned())
    }

    fn get_single(&self, table: &str, filter: &Row) -> StoreResult<Option<Row>> {
        let inner = self.read()?;
        let table = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        check_columns_exist(table, filter)?;
        Ok(table
            .rows
            .iter()
            .find(|row| row_matches(row, filter))
            .cloned())
    }

    fn update(&self, table: &str, filter: &Row, values: &Row) -> StoreResult<usize> {
        let mut guard = self.write()?;
        let inner = &mut *guard;
        let table_entry = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        check_columns_exist(table_entry, filter)?;
        check_columns_exist(table_entry, values)?;

        let table_name = table_entry.spec.name.clone();
        for (name, value) in values.iter() {
            let Some(column) = table_entry.spec.column(name) else {
                continue; // presence verified above
            };
            if value.is_null() {
                if !column.nullable {
                    return Err(StoreError::NotNullViolation {
                        table: table_name,
                        column: column.name.clone(),
                    });
                }
            } else {
                check_type(&table_name, column, value)?;
                if column.unique || column.primary_key {
                    let collides = table_entry
                        .rows
                        .iter()
                        .any(|row| !row_matches(row, filter) && row.get(name) == Some(value));
                    let matched = table_entry
                        .rows
                        .iter()
                        .filter(|row| row_matches(row, filter))
                        .count();
                    if collides || matched > 1 {
                        return Err(StoreError::UniqueViolation {
                            table: table_name,
                            column: column.name.clone(),
                        });
                    }
                }
            }
        }

        let mut changed = 0;
        for (index, row) in table_entry.rows.iter_mut().enumerate() {
            if !row_matches(row, filter) {
                continue;
            }
            if let Some(journal) = inner.journal.as_mut() {
                journal.push(UndoOp::Update {
                    table: table.to_string(),
                    index,
                    previous: row.clone(),
                });
            }
            for (name, value) in values.iter() {
                row.set(name.clone(), value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    fn delete(&self, table: &str, filter: &Row) -> StoreResult<usize> {
        let mut guard = self.write()?;
        let inner = &mut *guard;
        let table_entry = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))?;
        check_columns_exist(table_entry, filter)?;

        let mut removed = 0;
        let mut index = 0;
        while index < table_entry.rows.len() {
            if row_matches(&table_entry.rows[index], filter) {
                let row = table_entry.rows.remove(index);
                if let Some(journal) = inner.journal.as_mut() {
                    journal.push(UndoOp::Delete {
                        table: table.to_string(),
                        index,
                        row,
                    });
                }
                removed += 1;
            } else {
                index += 1;
            }
        }
        Ok(removed)
    }
}
