//! Record store interface and the user existence check.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::report::ErrorReporter;

/// A user or account record as returned by the store.
pub type Record = Map<String, Value>;

/// Persistence service holding user records, keyed by id.
///
/// Table names are passed through unchanged; the store decides what they
/// mean. Implementations own their own locking and transactions.
pub trait RecordStore {
    /// Looks up a record by its numeric id.
    fn find_by_id(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError>;

    /// Looks up a record by its `email` field.
    fn find_by_email(&self, table: &str, email: &str) -> Result<Option<Record>, StoreError>;

    /// Sets one field on the record with the given id.
    ///
    /// Returns `StoreError::QueryFailed` if no such record exists.
    fn update_field(
        &self,
        table: &str,
        id: i64,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;
}

/// Result of an existence lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// The store returned the record
    Confirmed,
    /// The store answered and has no such record
    Absent,
    /// The store could not answer
    Unknown,
}

/// Checks whether a subject still has a record.
///
/// Store failures yield `Existence::Unknown` and are handed to `reporter`;
/// they never propagate.
pub fn check_existence(
    store: &dyn RecordStore,
    subject_id: i64,
    table: &str,
    reporter: &dyn ErrorReporter,
) -> Existence {
    match store.find_by_id(table, subject_id) {
        Ok(Some(_)) => Existence::Confirmed,
        Ok(None) => Existence::Absent,
        Err(e) => {
            tracing::warn!(subject_id, table, error = %e, "existence check could not reach store");
            reporter.report(&e);
            Existence::Unknown
        }
    }
}

/// Returns `true` only if the store confirms the subject exists.
///
/// `false` covers both "absent" and "could not confirm"; use
/// [`check_existence`] to tell them apart.
pub fn exists(
    store: &dyn RecordStore,
    subject_id: i64,
    table: &str,
    reporter: &dyn ErrorReporter,
) -> bool {
    check_existence(store, subject_id, table, reporter) == Existence::Confirmed
}

/// In-memory record store.
///
/// Records live in per-table maps keyed by id. A failure mode can be switched
/// on to exercise error handling. Not thread-safe: one store per request or
/// test.
///
/// # Examples
///
/// ```
/// use request_guard::{MemoryStore, RecordStore};
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// store.insert("users", 1, json!({"email": "a@example.com"}));
///
/// let record = store.find_by_email("users", "a@example.com").unwrap();
/// assert_eq!(record.unwrap()["id"], 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, BTreeMap<i64, Record>>>,
    failure: Cell<Option<Failure>>,
}

/// Failure mode for [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Every call fails with `StoreError::Unreachable`
    Unreachable,
    /// Reads succeed, writes fail with `StoreError::QueryFailed`
    WritesFail,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record. `value` must be a JSON object; the `id`
    /// field is set to `id`.
    pub fn insert(&self, table: &str, id: i64, value: Value) {
        let mut record = match value {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        record.insert("id".to_string(), Value::from(id));

        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .insert(id, record);
    }

    /// Returns a copy of a stored field, bypassing the failure mode.
    pub fn field(&self, table: &str, id: i64, field: &str) -> Option<Value> {
        self.tables
            .borrow()
            .get(table)
            .and_then(|t| t.get(&id))
            .and_then(|r| r.get(field))
            .cloned()
    }

    /// Switches the failure mode on or off.
    pub fn set_failure(&self, failure: Option<Failure>) {
        self.failure.set(failure);
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        match self.failure.get() {
            Some(Failure::Unreachable) => {
                Err(StoreError::Unreachable("memory store offline".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl RecordStore for MemoryStore {
    fn find_by_id(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError> {
        self.check_reachable()?;
        Ok(self.tables.borrow().get(table).and_then(|t| t.get(&id)).cloned())
    }

    fn find_by_email(&self, table: &str, email: &str) -> Result<Option<Record>, StoreError> {
        self.check_reachable()?;
        Ok(self.tables.borrow().get(table).and_then(|t| {
            t.values()
                .find(|r| r.get("email").and_then(Value::as_str) == Some(email))
                .cloned()
        }))
    }

    fn update_field(
        &self,
        table: &str,
        id: i64,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.check_reachable()?;
        if self.failure.get() == Some(Failure::WritesFail) {
            return Err(StoreError::QueryFailed(format!("update of {}.{} rejected", table, field)));
        }

        let mut tables = self.tables.borrow_mut();
        let record = tables
            .get_mut(table)
            .and_then(|t| t.get_mut(&id))
            .ok_or_else(|| StoreError::QueryFailed(format!("no record {} in {}", id, table)))?;
        record.insert(field.to_string(), value);
        Ok(())
    }
}
