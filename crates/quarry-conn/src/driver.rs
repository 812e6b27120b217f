//! The driver seam between compiled statements and a database client.
//!
//! A [`Driver`] is the minimal surface a client library must expose:
//! prepared reads, prepared writes, raw statements, and transaction
//! control. Everything above it, retries, logging, savepoint nesting,
//! and pagination, lives in [`Connection`](crate::Connection) and
//! stays driver-agnostic.

use quarry_core::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Failure reported by a driver.
///
/// `code` carries the five-character SQLSTATE when the client exposes
/// one; classification falls back to message matching otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    /// Message text as the client library produced it.
    pub message: String,
    /// SQLSTATE code, when known.
    pub code: Option<String>,
}

impl DriverError {
    /// An error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// An error carrying a message and an SQLSTATE code.
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows the statement changed.
    pub rows_affected: u64,
    /// Auto-increment id assigned to the last inserted row, when the
    /// driver reports one.
    pub last_insert_id: Option<i64>,
}

/// One result row: named columns in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Builds a row from `(column, value)` pairs.
    #[must_use]
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// The value under `name`, when the row carries the column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// All columns in select-list order.
    #[must_use]
    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

/// Database client behind a [`Connection`](crate::Connection).
///
/// Implementations take bindings already prepared by the connection,
/// so every value is in driver-ready form.
pub trait Driver {
    /// Runs a prepared read and returns its rows.
    ///
    /// # Errors
    ///
    /// Whatever the client library reports.
    fn query(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Runs a prepared write and reports what it changed.
    ///
    /// # Errors
    ///
    /// Whatever the client library reports.
    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<ExecResult, DriverError>;

    /// Runs a raw statement with no bindings.
    ///
    /// # Errors
    ///
    /// Whatever the client library reports.
    fn exec_raw(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Whatever the client library reports.
    fn begin(&mut self) -> Result<(), DriverError>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Whatever the client library reports.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Whatever the client library reports.
    fn rollback(&mut self) -> Result<(), DriverError>;
}

/// Fresh handles produced by a [`Reconnector`].
pub struct DriverHandles {
    /// Handle statements write through.
    pub write: Box<dyn Driver>,
    /// Optional replica handle serving reads.
    pub read: Option<Box<dyn Driver>>,
}

/// Re-establishes driver handles after a lost connection.
pub type Reconnector = Box<dyn FnMut() -> Result<DriverHandles, DriverError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = Row::new(vec![
            (String::from("id"), Value::Int(7)),
            (String::from("name"), Value::Text(String::from("ada"))),
        ]);
        assert_eq!(row.get("id"), Some(&Value::Int(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
        assert!(!row.is_empty());
    }

    #[test]
    fn test_row_serializes_as_object_in_column_order() {
        let row = Row::new(vec![
            (String::from("id"), Value::Int(1)),
            (String::from("active"), Value::Bool(true)),
            (String::from("note"), Value::Null),
        ]);
        let json = serde_json::to_string(&row).expect("serializes");
        assert_eq!(json, "{\"id\":1,\"active\":true,\"note\":null}");
    }

    #[test]
    fn test_driver_error_display() {
        let plain = DriverError::new("Duplicate entry '1' for key 'PRIMARY'");
        assert_eq!(plain.to_string(), "Duplicate entry '1' for key 'PRIMARY'");
        let coded = DriverError::with_code("deadlock detected", "40001");
        assert_eq!(coded.code.as_deref(), Some("40001"));
    }
}
