//! Table store abstraction.
//!
//! A table store is a set of named tables addressed by equality filters.
//! `PostgrestStore` talks to a hosted PostgREST endpoint; `SqliteStore`
//! keeps the same tables in a local SQLite file.

mod postgrest;
mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

pub use postgrest::{HOSTED_MIGRATION, PostgrestConfig, PostgrestStore};
pub use sqlite::SqliteStore;

/// A row as exchanged with the store: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Equality predicate on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Rows matching every filter. An empty filter list selects the table.
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>>;

    /// Insert one row and return it as stored, with store-assigned columns.
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Apply `patch` to every matching row and return the rows after update.
    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>>;

    /// Delete every matching row and return the deleted rows.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>>;

    /// Insert `row`, or merge it into the existing row that collides on
    /// `on_conflict`. Returns the stored row either way.
    async fn upsert(&self, table: &str, row: Row, on_conflict: &[&str]) -> Result<Row>;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::validation(format!(
            "expected a JSON object for a row, got {other}"
        ))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

/// Updates and deletes must name at least one column.
pub(crate) fn require_filters(op: &str, table: &str, filters: &[Filter]) -> Result<()> {
    if filters.is_empty() {
        return Err(Error::validation(format!(
            "refusing unfiltered {op} on '{table}'"
        )));
    }
    Ok(())
}

/// Only plain identifiers reach SQL text or URL paths.
pub(crate) fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid identifier '{name}'")))
    }
}
