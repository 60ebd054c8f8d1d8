//! Store doubles for repository and controller tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Filter, Row, SqliteStore, TableStore};
use crate::error::{Error, Result};

/// In-memory SQLite store that counts calls and can be switched offline.
pub(crate) struct FlakyStore {
    inner: SqliteStore,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self, table: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Status {
                table: table.to_string(),
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for FlakyStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        self.check(table)?;
        self.inner.select(table, filters).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.check(table)?;
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>> {
        self.check(table)?;
        self.inner.update(table, patch, filters).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        self.check(table)?;
        self.inner.delete(table, filters).await
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &[&str]) -> Result<Row> {
        self.check(table)?;
        self.inner.upsert(table, row, on_conflict).await
    }
}
