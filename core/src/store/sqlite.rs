use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params, params_from_iter};
use serde_json::Value;

use super::{Filter, Row, TableStore, check_identifier, require_filters};
use crate::error::{Error, Result};

/// Rates seeded into a fresh local store, in kcal per minute.
const DEFAULT_RATES: &[(&str, i32)] = &[
    ("Running", 10),
    ("Cycling", 8),
    ("Swimming", 9),
    ("Walking", 4),
    ("Yoga", 3),
];

/// Table store kept in a local SQLite database, with the same tables and
/// columns as the hosted store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS exercise_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                activity_type TEXT NOT NULL,
                duration_min INTEGER NOT NULL CHECK (duration_min > 0),
                calories INTEGER NOT NULL CHECK (calories >= 0),
                time_display TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity_calories (
                activity_type TEXT PRIMARY KEY,
                kcal_per_min INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS nutrition_meals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                date_label TEXT NOT NULL,
                meal_type TEXT NOT NULL,
                UNIQUE (user_id, date_label, meal_type)
            );

            CREATE TABLE IF NOT EXISTS nutrition_foods (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meal_id INTEGER NOT NULL REFERENCES nutrition_meals(id),
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                calories INTEGER NOT NULL CHECK (calories >= 0)
            );

            CREATE INDEX IF NOT EXISTS idx_exercise_logs_user ON exercise_logs(user_id);
            CREATE INDEX IF NOT EXISTS idx_nutrition_foods_meal ON nutrition_foods(meal_id);

            PRAGMA user_version = 1;",
        )?;

        for (activity, rate) in DEFAULT_RATES {
            conn.execute(
                "INSERT OR IGNORE INTO activity_calories (activity_type, kcal_per_min)
                 VALUES (?1, ?2)",
                params![activity, rate],
            )?;
        }
    }

    Ok(())
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || SqlValue::Real(n.as_f64().unwrap_or_default()),
            SqlValue::Integer,
        ),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

/// Build ` WHERE a = ?n AND ...`, appending bound values to `params`.
fn where_clause(filters: &[Filter], params: &mut Vec<SqlValue>) -> Result<String> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(filters.len());
    for f in filters {
        check_identifier(&f.column)?;
        if f.value.is_null() {
            parts.push(format!("{} IS NULL", f.column));
        } else {
            params.push(to_sql(&f.value));
            parts.push(format!("{} = ?{}", f.column, params.len()));
        }
    }
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn split_row(row: &Row, params: &mut Vec<SqlValue>) -> Result<(Vec<String>, Vec<String>)> {
    let mut columns = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    for (column, value) in row {
        check_identifier(column)?;
        params.push(to_sql(value));
        columns.push(column.clone());
        placeholders.push(format!("?{}", params.len()));
    }
    Ok((columns, placeholders))
}

fn query_rows(conn: &Connection, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |r| {
            let mut row = Row::new();
            for (i, name) in columns.iter().enumerate() {
                row.insert(name.clone(), from_sql(r.get_ref(i)?));
            }
            Ok(row)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn single_row(table: &str, rows: Vec<Row>) -> Result<Row> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::MissingRow(table.to_string()))
}

#[async_trait]
impl TableStore for SqliteStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        check_identifier(table)?;
        let mut params = Vec::new();
        let filter = where_clause(filters, &mut params)?;
        let sql = format!("SELECT * FROM {table}{filter} ORDER BY rowid");
        query_rows(&self.conn(), &sql, &params)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        check_identifier(table)?;
        let mut params = Vec::new();
        let sql = if row.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING *")
        } else {
            let (columns, placeholders) = split_row(&row, &mut params)?;
            format!(
                "INSERT INTO {table} ({}) VALUES ({}) RETURNING *",
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        single_row(table, query_rows(&self.conn(), &sql, &params)?)
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>> {
        check_identifier(table)?;
        require_filters("update", table, filters)?;
        if patch.is_empty() {
            return Err(Error::validation(format!("empty update on '{table}'")));
        }
        let mut params = Vec::new();
        let (columns, placeholders) = split_row(&patch, &mut params)?;
        let assignments: Vec<String> = columns
            .iter()
            .zip(&placeholders)
            .map(|(c, p)| format!("{c} = {p}"))
            .collect();
        let filter = where_clause(filters, &mut params)?;
        let sql = format!(
            "UPDATE {table} SET {}{filter} RETURNING *",
            assignments.join(", ")
        );
        query_rows(&self.conn(), &sql, &params)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        check_identifier(table)?;
        require_filters("delete", table, filters)?;
        let mut params = Vec::new();
        let filter = where_clause(filters, &mut params)?;
        let sql = format!("DELETE FROM {table}{filter} RETURNING *");
        query_rows(&self.conn(), &sql, &params)
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &[&str]) -> Result<Row> {
        check_identifier(table)?;
        if row.is_empty() || on_conflict.is_empty() {
            return Err(Error::validation(format!(
                "upsert on '{table}' needs columns and a conflict target"
            )));
        }
        for column in on_conflict {
            check_identifier(column)?;
        }
        let mut params = Vec::new();
        let (columns, placeholders) = split_row(&row, &mut params)?;
        let merge: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})
             ON CONFLICT ({}) DO UPDATE SET {}
             RETURNING *",
            columns.join(", "),
            placeholders.join(", "),
            on_conflict.join(", "),
            merge.join(", ")
        );
        single_row(table, query_rows(&self.conn(), &sql, &params)?)
    }
}
