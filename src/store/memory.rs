//! In-process table service
//!
//! Assigns an integer `id` and a fixed-width RFC 3339 `created_at`/`timestamp` to every
//! inserted row that lacks them, mirroring the defaults of the hosted tables.
//! Useful for tests and for running the gateway without a backend.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{
    error::{Result, StoreError},
    query::{Filter, Row, SelectQuery},
    validate_identifier, TableService,
};

/// Table service that keeps every table in memory
#[derive(Default)]
pub struct MemoryTableService {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    next_id: AtomicU64,
    failing: Mutex<Vec<String>>,
}

impl MemoryTableService {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call touching `table` fail with a database error
    pub fn fail_table(&self, table: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(table.into());
        }
    }

    /// Undo `fail_table`
    pub fn restore_table(&self, table: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.retain(|t| t != table);
        }
    }

    /// Snapshot of every row currently stored in `table`
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        let failing = self
            .failing
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if failing.iter().any(|t| t == table) {
            return Err(StoreError::Database(format!(
                "relation \"{}\" is unavailable",
                table
            )));
        }
        Ok(())
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Row>>) -> T) -> Result<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(f(&mut tables))
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

/// Ascending order with missing/null values first, numbers before strings
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering::*;
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Equal,
        (None | Some(Value::Null), _) => Less,
        (_, None | Some(Value::Null)) => Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl TableService for MemoryTableService {
    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<Row>> {
        self.check(table)?;
        let mut rows = self.with_tables(|tables| {
            tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| matches_all(row, &query.filters))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;

        if let Some(column) = &query.order_by {
            // Stable sort keeps insertion order among equal keys
            rows.sort_by(|a, b| compare_cells(a.get(column), b.get(column)));
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut record: Row) -> Result<Row> {
        self.check(table)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));

        record.entry("id").or_insert_with(|| Value::from(id));
        record.entry("created_at").or_insert_with(|| now.clone());
        if table == "chat_history" {
            record.entry("timestamp").or_insert(now);
        }

        self.with_tables(|tables| {
            tables
                .entry(table.to_string())
                .or_default()
                .push(record.clone());
        })?;
        Ok(record)
    }

    async fn update(&self, table: &str, filters: Vec<Filter>, changes: Row) -> Result<Vec<Row>> {
        self.check(table)?;
        self.with_tables(|tables| {
            let mut updated = Vec::new();
            if let Some(rows) = tables.get_mut(table) {
                for row in rows.iter_mut().filter(|row| matches_all(row, &filters)) {
                    for (column, value) in &changes {
                        row.insert(column.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
            }
            updated
        })
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<()> {
        self.check(table)?;
        self.with_tables(|tables| {
            if let Some(rows) = tables.get_mut(table) {
                rows.retain(|row| !matches_all(row, &filters));
            }
        })
    }
}
