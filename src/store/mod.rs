//! Data store boundary: the persistence collaborator behind every repository.

mod postgres;
pub use postgres::{ensure_database_exists, PgDataStore};

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One row as column -> JSON value.
pub type Record = Map<String, Value>;

/// Table addressed by a repository.
#[derive(Clone, Debug)]
pub struct TableRef {
    /// Table name, optionally `schema.table`.
    pub name: String,
    pub primary_key: String,
    /// When set, rows with this column non-NULL are treated as deleted.
    pub deleted_at_column: Option<String>,
}

/// Exact-match filters compare the column's text form with the given string.
#[derive(Clone, Debug, Default)]
pub struct SelectQuery {
    pub filters: Vec<(String, String)>,
    /// Columns to return; empty returns all.
    pub columns: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Existence probe behind uniqueness rules and delete guards: does `table.column = value` exist?
#[derive(Clone, Debug, PartialEq)]
pub struct ExistenceQuery {
    pub table: String,
    pub column: String,
    pub value: Value,
    /// (id column, id) excluded from the match.
    pub exclude: Option<(String, i64)>,
    /// Only rows with this column NULL count.
    pub live_only_column: Option<String>,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch one live row by primary key.
    async fn find(&self, table: &TableRef, id: i64) -> Result<Option<Record>, AppError>;

    /// List live rows ordered by primary key.
    async fn select(&self, table: &TableRef, query: &SelectQuery) -> Result<Vec<Record>, AppError>;

    /// Count live rows matching `filters`.
    async fn count(&self, table: &TableRef, filters: &[(String, String)]) -> Result<u64, AppError>;

    async fn insert(&self, table: &TableRef, values: &Record) -> Result<Record, AppError>;

    async fn update(&self, table: &TableRef, id: i64, values: &Record) -> Result<Option<Record>, AppError>;

    /// Physically remove a row. Returns false when nothing matched.
    async fn delete(&self, table: &TableRef, id: i64) -> Result<bool, AppError>;

    /// Set the soft-delete column. Returns false when no live row matched.
    async fn mark_deleted(&self, table: &TableRef, id: i64, at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn exists(&self, query: &ExistenceQuery) -> Result<bool, AppError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Text form used for filter and existence comparisons.
pub fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
