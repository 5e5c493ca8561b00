//! Shared test fixtures: in-memory data store, recording upload sink and controller builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resource_scaffold::config::parse_resources;
use resource_scaffold::store::{value_to_text, ExistenceQuery, Record, SelectQuery, TableRef};
use resource_scaffold::{
    resolve, AppError, AppState, DataStore, JsonPresenter, ResourceController, ResourceRegistry, ScaffoldDefaults,
    UploadSink, UploadedFile,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Table name -> rows. Every row carries an integer `id`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows as given (ids included).
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();
        for row in rows {
            if let Value::Object(record) = row {
                entry.push(record);
            }
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    pub async fn row(&self, table: &str, id: i64) -> Option<Record> {
        self.rows(table)
            .await
            .into_iter()
            .find(|r| id_of(r, "id") == Some(id))
    }
}

fn id_of(record: &Record, column: &str) -> Option<i64> {
    record
        .get(column)
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
}

fn is_live(record: &Record, deleted_at_column: Option<&str>) -> bool {
    match deleted_at_column {
        Some(c) => record.get(c).map(Value::is_null).unwrap_or(true),
        None => true,
    }
}

fn matches(record: &Record, filters: &[(String, String)]) -> bool {
    filters
        .iter()
        .all(|(k, v)| record.get(k).map(value_to_text).as_deref() == Some(v.as_str()))
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find(&self, table: &TableRef, id: i64) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table.name).and_then(|rows| {
            rows.iter()
                .find(|r| id_of(r, &table.primary_key) == Some(id) && is_live(r, table.deleted_at_column.as_deref()))
                .cloned()
        }))
    }

    async fn select(&self, table: &TableRef, query: &SelectQuery) -> Result<Vec<Record>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Record> = tables
            .get(&table.name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| is_live(r, table.deleted_at_column.as_deref()) && matches(r, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|r| id_of(r, &table.primary_key));
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|mut r| {
                if !query.columns.is_empty() {
                    r.retain(|k, _| query.columns.iter().any(|c| c == k));
                }
                r
            })
            .collect())
    }

    async fn count(&self, table: &TableRef, filters: &[(String, String)]) -> Result<u64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table.name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| is_live(r, table.deleted_at_column.as_deref()) && matches(r, filters))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn insert(&self, table: &TableRef, values: &Record) -> Result<Record, AppError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.name.clone()).or_default();
        let next = rows.iter().filter_map(|r| id_of(r, &table.primary_key)).max().unwrap_or(0) + 1;
        let mut record = values.clone();
        record.insert(table.primary_key.clone(), Value::from(next));
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: &TableRef, id: i64, values: &Record) -> Result<Option<Record>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table.name) else { return Ok(None) };
        let Some(row) = rows
            .iter_mut()
            .find(|r| id_of(r, &table.primary_key) == Some(id) && is_live(r, table.deleted_at_column.as_deref()))
        else {
            return Ok(None);
        };
        for (k, v) in values {
            row.insert(k.clone(), v.clone());
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &TableRef, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table.name) else { return Ok(false) };
        let before = rows.len();
        rows.retain(|r| id_of(r, &table.primary_key) != Some(id));
        Ok(rows.len() != before)
    }

    async fn mark_deleted(&self, table: &TableRef, id: i64, at: DateTime<Utc>) -> Result<bool, AppError> {
        let column = table.deleted_at_column.clone().unwrap_or_else(|| "deleted_at".into());
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table.name) else { return Ok(false) };
        match rows
            .iter_mut()
            .find(|r| id_of(r, &table.primary_key) == Some(id) && is_live(r, Some(&column)))
        {
            Some(row) => {
                row.insert(column, Value::String(at.to_rfc3339()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, query: &ExistenceQuery) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        let wanted = value_to_text(&query.value);
        Ok(tables
            .get(&query.table)
            .map(|rows| {
                rows.iter().any(|r| {
                    r.get(&query.column).map(value_to_text).as_deref() == Some(wanted.as_str())
                        && is_live(r, query.live_only_column.as_deref())
                        && query
                            .exclude
                            .as_ref()
                            .map(|(col, id)| id_of(r, col) != Some(*id))
                            .unwrap_or(true)
                })
            })
            .unwrap_or(false))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Upload sink that keeps stored files in memory and returns `{resource}/{file_name}`.
#[derive(Clone, Default)]
pub struct MemoryUploadSink {
    stored: Arc<RwLock<Vec<(String, UploadedFile)>>>,
}

impl MemoryUploadSink {
    pub async fn stored(&self) -> Vec<(String, UploadedFile)> {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl UploadSink for MemoryUploadSink {
    async fn store(&self, resource: &str, file: &UploadedFile) -> Result<String, AppError> {
        let reference = format!("{}/{}", resource, file.file_name);
        self.stored.write().await.push((reference.clone(), file.clone()));
        Ok(reference)
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub uploads: MemoryUploadSink,
    pub registry: Arc<ResourceRegistry>,
}

impl Fixture {
    /// Build every resource in `config` (the JSON resource file format) over fresh in-memory
    /// collaborators.
    pub fn new(config: Value) -> Self {
        Self::with_defaults(config, ScaffoldDefaults::default())
    }

    pub fn with_defaults(config: Value, defaults: ScaffoldDefaults) -> Self {
        let configs = parse_resources(&config.to_string()).expect("valid resource config");
        let resources = resolve(&configs, &defaults).expect("resources resolve");
        let store = MemoryStore::new();
        let uploads = MemoryUploadSink::default();
        let registry = ResourceRegistry::build(
            resources,
            Arc::new(store.clone()),
            Arc::new(uploads.clone()),
            Arc::new(JsonPresenter),
        );
        Fixture {
            store,
            uploads,
            registry: Arc::new(registry),
        }
    }

    pub fn controller(&self, name: &str) -> Arc<ResourceController> {
        self.registry.get(name).expect("resource registered")
    }

    pub fn state(&self) -> AppState {
        AppState {
            store: Arc::new(self.store.clone()),
            registry: self.registry.clone(),
        }
    }
}

/// Customers (unique email, soft delete, blocked by orders) and orders.
pub fn shop_config() -> Value {
    json!([
        {
            "resource": {
                "name": "customers",
                "table": "customers",
                "data": ["name", "email", "city"],
                "uploads": { "avatar_file": "avatar" },
                "filter_by": ["city"],
                "output": { "hidden": ["secret"] },
                "soft_delete": {},
                "delete_dependencies": [
                    { "tableName": "orders", "key": "customer_id", "message": "has orders" },
                    { "tableName": "invoices", "key": "customer_id", "message": "has invoices" }
                ]
            },
            "controller": {
                "rules": {
                    "all": { "name": "required|string" },
                    "store": { "email": "required|email|unique" },
                    "update": { "email": "email|unique" }
                }
            }
        },
        {
            "resource": {
                "name": "orders",
                "table": "orders",
                "data": ["customer_id", "total"],
                "filter_by": ["customer_id"],
                "soft_delete": {}
            },
            "controller": {
                "rules": { "all": { "customer_id": "required|integer" } }
            }
        },
        {
            "resource": {
                "name": "tags",
                "table": "tags",
                "data": ["label"]
            },
            "controller": {
                "list_options": { "paginate": 2 },
                "return_on": { "store": "all-records", "update": "redirect" }
            }
        }
    ])
}

pub fn fields(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}
