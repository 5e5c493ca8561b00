//! Repository contract consumed by resource controllers.

mod resource;
pub use resource::ResourceRepository;

use crate::config::{DependencyDescriptor, ResourceDefinition};
use crate::error::AppError;
use crate::store::{ExistenceQuery, Record};
use crate::upload::UploadedFile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Inbound field/value map plus uploaded files keyed by request key.
#[derive(Clone, Debug, Default)]
pub struct RequestPayload {
    pub fields: Map<String, Value>,
    pub files: BTreeMap<String, UploadedFile>,
}

impl RequestPayload {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        RequestPayload {
            fields,
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, key: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(key.into(), file);
        self
    }
}

/// Options for one list call.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    /// Candidate filters; the repository keeps only its filterable fields.
    pub filters: Vec<(String, String)>,
    pub select: Vec<String>,
    /// Page size; None returns every record without pagination info.
    pub per_page: Option<u32>,
    /// 1-based page number.
    pub page: u32,
    /// Return native records instead of the `fields` projection; hidden columns are still dropped.
    pub as_model: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl PageInfo {
    pub fn new(current_page: u32, per_page: u32, total: u64) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            (total.div_ceil(per_page as u64)).max(1) as u32
        };
        PageInfo {
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Collection {
    pub records: Vec<Value>,
    pub pagination: Option<PageInfo>,
}

impl Collection {
    /// Pagination info for this listing; present only when the list was paginated.
    pub fn pagination_info(&self) -> Option<&PageInfo> {
        self.pagination.as_ref()
    }
}

/// A stored record identified by its integer id.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: i64,
    pub attributes: Record,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn from_record(record: Record, definition: &ResourceDefinition) -> Result<Self, AppError> {
        let id = record
            .get(&definition.primary_key)
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .ok_or_else(|| {
                AppError::Store(format!(
                    "{}: record has no integer '{}'",
                    definition.name, definition.primary_key
                ))
            })?;
        let deleted_at = definition
            .deleted_at_column()
            .and_then(|c| record.get(c))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        Ok(Entity {
            id,
            attributes: record,
            deleted_at,
        })
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    fn definition(&self) -> &ResourceDefinition;

    /// Whether a live record with this id exists.
    async fn has(&self, id: i64) -> Result<bool, AppError>;

    /// Output projection of one record. NotFound when absent.
    async fn fetch_projected(&self, id: i64) -> Result<Value, AppError>;

    async fn list(&self, query: &ListQuery) -> Result<Collection, AppError>;

    /// Create from the whitelisted payload fields, storing declared uploads first.
    async fn create(&self, payload: &RequestPayload) -> Result<Entity, AppError>;

    async fn update(&self, id: i64, payload: &RequestPayload) -> Result<Entity, AppError>;

    /// Soft or hard delete depending on the resource definition.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    async fn exists(&self, query: &ExistenceQuery) -> Result<bool, AppError>;

    fn is_soft_delete_enabled(&self) -> bool {
        self.definition().soft_delete.is_some()
    }

    fn has_delete_dependencies(&self) -> bool {
        !self.delete_dependencies().is_empty()
    }

    fn delete_dependencies(&self) -> &[DependencyDescriptor] {
        &self.definition().delete_dependencies
    }

    fn table_identifier(&self) -> &str {
        &self.definition().table
    }
}
