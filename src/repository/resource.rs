//! Repository over a DataStore and an UploadSink, driven by a ResourceDefinition.

use super::{Collection, Entity, ListQuery, PageInfo, Repository, RequestPayload};
use crate::config::ResourceDefinition;
use crate::error::AppError;
use crate::store::{DataStore, ExistenceQuery, Record, SelectQuery, TableRef};
use crate::upload::UploadSink;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct ResourceRepository {
    definition: Arc<ResourceDefinition>,
    table: TableRef,
    store: Arc<dyn DataStore>,
    uploads: Arc<dyn UploadSink>,
}

impl ResourceRepository {
    pub fn new(definition: Arc<ResourceDefinition>, store: Arc<dyn DataStore>, uploads: Arc<dyn UploadSink>) -> Self {
        let table = TableRef {
            name: definition.table.clone(),
            primary_key: definition.primary_key.clone(),
            deleted_at_column: definition.deleted_at_column().map(str::to_string),
        };
        ResourceRepository {
            definition,
            table,
            store,
            uploads,
        }
    }

    /// Keep only the `data` whitelist.
    fn whitelist(&self, payload: &RequestPayload) -> Record {
        self.definition
            .data
            .iter()
            .filter_map(|k| payload.fields.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Store declared upload fields and write the returned reference into their column.
    async fn store_uploads(&self, payload: &RequestPayload, values: &mut Record) -> Result<(), AppError> {
        for (request_key, column) in self.definition.uploads.pairs() {
            if let Some(file) = payload.files.get(request_key) {
                let reference = self.uploads.store(&self.definition.name, file).await?;
                values.insert(column.to_string(), Value::String(reference));
            }
        }
        Ok(())
    }

    fn project(&self, mut record: Record) -> Value {
        let output = &self.definition.output;
        if !output.fields.is_empty() {
            record.retain(|k, _| output.fields.iter().any(|f| f == k));
        }
        self.strip_hidden(record)
    }

    /// Native record minus `output.hidden`; hidden columns never leave the repository.
    fn strip_hidden(&self, mut record: Record) -> Value {
        for hidden in &self.definition.output.hidden {
            record.remove(hidden);
        }
        Value::Object(record)
    }
}

#[async_trait]
impl Repository for ResourceRepository {
    fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    async fn has(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.store.find(&self.table, id).await?.is_some())
    }

    async fn fetch_projected(&self, id: i64) -> Result<Value, AppError> {
        let record = self
            .store
            .find(&self.table, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", self.definition.name, id)))?;
        Ok(self.project(record))
    }

    async fn list(&self, query: &ListQuery) -> Result<Collection, AppError> {
        let filters: Vec<(String, String)> = query
            .filters
            .iter()
            .filter(|(k, _)| self.definition.filter_by.contains(k))
            .cloned()
            .collect();
        let mut select = SelectQuery {
            filters,
            columns: query.select.clone(),
            limit: None,
            offset: None,
        };
        let mut pagination = None;
        if let Some(per_page) = query.per_page.filter(|n| *n > 0) {
            let page = query.page.max(1);
            let total = self.store.count(&self.table, &select.filters).await?;
            select.limit = Some(per_page);
            select.offset = Some((page - 1).saturating_mul(per_page));
            pagination = Some(PageInfo::new(page, per_page, total));
        }
        let rows = self.store.select(&self.table, &select).await?;
        let records = rows
            .into_iter()
            .map(|r| if query.as_model { self.strip_hidden(r) } else { self.project(r) })
            .collect();
        Ok(Collection { records, pagination })
    }

    async fn create(&self, payload: &RequestPayload) -> Result<Entity, AppError> {
        let mut values = self.whitelist(payload);
        self.store_uploads(payload, &mut values).await?;
        let record = self.store.insert(&self.table, &values).await?;
        let entity = Entity::from_record(record, &self.definition)?;
        tracing::info!(resource = %self.definition.name, id = entity.id, "record created");
        Ok(entity)
    }

    async fn update(&self, id: i64, payload: &RequestPayload) -> Result<Entity, AppError> {
        let mut values = self.whitelist(payload);
        self.store_uploads(payload, &mut values).await?;
        let record = self
            .store
            .update(&self.table, id, &values)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", self.definition.name, id)))?;
        tracing::info!(resource = %self.definition.name, id, "record updated");
        Entity::from_record(record, &self.definition)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let removed = if self.is_soft_delete_enabled() {
            self.store.mark_deleted(&self.table, id, chrono::Utc::now()).await?
        } else {
            self.store.delete(&self.table, id).await?
        };
        if removed {
            tracing::info!(resource = %self.definition.name, id, soft = self.is_soft_delete_enabled(), "record deleted");
        } else {
            tracing::debug!(resource = %self.definition.name, id, "delete matched no live record");
        }
        Ok(())
    }

    async fn exists(&self, query: &ExistenceQuery) -> Result<bool, AppError> {
        self.store.exists(query).await
    }
}
