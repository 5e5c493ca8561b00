//! Pre-delete dependency checks: live rows in dependent tables block deletion.

use crate::error::AppError;
use crate::repository::{Repository, RequestPayload};
use crate::rules::{FieldRules, Rule, UniqueRule};
use crate::validation::{RequestValidator, ValidationMessages};
use serde_json::{Map, Value};

pub struct DependencyGuard;

impl DependencyGuard {
    /// Block messages for every descriptor that still has a referencing row, in declaration
    /// order. All descriptors go through one validation pass; an empty list means the delete
    /// may proceed.
    pub async fn check(repository: &dyn Repository, id: i64) -> Result<Vec<String>, AppError> {
        let descriptors = repository.delete_dependencies();
        let live_only_column = if repository.is_soft_delete_enabled() {
            Some(
                repository
                    .definition()
                    .deleted_at_column()
                    .unwrap_or("deleted_at")
                    .to_string(),
            )
        } else {
            None
        };

        let mut data = Map::new();
        let mut rules = FieldRules::new();
        let mut messages = ValidationMessages::new();
        for (position, dep) in descriptors.iter().enumerate() {
            let field = Self::field_name(position);
            data.insert(field.clone(), Value::from(id));
            let mut unique = UniqueRule::on_table(&dep.table_name, &dep.key);
            unique.live_only_column = live_only_column.clone();
            rules.insert(field.clone(), vec![Rule::Unique(unique)]);
            messages.insert(format!("{}.unique", field), dep.message.clone());
        }

        let payload = RequestPayload::from_fields(data);
        let mut errors = RequestValidator::new(repository)
            .with_messages(messages)
            .validate(&rules, &payload)
            .await?;

        let blocked: Vec<String> = (0..descriptors.len())
            .filter_map(|position| errors.remove(&Self::field_name(position)))
            .flatten()
            .collect();
        if !blocked.is_empty() {
            tracing::warn!(
                resource = %repository.definition().name,
                id,
                blocked = blocked.len(),
                "delete blocked by dependent records"
            );
        }
        Ok(blocked)
    }

    /// Keyed by declaration position; table/key pairs can collide once flattened.
    fn field_name(position: usize) -> String {
        format!("dependency_{}", position)
    }
}
