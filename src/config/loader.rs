//! Load resource config from a JSON file and process-wide defaults from the environment.

use crate::config::resolved::{ControllerSettings, ResolvedResource, ScaffoldDefaults};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;
use std::sync::Arc;

/// Env var overriding the default store response policy.
pub const RETURN_ON_STORE_ENV: &str = "SCAFFOLD_RETURN_ON_STORE";
/// Env var overriding the default update response policy.
pub const RETURN_ON_UPDATE_ENV: &str = "SCAFFOLD_RETURN_ON_UPDATE";

impl ScaffoldDefaults {
    /// Read defaults from `SCAFFOLD_RETURN_ON_STORE` / `SCAFFOLD_RETURN_ON_UPDATE`; unset keeps `single-record`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut defaults = ScaffoldDefaults::default();
        if let Ok(v) = std::env::var(RETURN_ON_STORE_ENV) {
            defaults.return_on_store = v.parse()?;
        }
        if let Ok(v) = std::env::var(RETURN_ON_UPDATE_ENV) {
            defaults.return_on_update = v.parse()?;
        }
        Ok(defaults)
    }
}

/// Validate and resolve resource configs, applying `defaults` wherever a controller leaves a
/// response policy unset.
pub fn resolve(configs: &[ResourceConfig], defaults: &ScaffoldDefaults) -> Result<Vec<ResolvedResource>, ConfigError> {
    validate(configs)?;
    let resolved = configs
        .iter()
        .map(|cfg| {
            let controller = &cfg.controller;
            let settings = ControllerSettings {
                view: controller.view.clone().unwrap_or_else(|| cfg.resource.name.clone()),
                list_options: controller.list_options.clone(),
                return_on_store: controller.return_on.store.unwrap_or(defaults.return_on_store),
                return_on_update: controller.return_on.update.unwrap_or(defaults.return_on_update),
                rules: controller.rules.clone(),
            };
            ResolvedResource {
                definition: Arc::new(cfg.resource.clone()),
                settings,
            }
        })
        .collect();
    Ok(resolved)
}

pub fn parse_resources(json: &str) -> Result<Vec<ResourceConfig>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Load the resource file (a JSON array of `{ resource, controller }`).
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<ResourceConfig>, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading resource config");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_resources(&raw)
}
