//! Resolved controller settings: config validated and defaults applied for runtime use.

use crate::config::{ListOptions, ResourceDefinition, ReturnPolicy, RuleScopes};
use std::sync::Arc;

/// Process-wide fallbacks used when a controller leaves a setting unset.
#[derive(Clone, Debug)]
pub struct ScaffoldDefaults {
    pub return_on_store: ReturnPolicy,
    pub return_on_update: ReturnPolicy,
}

impl Default for ScaffoldDefaults {
    fn default() -> Self {
        ScaffoldDefaults {
            return_on_store: ReturnPolicy::SingleRecord,
            return_on_update: ReturnPolicy::SingleRecord,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub view: String,
    pub list_options: ListOptions,
    pub return_on_store: ReturnPolicy,
    pub return_on_update: ReturnPolicy,
    pub rules: RuleScopes,
}

impl ControllerSettings {
    /// Full view path, e.g. `customers.index`.
    pub fn view_path(&self, name: &str) -> String {
        format!("{}.{}", self.view, name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub definition: Arc<ResourceDefinition>,
    pub settings: ControllerSettings,
}
