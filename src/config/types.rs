//! Raw config types matching the JSON resource file.

use crate::error::ConfigError;
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns exposed when a record is rendered. Empty `fields` exposes every column.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputProjection {
    #[serde(default)]
    pub fields: Vec<String>,
    /// Column names that must never be exposed (e.g. password hashes).
    #[serde(default)]
    pub hidden: Vec<String>,
}

/// Auto-saved upload fields.
/// Positional: the request key is also the storage column.
/// Keyed: request key -> storage column.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadFields {
    Positional(Vec<String>),
    Keyed(BTreeMap<String, String>),
}

impl Default for UploadFields {
    fn default() -> Self {
        UploadFields::Positional(Vec::new())
    }
}

impl UploadFields {
    /// (request key, storage column) pairs.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        match self {
            UploadFields::Positional(v) => v.iter().map(|k| (k.as_str(), k.as_str())).collect(),
            UploadFields::Keyed(m) => m.iter().map(|(k, c)| (k.as_str(), c.as_str())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            UploadFields::Positional(v) => v.is_empty(),
            UploadFields::Keyed(m) => m.is_empty(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    #[serde(default = "default_deleted_at")]
    pub deleted_at_column: String,
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        SoftDeleteConfig {
            deleted_at_column: default_deleted_at(),
        }
    }
}

/// A table whose rows reference this resource; live references block deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    #[serde(alias = "tableName")]
    pub table_name: String,
    pub key: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub name: String,
    /// Backing table, optionally schema-qualified (`sales.customers`).
    pub table: String,
    #[serde(default = "default_pk")]
    pub primary_key: String,
    #[serde(default)]
    pub output: OutputProjection,
    /// Whitelist of fields accepted on create/update.
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub uploads: UploadFields,
    #[serde(default)]
    pub filter_by: Vec<String>,
    #[serde(default)]
    pub soft_delete: Option<SoftDeleteConfig>,
    #[serde(default)]
    pub delete_dependencies: Vec<DependencyDescriptor>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        ResourceDefinition {
            name: name.into(),
            table: table.into(),
            primary_key: default_pk(),
            output: OutputProjection::default(),
            data: Vec::new(),
            uploads: UploadFields::default(),
            filter_by: Vec::new(),
            soft_delete: None,
            delete_dependencies: Vec::new(),
        }
    }

    pub fn deleted_at_column(&self) -> Option<&str> {
        self.soft_delete.as_ref().map(|s| s.deleted_at_column.as_str())
    }
}

fn default_pk() -> String {
    "id".into()
}

fn default_deleted_at() -> String {
    "deleted_at".into()
}

/// What a successful store/update responds with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnPolicy {
    SingleRecord,
    AllRecords,
    #[serde(alias = "success")]
    Redirect,
}

impl std::str::FromStr for ReturnPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single-record" => Ok(ReturnPolicy::SingleRecord),
            "all-records" => Ok(ReturnPolicy::AllRecords),
            "redirect" | "success" => Ok(ReturnPolicy::Redirect),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListOptions {
    /// Columns selected for list responses; empty selects all.
    #[serde(default)]
    pub select: Vec<String>,
    /// Page size. None disables pagination.
    #[serde(default)]
    pub paginate: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReturnOnConfig {
    #[serde(default)]
    pub store: Option<ReturnPolicy>,
    #[serde(default)]
    pub update: Option<ReturnPolicy>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleScopes {
    #[serde(default)]
    pub all: RuleSet,
    #[serde(default)]
    pub store: RuleSet,
    #[serde(default)]
    pub update: RuleSet,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// View namespace; the resource name when unset.
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub list_options: ListOptions,
    #[serde(default)]
    pub return_on: ReturnOnConfig,
    #[serde(default)]
    pub rules: RuleScopes,
}

/// One entry of the resource file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub resource: ResourceDefinition,
    #[serde(default)]
    pub controller: ControllerConfig,
}
