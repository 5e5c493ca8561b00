//! Config validation: identifier safety, rule vocabulary and internal consistency.

use crate::config::ResourceConfig;
use crate::error::ConfigError;
use crate::rules::{normalize, Rule, RuleSet};
use regex::Regex;
use std::collections::HashSet;

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Column or table identifier (table may be `schema.table`). Identifiers end up quoted in SQL,
/// so only plain names are accepted.
pub fn check_identifier(kind: &'static str, value: &str) -> Result<(), ConfigError> {
    let ok = value.split('.').count() <= 2 && value.split('.').all(is_plain_identifier);
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

fn check_rules(rules: &RuleSet) -> Result<(), ConfigError> {
    for (field, list) in normalize(rules.clone()) {
        for rule in &list {
            if !rule.is_known() {
                return Err(ConfigError::UnknownRule {
                    field: field.clone(),
                    token: rule.name().to_string(),
                });
            }
            if let Rule::Unique(unique) = rule {
                if let Some(table) = &unique.table {
                    check_identifier("table", table)?;
                }
                check_identifier("column", unique.column.as_deref().unwrap_or(field.as_str()))?;
                for col in unique.id_column.iter().chain(&unique.live_only_column) {
                    check_identifier("column", col)?;
                }
            }
            if rule.name() == "regex" {
                let pattern = rule.args().unwrap_or_default();
                Regex::new(pattern).map_err(|_| {
                    ConfigError::Validation(format!("invalid regex rule on {}: {}", field, pattern))
                })?;
            }
        }
    }
    Ok(())
}

pub fn validate(configs: &[ResourceConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for cfg in configs {
        let def = &cfg.resource;
        if def.name.trim().is_empty() {
            return Err(ConfigError::Validation("resource name must not be empty".into()));
        }
        // Also a URL segment and an upload directory name.
        if !is_plain_identifier(&def.name) {
            return Err(ConfigError::InvalidIdentifier {
                kind: "resource",
                value: def.name.clone(),
            });
        }
        if !names.insert(def.name.as_str()) {
            return Err(ConfigError::DuplicateResource(def.name.clone()));
        }
        check_identifier("table", &def.table)?;
        check_identifier("column", &def.primary_key)?;
        for col in def.data.iter().chain(&def.filter_by).chain(&cfg.controller.list_options.select) {
            check_identifier("column", col)?;
        }
        for (_, column) in def.uploads.pairs() {
            check_identifier("column", column)?;
        }
        if let Some(col) = def.deleted_at_column() {
            check_identifier("column", col)?;
        }
        for dep in &def.delete_dependencies {
            check_identifier("table", &dep.table_name)?;
            check_identifier("column", &dep.key)?;
            if dep.message.trim().is_empty() {
                return Err(ConfigError::MissingReference {
                    kind: "dependency message",
                    id: format!("{}.{}", dep.table_name, dep.key),
                });
            }
        }
        if cfg.controller.list_options.paginate == Some(0) {
            return Err(ConfigError::Validation(format!(
                "{}: list_options.paginate must be at least 1",
                def.name
            )));
        }
        let rules = &cfg.controller.rules;
        check_rules(&rules.all)?;
        check_rules(&rules.store)?;
        check_rules(&rules.update)?;
    }
    Ok(())
}
