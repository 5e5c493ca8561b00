//! Evaluates composed rules against a payload, collecting every failure.

use super::FieldErrors;
use crate::error::AppError;
use crate::repository::{Repository, RequestPayload};
use crate::rules::{FieldRules, Rule, UniqueRule};
use crate::store::{value_to_text, ExistenceQuery};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Custom messages keyed by `field.rule` (e.g. `email.unique`).
pub type ValidationMessages = BTreeMap<String, String>;

pub struct RequestValidator<'a> {
    repository: &'a dyn Repository,
    messages: ValidationMessages,
}

impl<'a> RequestValidator<'a> {
    pub fn new(repository: &'a dyn Repository) -> Self {
        RequestValidator {
            repository,
            messages: ValidationMessages::new(),
        }
    }

    pub fn with_messages(mut self, messages: ValidationMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Validate every field and return all failures. An empty map means the payload passed.
    /// Only store errors are returned as `Err`.
    pub async fn validate(&self, rules: &FieldRules, payload: &RequestPayload) -> Result<FieldErrors, AppError> {
        let mut errors = FieldErrors::new();
        for (field, list) in rules {
            let field_errors = self.validate_field(field, list, payload).await?;
            if !field_errors.is_empty() {
                errors.insert(field.clone(), field_errors);
            }
        }
        Ok(errors)
    }

    async fn validate_field(&self, field: &str, rules: &[Rule], payload: &RequestPayload) -> Result<Vec<String>, AppError> {
        let value = payload.fields.get(field);
        let has_file = payload.files.contains_key(field);
        let present = has_file || value.map(is_filled).unwrap_or(false);
        let mut out = Vec::new();

        if !present {
            if rules.iter().any(|r| r.name() == "required") {
                out.push(self.message(field, "required", || format!("{} is required", field)));
            }
            return Ok(out);
        }

        let numeric_field = rules.iter().any(|r| matches!(r.name(), "integer" | "numeric"));
        for rule in rules {
            let failure = match rule {
                Rule::Unique(unique) => {
                    let Some(v) = value else { continue };
                    self.check_unique(field, v, unique).await?
                }
                Rule::Static(_) => check_static(field, rule, value, payload, numeric_field),
            };
            if let Some(default) = failure {
                out.push(self.message(field, rule.name(), || default));
            }
        }
        Ok(out)
    }

    async fn check_unique(&self, field: &str, value: &Value, unique: &UniqueRule) -> Result<Option<String>, AppError> {
        let table = unique
            .table
            .clone()
            .unwrap_or_else(|| self.repository.table_identifier().to_string());
        let query = ExistenceQuery {
            table,
            column: unique.column.clone().unwrap_or_else(|| field.to_string()),
            value: value.clone(),
            exclude: unique
                .exclude_id
                .map(|id| (unique.id_column.clone().unwrap_or_else(|| "id".into()), id)),
            live_only_column: unique.live_only_column.clone(),
        };
        if self.repository.exists(&query).await? {
            Ok(Some(format!("{} has already been taken", field)))
        } else {
            Ok(None)
        }
    }

    fn message(&self, field: &str, rule: &str, default: impl FnOnce() -> String) -> String {
        self.messages
            .get(&format!("{}.{}", field, rule))
            .cloned()
            .unwrap_or_else(default)
    }
}

fn is_filled(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Size used by min/max: numeric value, string length, array length or file size in KiB.
fn size_of(v: Option<&Value>, file_len: Option<usize>, numeric_field: bool) -> Option<f64> {
    if let Some(len) = file_len {
        return Some(len as f64 / 1024.0);
    }
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if numeric_field => s.trim().parse().ok(),
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(a) => Some(a.len() as f64),
        _ => None,
    }
}

fn valid_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

fn valid_date(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok() || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn check_static(
    field: &str,
    rule: &Rule,
    value: Option<&Value>,
    payload: &RequestPayload,
    numeric_field: bool,
) -> Option<String> {
    let file = payload.files.get(field);
    let text = value.and_then(Value::as_str);
    match rule.name() {
        "required" | "nullable" | "sometimes" => None,
        "string" => (!value.map(Value::is_string).unwrap_or(false)).then(|| format!("{} must be a string", field)),
        "integer" => {
            let ok = match value {
                Some(Value::Number(n)) => n.is_i64() || n.is_u64(),
                Some(Value::String(s)) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            };
            (!ok).then(|| format!("{} must be an integer", field))
        }
        "numeric" => value
            .and_then(as_number)
            .is_none()
            .then(|| format!("{} must be a number", field)),
        "boolean" => {
            let ok = match value {
                Some(Value::Bool(_)) => true,
                Some(Value::Number(n)) => matches!(n.as_i64(), Some(0) | Some(1)),
                Some(Value::String(s)) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
                _ => false,
            };
            (!ok).then(|| format!("{} must be true or false", field))
        }
        "array" => (!value.map(Value::is_array).unwrap_or(false)).then(|| format!("{} must be an array", field)),
        "email" => (!text.map(valid_email).unwrap_or(false)).then(|| format!("{} must be a valid email", field)),
        "uuid" => (!text.map(|s| uuid::Uuid::parse_str(s).is_ok()).unwrap_or(false))
            .then(|| format!("{} must be a valid UUID", field)),
        "date" => (!text.map(valid_date).unwrap_or(false)).then(|| format!("{} must be a valid date", field)),
        "min" | "max" => {
            let limit: f64 = rule.args()?.trim().parse().ok()?;
            let size = size_of(value, file.map(|f| f.bytes.len()), numeric_field)?;
            if rule.name() == "min" && size < limit {
                Some(format!("{} must be at least {}", field, limit))
            } else if rule.name() == "max" && size > limit {
                Some(format!("{} must be at most {}", field, limit))
            } else {
                None
            }
        }
        "in" => {
            let allowed: Vec<&str> = rule.args().unwrap_or_default().split(',').map(str::trim).collect();
            let v = value.map(value_to_text).unwrap_or_default();
            (!allowed.contains(&v.as_str())).then(|| format!("{} must be one of: {}", field, allowed.join(", ")))
        }
        "regex" => {
            let re = match Regex::new(rule.args().unwrap_or_default()) {
                Ok(re) => re,
                Err(_) => return Some(format!("invalid pattern for {}", field)),
            };
            (!text.map(|s| re.is_match(s)).unwrap_or(false))
                .then(|| format!("{} does not match required pattern", field))
        }
        "confirmed" => {
            let confirmation = payload.fields.get(&format!("{}_confirmation", field));
            (confirmation != value).then(|| format!("{} confirmation does not match", field))
        }
        "file" => file.is_none().then(|| format!("{} must be a file", field)),
        "image" => (!file.map(|f| f.is_image()).unwrap_or(false)).then(|| format!("{} must be an image", field)),
        other => {
            tracing::warn!(field, rule = other, "ignoring unknown validation rule");
            None
        }
    }
}
