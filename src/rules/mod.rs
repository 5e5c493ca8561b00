//! Validation rule sets and their per-request composition.

mod compose;
mod rule;

pub use compose::{bind_unique, merge, normalize};
pub use rule::{Rule, UniqueRule, KNOWN_TOKENS};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rules for one field, either `"required|unique"` or a structured list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleList {
    Delimited(String),
    Items(Vec<Rule>),
}

/// Field name -> rule list, as written in configuration.
pub type RuleSet = BTreeMap<String, RuleList>;

/// Field name -> ordered rules, after normalization.
pub type FieldRules = BTreeMap<String, Vec<Rule>>;
