//! Request validation from composed rule sets.

mod validator;
pub use validator::{RequestValidator, ValidationMessages};

use std::collections::BTreeMap;

/// Field name -> every message produced for that field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;
