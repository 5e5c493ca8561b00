//! Rule representation: static tokens vs. uniqueness constraints, decided at parse time.

use serde::{Deserialize, Serialize};

/// Static rule names understood by the request validator. Parameterized rules carry `name:args`.
pub const KNOWN_TOKENS: &[&str] = &[
    "required",
    "nullable",
    "sometimes",
    "string",
    "integer",
    "numeric",
    "boolean",
    "array",
    "email",
    "uuid",
    "date",
    "min",
    "max",
    "in",
    "regex",
    "confirmed",
    "file",
    "image",
];

/// Uniqueness constraint. `table == None` marks a bare `unique` token that still has to be bound
/// to the owning resource's table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueRule {
    #[serde(default)]
    pub table: Option<String>,
    /// Column to check; the field name when unset.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub exclude_id: Option<i64>,
    /// Primary key column used with `exclude_id`; `id` when unset.
    #[serde(default)]
    pub id_column: Option<String>,
    /// When set, only rows with this column NULL count (soft-delete aware).
    #[serde(default)]
    pub live_only_column: Option<String>,
}

impl UniqueRule {
    pub fn is_bare(&self) -> bool {
        self.table.is_none()
    }

    pub fn on_table(table: impl Into<String>, column: impl Into<String>) -> Self {
        UniqueRule {
            table: Some(table.into()),
            column: Some(column.into()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum Rule {
    Static(String),
    Unique(UniqueRule),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Token(String),
    Unique { unique: UniqueRule },
}

impl TryFrom<RawRule> for Rule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        match raw {
            RawRule::Token(s) => Rule::parse(&s).ok_or_else(|| "empty rule token".to_string()),
            RawRule::Unique { unique } => Ok(Rule::Unique(unique)),
        }
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Static(token) => RawRule::Token(token),
            Rule::Unique(unique) => RawRule::Unique { unique },
        }
    }
}

impl Rule {
    /// Parse one token. `unique`, `unique:table` and `unique:table,column[,except_id[,id_column]]`
    /// become `Rule::Unique`; anything else stays a static token. Returns None for blank input.
    pub fn parse(token: &str) -> Option<Rule> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let (name, args) = match token.split_once(':') {
            Some((n, a)) => (n.trim(), Some(a)),
            None => (token, None),
        };
        if name != "unique" {
            return Some(Rule::Static(token.to_string()));
        }
        let mut unique = UniqueRule::default();
        if let Some(args) = args {
            let mut parts = args.split(',').map(str::trim).filter(|s| !s.is_empty());
            unique.table = parts.next().map(str::to_string);
            unique.column = parts.next().map(str::to_string);
            unique.exclude_id = parts.next().and_then(|s| s.parse().ok());
            unique.id_column = parts.next().map(str::to_string);
        }
        Some(Rule::Unique(unique))
    }

    /// Rule name without arguments (`min:3` -> `min`).
    pub fn name(&self) -> &str {
        match self {
            Rule::Static(token) => token.split_once(':').map(|(n, _)| n).unwrap_or(token),
            Rule::Unique(_) => "unique",
        }
    }

    /// Argument string of a static rule (`in:a,b` -> `a,b`).
    pub fn args(&self) -> Option<&str> {
        match self {
            Rule::Static(token) => token.split_once(':').map(|(_, a)| a),
            Rule::Unique(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Rule::Unique(_)) || KNOWN_TOKENS.contains(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_unique_has_no_table() {
        let rule = Rule::parse("unique").unwrap();
        assert_eq!(rule, Rule::Unique(UniqueRule::default()));
        match rule {
            Rule::Unique(u) => assert!(u.is_bare()),
            _ => panic!("expected unique"),
        }
    }

    #[test]
    fn qualified_unique_keeps_table_and_column() {
        let rule = Rule::parse("unique:users,email,4").unwrap();
        assert_eq!(
            rule,
            Rule::Unique(UniqueRule {
                table: Some("users".into()),
                column: Some("email".into()),
                exclude_id: Some(4),
                ..Default::default()
            })
        );
    }

    #[test]
    fn static_tokens_expose_name_and_args() {
        let rule = Rule::parse("min:3").unwrap();
        assert_eq!(rule.name(), "min");
        assert_eq!(rule.args(), Some("3"));
        assert!(rule.is_known());
        assert!(!Rule::parse("shiny").unwrap().is_known());
        assert!(Rule::parse("  ").is_none());
    }

    #[test]
    fn deserializes_token_and_structured_forms() {
        let rules: Vec<Rule> = serde_json::from_str(
            r#"["required", {"unique": {"table": "users", "column": "email"}}]"#,
        )
        .unwrap();
        assert_eq!(rules[0], Rule::Static("required".into()));
        assert_eq!(rules[1], Rule::Unique(UniqueRule::on_table("users", "email")));
    }
}
