//! Rule composition: scope merging and the uniqueness rewrite.

use super::{FieldRules, Rule, RuleList, RuleSet};

/// Merge global and scoped rule sets. A field present in `scoped` replaces the global entry
/// for that field; all other fields are unioned.
pub fn merge(global: &RuleSet, scoped: &RuleSet) -> RuleSet {
    let mut merged = global.clone();
    for (field, rules) in scoped {
        merged.insert(field.clone(), rules.clone());
    }
    merged
}

/// Turn every rule list into an ordered `Vec<Rule>`. Delimited strings are split on `|`;
/// lists that are already structured are kept as they are.
pub fn normalize(rules: RuleSet) -> FieldRules {
    rules
        .into_iter()
        .map(|(field, list)| {
            let rules = match list {
                RuleList::Delimited(s) => s.split('|').filter_map(Rule::parse).collect(),
                RuleList::Items(items) => items,
            };
            (field, rules)
        })
        .collect()
}

/// Bind every bare uniqueness rule to `table`, excluding `exclude_id` when given so a record
/// never conflicts with itself on update.
pub fn bind_unique(rules: &mut FieldRules, table: &str, id_column: &str, exclude_id: Option<i64>) {
    for list in rules.values_mut() {
        for rule in list.iter_mut() {
            if let Rule::Unique(unique) = rule {
                if unique.is_bare() {
                    unique.table = Some(table.to_string());
                    unique.exclude_id = exclude_id;
                    unique.id_column = Some(id_column.to_string());
                }
            }
        }
    }
}
