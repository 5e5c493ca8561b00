//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and EXISTS statements for a table.

use crate::store::{value_to_text, ExistenceQuery, Record, SelectQuery, TableRef};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from validated config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name (`sales.orders` -> `"sales"."orders"`).
fn qualified_table(name: &str) -> String {
    name.split('.').map(quoted).collect::<Vec<_>>().join(".")
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

fn select_column_list(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ")
    }
}

/// `AND "deleted_at" IS NULL` when the table soft-deletes, else empty.
fn live_clause(table: &TableRef) -> String {
    table
        .deleted_at_column
        .as_deref()
        .map(|c| format!(" AND {} IS NULL", quoted(c)))
        .unwrap_or_default()
}

/// Filters compare the column's text form so string query values match any column type.
fn where_filters(q: &mut QueryBuf, filters: &[(String, String)]) -> Vec<String> {
    filters
        .iter()
        .map(|(col, val)| {
            let n = q.push_param(Value::String(val.clone()));
            format!("{}::text = ${}", quoted(col), n)
        })
        .collect()
}

/// SELECT one live row by primary key. Caller binds the id as `$1`.
pub fn select_by_id(table: &TableRef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.params.push(Value::Null);
    q.sql = format!(
        "SELECT * FROM {} WHERE {} = $1{}",
        qualified_table(&table.name),
        quoted(&table.primary_key),
        live_clause(table)
    );
    q
}

/// SELECT live rows with exact-match filters, ORDER BY pk, optional LIMIT/OFFSET.
pub fn select_list(table: &TableRef, query: &SelectQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = vec!["TRUE".to_string()];
    where_parts.extend(where_filters(&mut q, &query.filters));
    let limit_clause = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = query.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}{} ORDER BY {}{}{}",
        select_column_list(&query.columns),
        qualified_table(&table.name),
        where_parts.join(" AND "),
        live_clause(table),
        quoted(&table.primary_key),
        limit_clause,
        offset_clause
    );
    q
}

/// SELECT COUNT(*) of live rows matching filters.
pub fn count(table: &TableRef, filters: &[(String, String)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = vec!["TRUE".to_string()];
    where_parts.extend(where_filters(&mut q, filters));
    q.sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {}{}",
        qualified_table(&table.name),
        where_parts.join(" AND "),
        live_clause(table)
    );
    q
}

/// Row source typing every bound value by its column: `jsonb_populate_record(NULL::t, $n)`.
/// String input (forms, multipart) then converts with each column's input function.
fn populated_record(q: &mut QueryBuf, target: &str, values: Record) -> String {
    let n = q.push_param(Value::Object(values));
    format!("jsonb_populate_record(NULL::{}, ${})", target, n)
}

/// INSERT the given columns; an empty record inserts defaults.
pub fn insert(table: &TableRef, values: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let target = qualified_table(&table.name);
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING *", target);
        return q;
    }
    let cols = values.keys().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    let source = populated_record(&mut q, &target, values.clone());
    q.sql = format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} RETURNING *",
        target, cols, cols, source
    );
    q
}

/// UPDATE a live row by id: SET only the given columns (never the primary key).
/// With nothing to set this degrades to a SELECT of the row.
pub fn update(table: &TableRef, id: i64, values: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let target = qualified_table(&table.name);
    let pk = &table.primary_key;
    let sets: Record = values
        .iter()
        .filter(|(k, _)| *k != pk)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if sets.is_empty() {
        let id_param = q.push_param(Value::from(id));
        q.sql = format!(
            "SELECT * FROM {} WHERE {} = ${}{}",
            target,
            quoted(pk),
            id_param,
            live_clause(table)
        );
        return q;
    }
    let assignments = sets
        .keys()
        .map(|c| format!("{} = \"_r\".{}", quoted(c), quoted(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let source = populated_record(&mut q, &target, sets);
    let id_param = q.push_param(Value::from(id));
    let live = table
        .deleted_at_column
        .as_deref()
        .map(|c| format!(" AND \"_t\".{} IS NULL", quoted(c)))
        .unwrap_or_default();
    q.sql = format!(
        "UPDATE {} AS \"_t\" SET {} FROM {} AS \"_r\" WHERE \"_t\".{} = ${}{} RETURNING \"_t\".*",
        target,
        assignments,
        source,
        quoted(pk),
        id_param,
        live
    );
    q
}

/// DELETE by id. Caller binds the id as `$1`.
pub fn delete(table: &TableRef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.params.push(Value::Null);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        qualified_table(&table.name),
        quoted(&table.primary_key)
    );
    q
}

/// Soft delete: set the deleted-at column on a live row. Binds `$1` = timestamp, `$2` = id.
/// Returns None when the table has no soft-delete column.
pub fn mark_deleted(table: &TableRef) -> Option<QueryBuf> {
    let column = table.deleted_at_column.as_deref()?;
    let mut q = QueryBuf::new();
    q.params.push(Value::Null);
    q.params.push(Value::Null);
    q.sql = format!(
        "UPDATE {} SET {} = $1 WHERE {} = $2 AND {} IS NULL",
        qualified_table(&table.name),
        quoted(column),
        quoted(&table.primary_key),
        quoted(column)
    );
    Some(q)
}

/// SELECT EXISTS(...) for a uniqueness / dependency probe.
pub fn exists(query: &ExistenceQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(value_to_text(&query.value)));
    let mut where_parts = vec![format!("{}::text = ${}", quoted(&query.column), n)];
    if let Some((id_col, id)) = &query.exclude {
        let n = q.push_param(Value::from(*id));
        where_parts.push(format!("{} <> ${}", quoted(id_col), n));
    }
    if let Some(col) = &query.live_only_column {
        where_parts.push(format!("{} IS NULL", quoted(col)));
    }
    q.sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        qualified_table(&query.table),
        where_parts.join(" AND ")
    );
    q
}
