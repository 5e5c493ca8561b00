//! Presenter boundary: turns a named view and its data map into an HTTP response.

use crate::response::{success_many, success_one_ok};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

pub trait Presenter: Send + Sync {
    /// `data` holds `records` (+ optional `paginationInfo`) for lists, or `record` for one entity.
    fn render(&self, view: &str, data: Value) -> Response;
}

/// Renders the JSON envelope `{ data, meta }`; the view name is reported in `meta.view`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonPresenter;

impl Presenter for JsonPresenter {
    fn render(&self, view: &str, data: Value) -> Response {
        let Value::Object(mut map) = data else {
            return success_one_ok(data, Some(json!({ "view": view }))).into_response();
        };
        if let Some(records) = map.remove("records") {
            let records = match records {
                Value::Array(items) => items,
                other => vec![other],
            };
            return success_many(records, Some(view.to_string()), map.remove("paginationInfo")).into_response();
        }
        let record = map.remove("record").unwrap_or(Value::Object(map));
        success_one_ok(record, Some(json!({ "view": view }))).into_response()
    }
}
