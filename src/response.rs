//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaCount {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_info: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessFlag {
    pub success: bool,
}

pub fn success_one_ok<T: Serialize>(data: T, meta: Option<serde_json::Value>) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data, meta }))
}

pub fn success_many<T: Serialize>(
    data: Vec<T>,
    view: Option<String>,
    pagination_info: Option<serde_json::Value>,
) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount {
                count,
                view,
                pagination_info,
            },
        }),
    )
}

pub fn success_flag() -> (StatusCode, Json<SuccessFlag>) {
    (StatusCode::OK, Json(SuccessFlag { success: true }))
}
