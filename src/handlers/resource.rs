//! Resource CRUD handlers: list, fetch, create, update, destroy.
//! Each handler resolves the controller by path segment and maps its response to HTTP.

use crate::controller::{QueryParams, Rejection, ResourceController, ResourceRequest, ResourceResponse};
use crate::error::AppError;
use crate::extractors::{RequestContext, ResourcePayload};
use crate::response::success_flag;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;

fn controller_for(state: &AppState, resource: &str) -> Result<Arc<ResourceController>, AppError> {
    state
        .registry
        .get(resource)
        .ok_or_else(|| AppError::NotFound(format!("resource {}", resource)))
}

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("invalid id".into()))
}

/// Map a controller response to HTTP. Record shapes go through the presenter.
pub fn into_http(controller: &ResourceController, response: ResourceResponse, ctx: &RequestContext) -> Response {
    match response {
        ResourceResponse::Collection {
            view,
            records,
            pagination_info,
        } => {
            let mut data = json!({ "records": records });
            if let Some(info) = pagination_info {
                data["paginationInfo"] = serde_json::to_value(info).unwrap_or(Value::Null);
            }
            controller.presenter().render(&view, data)
        }
        ResourceResponse::Record { view, record } => controller.presenter().render(&view, json!({ "record": record })),
        ResourceResponse::NotFound => AppError::NotFound(controller.name().to_string()).into_response(),
        ResourceResponse::BadRequest(Rejection::Fields(errors)) => AppError::Validation(errors).into_response(),
        ResourceResponse::BadRequest(Rejection::Blocked(messages)) => {
            AppError::DependencyBlocked(messages).into_response()
        }
        ResourceResponse::Success => success_flag().into_response(),
        ResourceResponse::Redirect => Redirect::to(ctx.referer.as_deref().unwrap_or("/")).into_response(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<QueryParams>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let controller = controller_for(&state, &resource)?;
    let response = controller.list(&params).await?;
    Ok(into_http(&controller, response, &ctx))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let controller = controller_for(&state, &resource)?;
    let response = controller.fetch(parse_id(&id_str)?).await?;
    Ok(into_http(&controller, response, &ctx))
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<QueryParams>,
    ctx: RequestContext,
    ResourcePayload(payload): ResourcePayload,
) -> Result<Response, AppError> {
    let controller = controller_for(&state, &resource)?;
    let request = ResourceRequest {
        payload,
        query,
        background: ctx.background,
    };
    let response = controller.create(&request).await?;
    Ok(into_http(&controller, response, &ctx))
}

pub async fn update(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    Query(query): Query<QueryParams>,
    ctx: RequestContext,
    ResourcePayload(payload): ResourcePayload,
) -> Result<Response, AppError> {
    let controller = controller_for(&state, &resource)?;
    let id = parse_id(&id_str)?;
    let request = ResourceRequest {
        payload,
        query,
        background: ctx.background,
    };
    let response = controller.update(id, &request).await?;
    Ok(into_http(&controller, response, &ctx))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let controller = controller_for(&state, &resource)?;
    let id = parse_id(&id_str)?;
    let request = ResourceRequest {
        background: ctx.background,
        ..Default::default()
    };
    let response = controller.destroy(id, &request).await?;
    Ok(into_http(&controller, response, &ctx))
}
