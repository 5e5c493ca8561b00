//! Resource CRUD routes. Parameterized paths let the handlers resolve the controller by segment.

use crate::handlers::resource::{create, destroy, fetch, list, update};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Max request body (multipart uploads included).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create))
        .route(
            "/:resource/:id",
            get(fetch).put(update).patch(update).delete(destroy),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
