//! Extract request context (background flag, redirect target) and the mutation payload.

use crate::error::AppError;
use crate::repository::RequestPayload;
use crate::upload::UploadedFile;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{header, request::Parts},
    Form, Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Header set by ajax clients. Default value checked: `XMLHttpRequest`.
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

/// Whether the caller expects a background-style response, and where "back" is.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub background: bool,
    pub referer: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let ajax = header_str(REQUESTED_WITH_HEADER)
            .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false);
        let wants_json = header_str(header::ACCEPT.as_str())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);
        Ok(RequestContext {
            background: ajax || wants_json,
            referer: header_str(header::REFERER.as_str()),
        })
    }
}

/// Request body as a `RequestPayload`: JSON object, urlencoded form or multipart (file parts
/// become uploads). An empty body yields an empty payload.
#[derive(Clone, Debug, Default)]
pub struct ResourcePayload(pub RequestPayload);

#[async_trait]
impl<S> FromRequest<S> for ResourcePayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?;
            return read_multipart(multipart).await.map(ResourcePayload);
        }
        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid form body: {}", e)))?;
            let fields = form.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            return Ok(ResourcePayload(RequestPayload::from_fields(fields)));
        }
        if content_type.starts_with("application/json") {
            let Json(body) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
            return match body {
                Value::Object(fields) => Ok(ResourcePayload(RequestPayload::from_fields(fields))),
                _ => Err(AppError::BadRequest("body must be a JSON object".into())),
            };
        }
        Ok(ResourcePayload(RequestPayload::from_fields(Map::new())))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<RequestPayload, AppError> {
    let mut payload = RequestPayload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart field: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else { continue };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("could not read field {}: {}", name, e)))?;
        match file_name {
            Some(file_name) => {
                payload.files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes: data.to_vec(),
                    },
                );
            }
            None => {
                let text = String::from_utf8_lossy(&data).into_owned();
                payload.fields.insert(name, Value::String(text));
            }
        }
    }
    Ok(payload)
}
