//! Object upload and retrieval handlers.

use crate::error::AppError;
use crate::storage::{ObjectStorage, UrlOptions, DEFAULT_URL_EXPIRY};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub type StorageState = Arc<dyn ObjectStorage>;

/// POST /objects: multipart form with a `file` field.
pub async fn upload(
    State(storage): State<StorageState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::BadRequest(e.body_text())
            }
        })?;
        let size = data.len();
        let name = storage.store(data.to_vec(), &filename, content_type.as_deref()).await?;
        tracing::info!(object = %name, size, "object uploaded");
        return Ok((StatusCode::CREATED, Json(json!({ "name": name, "size": size }))));
    }
    Err(AppError::BadRequest("missing 'file' field in multipart body".into()))
}

/// GET /objects/{name}: raw bytes.
pub async fn download(
    State(storage): State<StorageState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = storage.retrieve(&name).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

#[derive(Debug, Default, Deserialize)]
pub struct UrlParams {
    pub presigned: Option<bool>,
    pub expiry_secs: Option<u64>,
}

/// GET /objects/{name}/url
pub async fn url(
    State(storage): State<StorageState>,
    Path(name): Path<String>,
    Query(params): Query<UrlParams>,
) -> Result<impl IntoResponse, AppError> {
    let options = UrlOptions {
        presigned: params.presigned.unwrap_or(true),
        expiry: params.expiry_secs.map(Duration::from_secs).unwrap_or(DEFAULT_URL_EXPIRY),
    };
    let url = storage.url_for(&name, options).await?;
    Ok(Json(json!({ "name": name, "url": url })))
}
