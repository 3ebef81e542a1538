//! Handlers shared by every generated resource. Each route closes over its own `ResourceState`.

use crate::error::AppError;
use crate::extractors::ScopeFilter;
use crate::service::{CrudService, RequestContext};
use crate::state::ResourceState;
use crate::store::Document;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))
}

fn body_to_map(payload: Result<Json<Value>, JsonRejection>) -> Result<Document, AppError> {
    let Json(value) = payload.map_err(|rej| {
        if rej.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::BadRequest(rej.body_text())
        }
    })?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn read_one(
    State(res): State<Arc<ResourceState>>,
    ScopeFilter(scope): ScopeFilter,
    Path(id_str): Path<String>,
) -> Result<Json<Document>, AppError> {
    let ctx = RequestContext::new(scope).with_id(parse_id(&id_str)?);
    Ok(Json(CrudService::read_one(&res, &ctx).await?))
}

pub async fn read_many(
    State(res): State<Arc<ResourceState>>,
    ScopeFilter(scope): ScopeFilter,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Document>>, AppError> {
    let rows = CrudService::read_many(&res, RequestContext::new(scope), &params).await?;
    Ok(Json(rows))
}

pub async fn create(
    State(res): State<Arc<ResourceState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let body = body_to_map(payload)?;
    let created = CrudService::create(&res, &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(res): State<Arc<ResourceState>>,
    ScopeFilter(scope): ScopeFilter,
    Path(id_str): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(scope).with_id(parse_id(&id_str)?);
    let body = body_to_map(payload)?;
    CrudService::update(&res, &ctx, &body).await?;
    Ok(Json(json!({})))
}

pub async fn delete(
    State(res): State<Arc<ResourceState>>,
    ScopeFilter(scope): ScopeFilter,
    Path(id_str): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id_str)?;
    CrudService::delete(&res, &RequestContext::new(scope).with_id(id)).await?;
    Ok(Json(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id("1.5"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(body_to_map(Ok(Json(json!({"a": 1})))).is_ok());
        assert!(matches!(body_to_map(Ok(Json(json!([1, 2])))), Err(AppError::BadRequest(_))));
    }
}
