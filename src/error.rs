//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised while turning model declarations into routes. Fatal for the affected resource only.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("model load: {0}")]
    Load(String),
}

impl GenerationError {
    pub(crate) fn invalid(model: &str, reason: impl Into<String>) -> Self {
        GenerationError::InvalidModel {
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}

/// Malformed environment settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{key}: expected {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Failures reported by a persistence adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("lock poisoned: {0}")]
    Lock(&'static str),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("backend: {0}")]
    Backend(String),
}

/// Failures reported by an object-storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object name: {0}")]
    InvalidName(String),
    #[error("presign: {0}")]
    Presign(String),
    #[error("backend: {0}")]
    Backend(String),
}

/// One rejected field of an inbound payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// All violations found while validating one payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldViolation>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| format!("{} {}", v.field, v.message)).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Per-request failures. Never fatal to the process.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(ValidationErrors),
    #[error("id allocation: {0}")]
    Allocation(StoreError),
    #[error("adapter: {0}")]
    Adapter(#[from] StoreError),
    #[error("object storage: {0}")]
    Storage(#[from] StorageError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request body too large")]
    PayloadTooLarge,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Allocation(_) => (StatusCode::SERVICE_UNAVAILABLE, "allocation_error"),
            AppError::Adapter(_) => (StatusCode::INTERNAL_SERVER_ERROR, "adapter_error"),
            AppError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Storage(StorageError::InvalidName(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        let details = match &self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
