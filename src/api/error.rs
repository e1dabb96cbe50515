use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::db::StoreError;
use crate::resource::FieldError;
use crate::services::image::ImageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// One or more fields failed validation.
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// A single body-field validation error.
    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::body(field, msg)])
    }

    /// Maps a duplicate-key failure to a field error on `field`.
    pub fn from_store(err: StoreError, field: &str, not_found: &str) -> Self {
        match err {
            StoreError::Duplicate => Self::field(field, "already exists"),
            StoreError::NotFound => Self::not_found(not_found),
            other => other.into(),
        }
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::bad_request("already exists"),
            StoreError::NotFound => Self::not_found("Not found"),
            StoreError::Db(e) => Self::Internal(e.to_string()),
            StoreError::Other(e) => Self::Internal(format!("{e:#}")),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Rejected { message, .. } => Self::field("image", message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            Self::NotFound(msg) => error_body(StatusCode::NOT_FOUND, &msg),
            Self::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            Self::Unauthorized(msg) => error_body(StatusCode::UNAUTHORIZED, &msg),
            Self::Forbidden(msg) => error_body(StatusCode::FORBIDDEN, &msg),
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn error_body(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}
