//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use atci_queue::QueueError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration missing: {0}")]
    ConfigMissing(#[from] atci_models::ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] atci_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] atci_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

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

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ConfigMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Queue(QueueError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Queue(QueueError::SetMismatch) => StatusCode::BAD_REQUEST,
            ApiError::Queue(QueueError::NotProcessing) => StatusCode::CONFLICT,
            ApiError::Media(atci_media::MediaError::ToolNotFound { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Queue(_)
            | ApiError::Store(_)
            | ApiError::Media(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Queue(QueueError::SetMismatch).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ConfigMissing(atci_models::ConfigError::NoWatchDirectories).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
