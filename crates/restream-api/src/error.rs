//! API error types.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use restream_models::{ModelError, StreamResponse};
use restream_worker::WorkerError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

static HIDE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Replace internal error messages with a generic one, set in production.
pub fn hide_internal_details(hide: bool) {
    HIDE_INTERNAL_DETAILS.store(hide, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    Worker(#[from] WorkerError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Model(_) => StatusCode::BAD_REQUEST,
            ApiError::Worker(WorkerError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Worker(WorkerError::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let message = if self.is_internal() {
            tracing::error!("Request failed: {}", self);
            if HIDE_INTERNAL_DETAILS.load(Ordering::Relaxed) {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        (status, Json(StreamResponse::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restream_models::StreamKey;

    #[test]
    fn test_status_codes() {
        let key = StreamKey::derive("x");
        assert_eq!(
            ApiError::bad_request("missing").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ModelError::EmptySpecifier).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WorkerError::NotFound(key.clone())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WorkerError::AlreadyExists(key.clone())).status_code(),
            StatusCode::CONFLICT
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ApiError::from(WorkerError::artifacts(&key, io)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden_in_production() {
        let key = StreamKey::derive("x");
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied /srv/hls");

        hide_internal_details(true);
        let response = ApiError::from(WorkerError::artifacts(&key, io)).into_response();
        hide_internal_details(false);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("An internal error occurred"));
        assert!(!body.contains("/srv/hls"));
    }
}
