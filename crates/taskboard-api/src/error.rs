//! API error types.

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use taskboard_models::ModelError;
use taskboard_queue::{ErrorKind, QueueError};
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

static HIDE_INTERNAL_DETAIL: OnceLock<bool> = OnceLock::new();

/// Replace internal error detail with a generic message in responses.
///
/// Only the first call takes effect.
pub fn hide_internal_detail(hide: bool) {
    let _ = HIDE_INTERNAL_DETAIL.set(hide);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        Self::Queue(QueueError::from(e))
    }
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Queue(QueueError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Queue(e) => match e.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Decode => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Store | ErrorKind::StartupFatal => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = if self.is_internal() {
            error!(status = status.as_u16(), error = %self, "Request failed");
            if HIDE_INTERNAL_DETAIL.get().copied().unwrap_or(false) {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
