//! Error types for the ScanLens server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheIoError;
use crate::fetch::FetchError;
use crate::ocr::EngineError;
use crate::pipeline::PipelineError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("OCR engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheIoError),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Fetch(e) => AppError::Fetch(e),
            PipelineError::Engine(e) => AppError::Engine(e),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Fetch(e) => {
                tracing::warn!("Fetch error: {}", e);
                match e {
                    FetchError::NotFound(url) => (
                        StatusCode::NOT_FOUND,
                        "image_not_found",
                        format!("Image not found: {}", url),
                    ),
                    FetchError::Timeout(_) => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "fetch_timeout",
                        e.to_string(),
                    ),
                    _ => (StatusCode::BAD_GATEWAY, "fetch_error", e.to_string()),
                }
            }
            AppError::Engine(e) => {
                tracing::error!("OCR engine error: {}", e);
                match e {
                    EngineError::Timeout(_) => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "engine_timeout",
                        e.to_string(),
                    ),
                    EngineError::Image(_) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "invalid_image",
                        e.to_string(),
                    ),
                    _ => (StatusCode::BAD_GATEWAY, "engine_error", e.to_string()),
                }
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cache_error",
                    "Cache error".to_string(),
                )
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
