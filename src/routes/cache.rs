//! Cache management routes
//!
//! - POST /purge-cache - Drop every cached result
//! - GET /export-cache - Download the cache file
//! - POST /import-cache - Merge a cache file (multipart `file` field or raw JSON body)

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::cache::CacheStore;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Largest cache file accepted by import
const MAX_IMPORT_SIZE: usize = 256 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/purge-cache", post(purge_cache))
        .route("/export-cache", get(export_cache))
        .route(
            "/import-cache",
            post(import_cache).layer(DefaultBodyLimit::max(MAX_IMPORT_SIZE)),
        )
}

#[derive(Serialize)]
struct PurgeResponse {
    removed: usize,
}

#[derive(Serialize)]
struct ImportResponse {
    added: usize,
}

async fn purge_cache(State(state): State<AppState>) -> Json<PurgeResponse> {
    let removed = state.cache().purge().await;
    tracing::info!(removed = removed, "Purged cache");
    Json(PurgeResponse { removed })
}

async fn export_cache(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let bytes = state.cache().export_bytes().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ocr-cache.json\"",
            ),
        ],
        bytes,
    ))
}

async fn import_cache(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ImportResponse>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let bytes = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;
        read_file_field(multipart).await?
    } else {
        axum::body::to_bytes(request.into_body(), MAX_IMPORT_SIZE)
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read body: {}", e)))?
    };

    let entries = CacheStore::decode(&bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid cache file: {}", e)))?;
    let offered = entries.len();
    let added = state.cache().merge(entries).await;

    tracing::info!(offered = offered, added = added, "Imported cache file");

    Ok(Json(ImportResponse { added }))
}

async fn read_file_field(mut multipart: Multipart) -> Result<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)));
        }
    }

    Err(AppError::BadRequest("Missing 'file' field".to_string()))
}
