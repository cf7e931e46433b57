//! OCR routes
//!
//! GET /ocr?url=...&user=...&pass=...&context=... answers with the text
//! blocks for one image, from cache when possible.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::fetch::Credentials;
use crate::ocr::Block;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ocr", get(ocr_image))
}

/// Query parameters for an OCR request
#[derive(Debug, Deserialize)]
pub struct OcrQuery {
    pub url: Option<String>,
    /// HTTP Basic username for the image host
    pub user: Option<String>,
    pub pass: Option<String>,
    /// Free-form label stored next to the result (usually a chapter title)
    #[serde(default)]
    pub context: String,
}

async fn ocr_image(
    State(state): State<AppState>,
    Query(query): Query<OcrQuery>,
) -> Result<Json<Vec<Block>>> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'url' query parameter".to_string()))?;
    let credentials = Credentials::from_parts(query.user, query.pass);

    let blocks = state
        .pipeline()
        .resolve(&url, credentials.as_ref(), &query.context)
        .await?;

    Ok(Json(blocks))
}
