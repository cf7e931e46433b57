//! Server status route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub items_cached: usize,
    pub requests_processed: u64,
    pub active_jobs: usize,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        items_cached: state.cache().len().await,
        requests_processed: state.pipeline().requests_processed(),
        active_jobs: state.jobs().registry().active_count().await,
    })
}
