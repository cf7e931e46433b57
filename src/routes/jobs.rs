//! Chapter job routes
//!
//! - POST /preprocess-chapter - Start caching a whole chapter in the background
//! - GET /jobs - List every job started since boot
//! - GET /jobs/:id - Get one job

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::fetch::Credentials;
use crate::jobs::{Job, JobRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/preprocess-chapter", post(preprocess_chapter))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
}

/// Body of a preprocess request
///
/// Credentials may come as a nested object or as flat `user`/`pass`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessRequest {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    pub user: Option<String>,
    pub pass: Option<String>,
    #[serde(default)]
    pub context: String,
}

impl PreprocessRequest {
    fn into_job_request(self) -> JobRequest {
        let credentials = self
            .credentials
            .or_else(|| Credentials::from_parts(self.user, self.pass));
        JobRequest {
            base_url: self.base_url,
            credentials,
            context: self.context,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptedResponse {
    status: &'static str,
    job_id: Uuid,
}

async fn preprocess_chapter(
    State(state): State<AppState>,
    Json(body): Json<PreprocessRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    if body.base_url.trim().is_empty() {
        return Err(AppError::BadRequest("Missing 'baseUrl'".to_string()));
    }

    let job = state.jobs().start(body.into_job_request()).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            job_id: job.id,
        }),
    ))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.jobs().registry().list().await)
}

async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Job>> {
    state
        .jobs()
        .registry()
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
}
