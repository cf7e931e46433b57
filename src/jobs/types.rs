//! Chapter job types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fetch::{Credentials, FetchError};
use crate::pipeline::PipelineError;

/// Start a background traversal of `base_url + 0`, `base_url + 1`, ...
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub base_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub context: String,
}

/// Lifecycle of a chapter job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
}

/// Registry view of a job (credentials are never exposed)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub base_url: String,
    pub context: String,
    pub status: JobStatus,
    /// Index that will be appended to `base_url` next
    pub next_page: u64,
    pub pages_processed: u64,
    pub pages_succeeded: u64,
    pub consecutive_errors: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(request: &JobRequest, start_index: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            base_url: request.base_url.clone(),
            context: request.context.clone(),
            status: JobStatus::Queued,
            next_page: start_index,
            pages_processed: 0,
            pages_succeeded: 0,
            consecutive_errors: 0,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, JobStatus::Queued | JobStatus::Running)
    }
}

/// Traversal tuning
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// First page index appended to the base URL
    pub start_index: u64,
    /// Consecutive failures that end the chapter
    pub error_threshold: u32,
    /// Pause between pages
    pub delay: Duration,
    /// Upper bound for one page's fetch + OCR
    pub page_timeout: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            start_index: 0,
            error_threshold: 3,
            delay: Duration::from_millis(500),
            page_timeout: Duration::from_secs(60),
        }
    }
}

/// Failure of a single page probe; counted, never surfaced
#[derive(Debug, thiserror::Error)]
pub enum JobIterationError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Page fetch failed: {0}")]
    Fetch(String),

    #[error("OCR failed: {0}")]
    Engine(String),

    #[error("Page timed out after {0} seconds")]
    Timeout(u64),
}

impl From<PipelineError> for JobIterationError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Fetch(FetchError::NotFound(url)) => Self::NotFound(url),
            PipelineError::Fetch(e) => Self::Fetch(e.to_string()),
            PipelineError::Engine(e) => Self::Engine(e.to_string()),
        }
    }
}
