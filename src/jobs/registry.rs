//! Job Registry
//!
//! In-memory record of every chapter job started since process start.
//! Nothing caps how many jobs may be active at once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{Job, JobStatus};

/// Shared job registry
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id, job);
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).cloned()
    }

    /// All jobs, oldest first
    pub async fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut list: Vec<Job> = jobs.values().cloned().collect();
        list.sort_by_key(|j| j.created_at);
        list
    }

    /// Jobs that are queued or running
    pub async fn active_count(&self) -> usize {
        let jobs = self.jobs.read().await;
        jobs.values().filter(|j| j.is_active()).count()
    }

    pub async fn mark_running(&self, id: Uuid) {
        self.update(id, |job| job.status = JobStatus::Running).await;
    }

    /// Record the outcome of one page probe
    pub async fn record_page(
        &self,
        id: Uuid,
        succeeded: bool,
        next_page: u64,
        consecutive_errors: u32,
    ) {
        self.update(id, |job| {
            job.pages_processed += 1;
            if succeeded {
                job.pages_succeeded += 1;
            }
            job.next_page = next_page;
            job.consecutive_errors = consecutive_errors;
        })
        .await;
    }

    pub async fn finish(&self, id: Uuid) {
        self.update(id, |job| {
            job.status = JobStatus::Done;
            job.finished_at = Some(Utc::now());
        })
        .await;
    }

    async fn update(&self, id: Uuid, apply: impl FnOnce(&mut Job)) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            apply(job);
        }
    }
}
