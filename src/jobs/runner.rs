//! Chapter Job Runner
//!
//! Walks `base_url + N` for increasing N until a run of consecutive failures.
//! A chapter has no known length; the failure streak is the only end marker.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::registry::JobRegistry;
use super::types::{Job, JobIterationError, JobRequest, JobSettings};
use crate::fetch::Credentials;
use crate::pipeline::OcrPipeline;

/// What a job needs from the request path
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Whether the page already has a cached result
    async fn is_cached(&self, url: &str) -> bool;

    /// Fetch, OCR and cache one page
    async fn process(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
        context: &str,
    ) -> Result<(), JobIterationError>;
}

#[async_trait]
impl PageSource for OcrPipeline {
    async fn is_cached(&self, url: &str) -> bool {
        self.cache().has(url).await
    }

    async fn process(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
        context: &str,
    ) -> Result<(), JobIterationError> {
        self.resolve(url, credentials, context).await?;
        Ok(())
    }
}

/// Starts and drives chapter jobs
#[derive(Clone)]
pub struct JobRunner {
    inner: Arc<JobRunnerInner>,
}

struct JobRunnerInner {
    source: Arc<dyn PageSource>,
    registry: JobRegistry,
    settings: JobSettings,
}

impl JobRunner {
    pub fn new(source: Arc<dyn PageSource>, registry: JobRegistry, settings: JobSettings) -> Self {
        Self {
            inner: Arc::new(JobRunnerInner {
                source,
                registry,
                settings,
            }),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// Register a job and run it in the background
    ///
    /// Returns the queued job immediately; its outcome is only visible
    /// through the registry, the cache and the logs.
    pub async fn start(&self, request: JobRequest) -> Job {
        let job = self.enqueue(&request).await;
        let id = job.id;

        tracing::info!(
            job_id = %id,
            base_url = %request.base_url,
            context = %request.context,
            "Queued chapter job"
        );

        let runner = self.clone();
        tokio::spawn(async move {
            runner.run(id, request).await;
        });

        job
    }

    pub(crate) async fn enqueue(&self, request: &JobRequest) -> Job {
        let job = Job::new(request, self.inner.settings.start_index);
        self.inner.registry.insert(job.clone()).await;
        job
    }

    /// Traverse pages until `error_threshold` consecutive failures
    pub(crate) async fn run(&self, id: Uuid, request: JobRequest) {
        let settings = &self.inner.settings;
        let registry = &self.inner.registry;
        let threshold = settings.error_threshold.max(1);

        registry.mark_running(id).await;

        let mut page_index = settings.start_index;
        let mut consecutive_errors: u32 = 0;

        loop {
            let page_url = format!("{}{}", request.base_url, page_index);
            let outcome = self.probe(&page_url, &request).await;
            page_index += 1;

            let succeeded = match outcome {
                Ok(()) => {
                    consecutive_errors = 0;
                    tracing::debug!(job_id = %id, url = %page_url, "Page done");
                    true
                }
                Err(JobIterationError::NotFound(_)) => {
                    consecutive_errors += 1;
                    tracing::info!(
                        job_id = %id,
                        url = %page_url,
                        consecutive_errors = consecutive_errors,
                        "Page not found"
                    );
                    false
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        job_id = %id,
                        url = %page_url,
                        consecutive_errors = consecutive_errors,
                        "Page failed: {}",
                        e
                    );
                    false
                }
            };

            registry
                .record_page(id, succeeded, page_index, consecutive_errors)
                .await;

            if consecutive_errors >= threshold {
                break;
            }

            tokio::time::sleep(settings.delay).await;
        }

        registry.finish(id).await;

        if let Some(job) = registry.get(id).await {
            tracing::info!(
                job_id = %id,
                pages_processed = job.pages_processed,
                pages_succeeded = job.pages_succeeded,
                "Chapter job finished"
            );
        }
    }

    async fn probe(&self, page_url: &str, request: &JobRequest) -> Result<(), JobIterationError> {
        let source = &self.inner.source;
        if source.is_cached(page_url).await {
            return Ok(());
        }

        let timeout = self.inner.settings.page_timeout;
        match tokio::time::timeout(
            timeout,
            source.process(page_url, request.credentials.as_ref(), &request.context),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(JobIterationError::Timeout(timeout.as_secs())),
        }
    }
}
