//! Application state management

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::fetch::{HttpImageFetcher, ImageSource};
use crate::jobs::{JobRegistry, JobRunner};
use crate::ocr::{HttpOcrEngine, OcrEngine};
use crate::pipeline::OcrPipeline;
use crate::tiler::Tiler;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: Arc<OcrPipeline>,
    jobs: JobRunner,
}

impl AppState {
    /// Create application state backed by the HTTP engine and fetcher
    ///
    /// Loads the persisted cache from `config.cache.path`.
    pub async fn new(config: Config) -> Self {
        let cache = CacheStore::load(config.cache.path.clone()).await;
        let engine = HttpOcrEngine::new(
            &config.engine.url,
            Duration::from_secs(config.engine.timeout_secs),
        );
        let fetcher = HttpImageFetcher::new(Duration::from_secs(config.fetch.timeout_secs));

        Self::from_parts(config, cache, Arc::new(fetcher), Arc::new(engine))
    }

    /// Assemble state from explicit collaborators
    pub fn from_parts(
        config: Config,
        cache: CacheStore,
        source: Arc<dyn ImageSource>,
        engine: Arc<dyn OcrEngine>,
    ) -> Self {
        let tiler = Tiler::new(
            engine,
            config.clustering.clone(),
            config.tiler.max_chunk_height,
        );
        let pipeline = Arc::new(OcrPipeline::new(cache, source, tiler));
        let jobs = JobRunner::new(pipeline.clone(), JobRegistry::new(), config.jobs.settings());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                jobs,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the OCR request path
    pub fn pipeline(&self) -> &OcrPipeline {
        &self.inner.pipeline
    }

    /// Get the result cache
    pub fn cache(&self) -> &CacheStore {
        self.inner.pipeline.cache()
    }

    /// Get the chapter job runner
    pub fn jobs(&self) -> &JobRunner {
        &self.inner.jobs
    }
}
