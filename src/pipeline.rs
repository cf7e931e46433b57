//! Per-image request path
//!
//! cache lookup → fetch → tile + OCR + cluster → cache write. Both the HTTP
//! handler and chapter jobs go through [`OcrPipeline::resolve`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::{CacheEntry, CacheStore};
use crate::fetch::{Credentials, FetchError, ImageSource};
use crate::ocr::{Block, EngineError};
use crate::tiler::Tiler;

/// Errors that abort a single image request
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Shared OCR request path
pub struct OcrPipeline {
    cache: CacheStore,
    source: Arc<dyn ImageSource>,
    tiler: Tiler,
    requests_processed: AtomicU64,
}

impl OcrPipeline {
    pub fn new(cache: CacheStore, source: Arc<dyn ImageSource>, tiler: Tiler) -> Self {
        Self {
            cache,
            source,
            tiler,
            requests_processed: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Number of image requests answered so far (hits and misses)
    pub fn requests_processed(&self) -> u64 {
        self.requests_processed.load(Ordering::Relaxed)
    }

    /// Blocks for the image at `url`, computing and caching them on a miss
    ///
    /// Concurrent misses for the same URL are not coalesced: each one runs
    /// the full fetch and OCR path and writes the cache.
    pub async fn resolve(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
        context: &str,
    ) -> Result<Vec<Block>, PipelineError> {
        if let Some(entry) = self.cache.get(url).await {
            tracing::debug!(url = %url, blocks = entry.data.len(), "Cache hit");
            self.requests_processed.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.data);
        }

        let image = self.source.fetch(url, credentials).await?;
        let blocks = self.tiler.process(&image).await?;

        tracing::info!(
            url = %url,
            bytes = image.len(),
            blocks = blocks.len(),
            "OCR complete"
        );

        self.cache
            .set(url, CacheEntry::new(context, blocks.clone()))
            .await;
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        Ok(blocks)
    }
}
