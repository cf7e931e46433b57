//! OCR Engines
//!
//! Defines the engine trait and the HTTP client for the external detection
//! service. The engine itself is a black box: image bytes in, per-line
//! detections out.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{EngineError, EngineLine, RawLine};

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Human-readable engine name for logs
    fn name(&self) -> &str;

    /// Detect text lines in an encoded image
    async fn detect(&self, image_data: &[u8]) -> Result<Vec<RawLine>, EngineError>;
}

/// Engine reached over HTTP
///
/// Posts `{"image": "<base64>"}` and expects a JSON array of
/// `{text, boundingBox:{centerX,centerY,percentWidth,percentHeight}}`.
pub struct HttpOcrEngine {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpOcrEngine {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn detect(&self, image_data: &[u8]) -> Result<Vec<RawLine>, EngineError> {
        use base64::Engine;

        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);
        let request = serde_json::json!({ "image": image_base64 });

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(self.timeout.as_secs())
                } else {
                    EngineError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        let lines: Vec<EngineLine> = response
            .json()
            .await
            .map_err(|e| EngineError::Malformed(e.to_string()))?;

        Ok(lines.into_iter().map(RawLine::from).collect())
    }
}

/// Mock engine for testing
///
/// Returns the same detections on every call and counts invocations.
/// `fail_on_call` makes the n-th call (0-based) return an error.
#[cfg(test)]
pub struct MockEngine {
    pub lines: Vec<RawLine>,
    pub fail_on_call: Option<usize>,
    pub calls: std::sync::atomic::AtomicUsize,
    pub delay: Option<Duration>,
}

#[cfg(test)]
impl MockEngine {
    pub fn new(lines: Vec<RawLine>) -> Self {
        Self {
            lines,
            fail_on_call: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect(&self, _image_data: &[u8]) -> Result<Vec<RawLine>, EngineError> {
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(EngineError::Malformed("mock failure".to_string()));
        }
        Ok(self.lines.clone())
    }
}
