//! Source image fetching
//!
//! Pages usually live on a reader backend that may require HTTP Basic
//! credentials, supplied per request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// HTTP Basic credentials for the image host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Build credentials from optional query parameters
    ///
    /// Returns None unless a username is present.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        username
            .filter(|u| !u.is_empty())
            .map(|username| Self { username, password })
    }
}

/// Image fetch errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Image host returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to fetch image: {0}")]
    Network(String),

    #[error("Image fetch timed out after {0} seconds")]
    Timeout(u64),
}

/// Where source images come from
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Fetches images over HTTP(S)
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url).timeout(self.timeout);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, creds.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout.as_secs())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout.as_secs())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        Ok(bytes.to_vec())
    }
}

/// In-memory image source for tests
///
/// Serves `image` for every URL except those listed in `missing`.
#[cfg(test)]
pub struct MockImageSource {
    pub image: Vec<u8>,
    pub missing: Vec<String>,
    pub calls: std::sync::Mutex<Vec<(String, Option<Credentials>)>>,
}

#[cfg(test)]
impl MockImageSource {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            missing: Vec::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl ImageSource for MockImageSource {
    async fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), credentials.cloned()));
        if self.missing.iter().any(|m| m == url) {
            return Err(FetchError::NotFound(url.to_string()));
        }
        Ok(self.image.clone())
    }
}
