//! URL-keyed OCR result cache
//!
//! The whole map lives in memory and is written to a single JSON file after
//! every mutation. The in-memory map is authoritative: disk failures are
//! logged and otherwise ignored.
//!
//! There is no single-flight protection. Two requests for the same uncached
//! URL both compute and both call [`CacheStore::set`]; the last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::types::{CacheEntry, CacheIoError, StoredValue};

/// Thread-safe OCR result cache
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<CacheStoreInner>,
}

struct CacheStoreInner {
    /// Backing file (None = memory only)
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Serializes file writes so snapshots land in order
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Create a cache that never touches disk
    pub fn in_memory() -> Self {
        Self::with_entries(None, HashMap::new())
    }

    /// Load the cache file at `path`
    ///
    /// A missing or unreadable file yields an empty cache.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match decode_entries(&bytes) {
                Ok(entries) => {
                    tracing::info!(
                        path = %path.display(),
                        count = entries.len(),
                        "Loaded OCR cache"
                    );
                    entries
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Ignoring corrupt cache file: {}", e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No cache file yet, starting empty");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read cache file: {}", e);
                HashMap::new()
            }
        };

        Self::with_entries(Some(path), entries)
    }

    fn with_entries(path: Option<PathBuf>, entries: HashMap<String, CacheEntry>) -> Self {
        Self {
            inner: Arc::new(CacheStoreInner {
                path,
                entries: RwLock::new(entries),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Backing file path, if any
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub async fn get(&self, url: &str) -> Option<CacheEntry> {
        let entries = self.inner.entries.read().await;
        entries.get(url).cloned()
    }

    pub async fn has(&self, url: &str) -> bool {
        let entries = self.inner.entries.read().await;
        entries.contains_key(url)
    }

    /// Insert or replace an entry, then persist
    pub async fn set(&self, url: impl Into<String>, entry: CacheEntry) {
        {
            let mut entries = self.inner.entries.write().await;
            entries.insert(url.into(), entry);
        }
        self.persist().await;
    }

    /// Add entries whose keys are not cached yet
    ///
    /// Existing keys are left untouched. Returns the number of entries added;
    /// the file is only rewritten when that number is non-zero.
    pub async fn merge(&self, foreign: HashMap<String, CacheEntry>) -> usize {
        let added = {
            let mut entries = self.inner.entries.write().await;
            let mut added = 0;
            for (url, entry) in foreign {
                if let std::collections::hash_map::Entry::Vacant(slot) = entries.entry(url) {
                    slot.insert(entry);
                    added += 1;
                }
            }
            added
        };

        if added > 0 {
            tracing::info!(added = added, "Merged imported cache entries");
            self.persist().await;
        }

        added
    }

    /// Remove every entry and persist the empty map
    ///
    /// Returns the number of entries removed.
    pub async fn purge(&self) -> usize {
        let removed = {
            let mut entries = self.inner.entries.write().await;
            let removed = entries.len();
            entries.clear();
            removed
        };

        tracing::info!(removed = removed, "Purged OCR cache");
        self.persist().await;
        removed
    }

    pub async fn len(&self) -> usize {
        let entries = self.inner.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let entries = self.inner.entries.read().await;
        entries.is_empty()
    }

    /// Bytes of the cache file as stored on disk
    ///
    /// Falls back to serializing the in-memory map when nothing has been
    /// written yet.
    pub async fn export_bytes(&self) -> Result<Vec<u8>, CacheIoError> {
        if let Some(path) = &self.inner.path {
            let _guard = self.inner.write_lock.lock().await;
            match tokio::fs::read(path).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.snapshot().await
    }

    /// Parse an uploaded cache file into canonical entries
    pub fn decode(bytes: &[u8]) -> Result<HashMap<String, CacheEntry>, CacheIoError> {
        decode_entries(bytes)
    }

    async fn snapshot(&self) -> Result<Vec<u8>, CacheIoError> {
        let entries = self.inner.entries.read().await;
        Ok(serde_json::to_vec(&*entries)?)
    }

    /// Write the full map to disk, logging failures
    async fn persist(&self) {
        let Some(path) = &self.inner.path else {
            return;
        };

        let _guard = self.inner.write_lock.lock().await;
        if let Err(e) = self.write_file(path).await {
            tracing::warn!(path = %path.display(), "Failed to persist OCR cache: {}", e);
        }
    }

    async fn write_file(&self, path: &Path) -> Result<(), CacheIoError> {
        let bytes = self.snapshot().await?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        // A crash mid-write leaves the previous file in place
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Sibling path used while a new cache file is being written
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Decode a cache file, normalizing legacy values
///
/// Entries that match neither shape are skipped.
fn decode_entries(bytes: &[u8]) -> Result<HashMap<String, CacheEntry>, CacheIoError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let serde_json::Value::Object(map) = value else {
        return Err(CacheIoError::NotAnObject);
    };

    let mut entries = HashMap::with_capacity(map.len());
    for (url, raw) in map {
        match serde_json::from_value::<StoredValue>(raw) {
            Ok(stored) => {
                entries.insert(url, CacheEntry::from(stored));
            }
            Err(e) => {
                tracing::warn!(url = %url, "Skipping unreadable cache entry: {}", e);
            }
        }
    }

    Ok(entries)
}
