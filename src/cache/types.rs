//! Cache types

use serde::{Deserialize, Serialize};

use crate::ocr::Block;

/// Cached OCR result for one source image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Free-form label, typically the chapter or series the page belongs to
    #[serde(default)]
    pub context: String,
    pub data: Vec<Block>,
}

impl CacheEntry {
    pub fn new(context: impl Into<String>, data: Vec<Block>) -> Self {
        Self {
            context: context.into(),
            data,
        }
    }
}

/// Value shapes accepted from disk and imports
///
/// Older cache files stored the bare block list under each URL.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredValue {
    Entry(CacheEntry),
    Legacy(Vec<Block>),
}

impl From<StoredValue> for CacheEntry {
    fn from(value: StoredValue) -> Self {
        match value {
            StoredValue::Entry(entry) => entry,
            StoredValue::Legacy(data) => CacheEntry::new(String::new(), data),
        }
    }
}

/// Cache persistence errors
#[derive(Debug, thiserror::Error)]
pub enum CacheIoError {
    #[error("Cache file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cache file is not a JSON object")]
    NotAnObject,
}
