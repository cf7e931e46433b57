//! OCR result cache
//!
//! Maps source image URLs to their computed blocks, persisted as one JSON
//! file. See [`CacheStore`].

mod store;
mod types;

pub use store::CacheStore;
pub use types::{CacheEntry, CacheIoError};
