//! OCR Module
//!
//! Boundary with the external OCR engine. The engine only reports independent
//! text lines; grouping them into blocks happens in [`crate::clustering`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scanlens_server::ocr::{HttpOcrEngine, OcrEngine};
//!
//! let engine = HttpOcrEngine::new("http://localhost:3033/detect", Duration::from_secs(30));
//! let lines = engine.detect(&png_bytes).await?;
//! ```

mod provider;
mod types;

pub use provider::{HttpOcrEngine, OcrEngine};
pub use types::{Block, BoundingBox, EngineBox, EngineError, EngineLine, Orientation, RawLine};

#[cfg(test)]
pub use provider::MockEngine;
