//! OCR Types
//!
//! Line detections as reported by the OCR engine, and the text blocks this
//! server produces from them.

use serde::{Deserialize, Serialize};

/// Normalized rectangle (0-1 fractions of the image, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Smallest box containing both `self` and `other`
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Clip the box into the unit square
    pub fn clamped(&self) -> BoundingBox {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        let right = self.right().clamp(0.0, 1.0);
        let bottom = self.bottom().clamp(0.0, 1.0);
        BoundingBox::new(x, y, (right - x).max(0.0), (bottom - y).max(0.0))
    }
}

/// One text line detected by the OCR engine, in top-left form
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub text: String,
    pub bbox: BoundingBox,
}

impl RawLine {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Center-based box used on the engine wire format
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineBox {
    pub center_x: f64,
    pub center_y: f64,
    pub percent_width: f64,
    pub percent_height: f64,
}

/// Line detection exactly as the OCR engine returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineLine {
    pub text: String,
    pub bounding_box: EngineBox,
}

impl From<EngineLine> for RawLine {
    fn from(line: EngineLine) -> Self {
        let b = line.bounding_box;
        let bbox = BoundingBox::new(
            b.center_x - b.percent_width / 2.0,
            b.center_y - b.percent_height / 2.0,
            b.percent_width,
            b.percent_height,
        );
        RawLine {
            text: line.text,
            bbox: bbox.clamped(),
        }
    }
}

/// Reading orientation of a merged block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Output unit: text plus its normalized bounding box
///
/// A block without `is_merged` is a single detection passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub text: String,
    #[serde(rename = "tightBoundingBox")]
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_merged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_orientation: Option<Orientation>,
}

impl From<RawLine> for Block {
    fn from(line: RawLine) -> Self {
        Block {
            text: line.text,
            bbox: line.bbox,
            is_merged: None,
            forced_orientation: None,
        }
    }
}

impl From<&Block> for RawLine {
    fn from(block: &Block) -> Self {
        RawLine::new(block.text.clone(), block.bbox)
    }
}

/// OCR engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("OCR engine request failed: {0}")]
    Request(String),

    #[error("OCR engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OCR engine returned malformed data: {0}")]
    Malformed(String),

    #[error("Failed to prepare image: {0}")]
    Image(String),

    #[error("OCR engine timed out after {0} seconds")]
    Timeout(u64),
}
