//! Image tiling
//!
//! The OCR engine only handles images up to a fixed height. Taller pages
//! (long-strip webtoons) are cut into horizontal strips, each strip is run
//! through the engine and the clustering pass on its own, and the resulting
//! block coordinates are mapped back onto the whole image.
//!
//! Blocks that straddle a strip boundary stay split in two.

use std::sync::Arc;

use image::DynamicImage;

use crate::clustering::{cluster_lines, ClusteringConfig};
use crate::ocr::{Block, EngineError, OcrEngine};

/// Default max strip height in pixels
pub const MAX_CHUNK_HEIGHT: u32 = 3000;

/// One horizontal strip of the source image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpan {
    pub y_offset: u32,
    pub height: u32,
}

impl TileSpan {
    pub fn end(&self) -> u32 {
        self.y_offset + self.height
    }

    /// Map a block from strip-relative to image-relative coordinates
    ///
    /// Strips only split vertically, so x and width are unchanged.
    pub fn remap(&self, mut block: Block, image_height: u32) -> Block {
        let full = f64::from(image_height);
        let chunk = f64::from(self.height);
        block.bbox.y = (block.bbox.y * chunk + f64::from(self.y_offset)) / full;
        block.bbox.height = block.bbox.height * chunk / full;
        block
    }
}

/// Contiguous strips covering `[0, image_height)`
pub fn plan_tiles(image_height: u32, max_chunk_height: u32) -> Vec<TileSpan> {
    let max = max_chunk_height.max(1);
    if image_height <= max {
        return vec![TileSpan {
            y_offset: 0,
            height: image_height,
        }];
    }

    let mut spans = Vec::with_capacity((image_height / max + 1) as usize);
    let mut y_offset = 0;
    while y_offset < image_height {
        let height = max.min(image_height - y_offset);
        spans.push(TileSpan { y_offset, height });
        y_offset += height;
    }
    spans
}

/// Runs OCR and clustering over a whole image, strip by strip
pub struct Tiler {
    engine: Arc<dyn OcrEngine>,
    clustering: ClusteringConfig,
    max_chunk_height: u32,
}

impl Tiler {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        clustering: ClusteringConfig,
        max_chunk_height: u32,
    ) -> Self {
        Self {
            engine,
            clustering,
            max_chunk_height,
        }
    }

    /// Produce the blocks for an encoded image, top to bottom
    ///
    /// Any engine failure aborts the whole image; strips after the failing
    /// one are never sent.
    pub async fn process(&self, image_data: &[u8]) -> Result<Vec<Block>, EngineError> {
        let data = image_data.to_vec();
        let img = tokio::task::spawn_blocking(move || image::load_from_memory(&data))
            .await
            .map_err(|e| EngineError::Image(format!("Task join error: {}", e)))?
            .map_err(|e| EngineError::Image(format!("Failed to decode image: {}", e)))?;

        let (width, height) = (img.width(), img.height());
        let spans = plan_tiles(height, self.max_chunk_height);

        tracing::debug!(
            engine = self.engine.name(),
            width,
            height,
            tiles = spans.len(),
            "Processing image"
        );

        if spans.len() == 1 {
            let lines = self.engine.detect(image_data).await?;
            return Ok(cluster_lines(&lines, width, height, &self.clustering));
        }

        let img = Arc::new(img);
        let mut blocks = Vec::new();
        for span in spans {
            let strip = encode_strip(Arc::clone(&img), span).await?;
            let lines = self.engine.detect(&strip).await?;
            let strip_blocks = cluster_lines(&lines, width, span.height, &self.clustering);

            tracing::debug!(
                y_offset = span.y_offset,
                height = span.height,
                lines = lines.len(),
                blocks = strip_blocks.len(),
                "Processed strip"
            );

            blocks.extend(strip_blocks.into_iter().map(|b| span.remap(b, height)));
        }

        Ok(blocks)
    }
}

/// Crop one strip and encode it as PNG
async fn encode_strip(img: Arc<DynamicImage>, span: TileSpan) -> Result<Vec<u8>, EngineError> {
    tokio::task::spawn_blocking(move || {
        let strip = img.crop_imm(0, span.y_offset, img.width(), span.height);
        let mut buffer = Vec::new();
        strip
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .map_err(|e| EngineError::Image(format!("Failed to encode strip: {}", e)))?;
        Ok(buffer)
    })
    .await
    .map_err(|e| EngineError::Image(format!("Task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{BoundingBox, MockEngine, RawLine};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn one_line_engine() -> MockEngine {
        MockEngine::new(vec![RawLine::new(
            "line",
            BoundingBox::new(0.1, 0.5, 0.2, 0.1),
        )])
    }

    #[test]
    fn test_short_image_single_tile() {
        for height in [1, 1200, 3000] {
            let spans = plan_tiles(height, MAX_CHUNK_HEIGHT);
            assert_eq!(spans, vec![TileSpan { y_offset: 0, height }]);
        }
    }

    #[test]
    fn test_tall_image_tiles_cover_exactly() {
        for height in [3001, 6000, 7000, 9001, 12345] {
            let spans = plan_tiles(height, MAX_CHUNK_HEIGHT);
            assert!(spans.len() > 1);
            assert_eq!(spans[0].y_offset, 0);
            for pair in spans.windows(2) {
                assert_eq!(pair[0].end(), pair[1].y_offset);
            }
            assert_eq!(spans.last().unwrap().end(), height);
            assert!(spans.iter().all(|s| s.height > 0 && s.height <= MAX_CHUNK_HEIGHT));
        }
    }

    #[test]
    fn test_remap_coordinates() {
        let span = TileSpan {
            y_offset: 3000,
            height: 1000,
        };
        let block = Block::from(RawLine::new("x", BoundingBox::new(0.3, 0.5, 0.2, 0.1)));

        let remapped = span.remap(block, 7000);
        assert!((remapped.bbox.y - (0.5 * 1000.0 + 3000.0) / 7000.0).abs() < 1e-12);
        assert!((remapped.bbox.height - 100.0 / 7000.0).abs() < 1e-12);
        assert_eq!(remapped.bbox.x, 0.3);
        assert_eq!(remapped.bbox.width, 0.2);
    }

    #[test]
    fn test_full_height_blocks_reassemble_image() {
        let height = 7500;
        let spans = plan_tiles(height, MAX_CHUNK_HEIGHT);
        let total: f64 = spans
            .iter()
            .map(|span| {
                let block = Block::from(RawLine::new("x", BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
                span.remap(block, height).bbox.height
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_process_short_image_calls_engine_once() {
        let engine = Arc::new(one_line_engine());
        let tiler = Tiler::new(engine.clone(), ClusteringConfig::default(), MAX_CHUNK_HEIGHT);

        let blocks = tiler.process(&png(200, 2000)).await.unwrap();

        assert_eq!(engine.call_count(), 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bbox, BoundingBox::new(0.1, 0.5, 0.2, 0.1));
    }

    #[tokio::test]
    async fn test_process_tall_image_remaps_in_order() {
        let engine = Arc::new(one_line_engine());
        let tiler = Tiler::new(engine.clone(), ClusteringConfig::default(), MAX_CHUNK_HEIGHT);

        let blocks = tiler.process(&png(50, 7000)).await.unwrap();

        assert_eq!(engine.call_count(), 3);
        assert_eq!(blocks.len(), 3);
        let expected_y = [
            (0.5 * 3000.0) / 7000.0,
            (0.5 * 3000.0 + 3000.0) / 7000.0,
            (0.5 * 1000.0 + 6000.0) / 7000.0,
        ];
        for (block, y) in blocks.iter().zip(expected_y) {
            assert!((block.bbox.y - y).abs() < 1e-9);
        }
        assert!(blocks.windows(2).all(|w| w[0].bbox.y < w[1].bbox.y));
    }

    #[tokio::test]
    async fn test_engine_failure_aborts_remaining_strips() {
        let mut engine = one_line_engine();
        engine.fail_on_call = Some(1);
        let engine = Arc::new(engine);
        let tiler = Tiler::new(engine.clone(), ClusteringConfig::default(), MAX_CHUNK_HEIGHT);

        let result = tiler.process(&png(50, 9500)).await;

        assert!(result.is_err());
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_image_is_rejected() {
        let engine = Arc::new(one_line_engine());
        let tiler = Tiler::new(engine.clone(), ClusteringConfig::default(), MAX_CHUNK_HEIGHT);

        let result = tiler.process(b"not an image").await;

        assert!(matches!(result, Err(EngineError::Image(_))));
        assert_eq!(engine.call_count(), 0);
    }
}
