//! Text block clustering
//!
//! The OCR engine reports every text line on its own. A three-line speech
//! bubble comes back as three detections; this module groups such lines into
//! a single block using font size, reading-direction gap and perpendicular
//! overlap, with a union-find over each window of lines.
//!
//! Everything here is synchronous and pure: no I/O, no shared state.

mod config;
mod union_find;

pub use config::ClusteringConfig;

use crate::ocr::{Block, BoundingBox, Orientation, RawLine};
use union_find::UnionFind;

/// Width of the normalized coordinate space (both axes use this scale)
const NORMALIZED_WIDTH: f64 = 1000.0;
/// Font size used when a window has no usable median
const FALLBACK_FONT_SIZE: f64 = 20.0;
/// Boundary marker between merged lines when spaces are disabled
const ZERO_WIDTH_SPACE: &str = "\u{200B}";

/// A line prepared for clustering
#[derive(Debug, Clone)]
struct ProcessedLine {
    original_index: usize,
    is_vertical: bool,
    font_size: f64,
    /// Box in normalized space
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    /// Vertical extent in true image pixels
    pixel_top: f64,
    pixel_bottom: f64,
}

impl ProcessedLine {
    fn new(original_index: usize, bbox: &BoundingBox, image_width: f64, image_height: f64) -> Self {
        let scale = NORMALIZED_WIDTH / image_width;
        let left = bbox.x * image_width * scale;
        let top = bbox.y * image_height * scale;
        let width = bbox.width * image_width * scale;
        let height = bbox.height * image_height * scale;
        let is_vertical = width <= height;

        Self {
            original_index,
            is_vertical,
            font_size: if is_vertical { width } else { height },
            left,
            top,
            right: left + width,
            bottom: top + height,
            pixel_top: bbox.y * image_height,
            pixel_bottom: bbox.bottom() * image_height,
        }
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Font statistics for one orientation within a window
#[derive(Debug, Clone, Copy)]
struct SizeStats {
    /// Lines at or above this size are primary
    primary_threshold: f64,
    /// Median over primary lines only
    robust_median: f64,
}

impl SizeStats {
    fn compute<'a>(lines: impl Iterator<Item = &'a ProcessedLine>, min_line_ratio: f64) -> Self {
        let sizes: Vec<f64> = lines.map(|l| l.font_size).collect();
        let raw_median = median(&sizes);
        let primary_threshold = raw_median.map_or(0.0, |m| m * min_line_ratio);

        let primary: Vec<f64> = sizes
            .iter()
            .copied()
            .filter(|&s| s >= primary_threshold)
            .collect();
        let robust_median = median(&primary)
            .or(raw_median)
            .unwrap_or(FALLBACK_FONT_SIZE);

        Self {
            primary_threshold,
            robust_median,
        }
    }

    fn is_primary(&self, font_size: f64) -> bool {
        font_size >= self.primary_threshold
    }
}

/// Upper median of a list of sizes
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[sorted.len() / 2])
}

/// Group raw OCR lines into blocks
///
/// `image_width`/`image_height` are the true pixel dimensions of the image the
/// boxes are relative to. Every input line ends up in exactly one output
/// block. Output is ordered by window, then by group creation order.
pub fn cluster_lines(
    lines: &[RawLine],
    image_width: u32,
    image_height: u32,
    config: &ClusteringConfig,
) -> Vec<Block> {
    if !config.enabled || lines.len() < 2 || image_width == 0 || image_height == 0 {
        return lines.iter().cloned().map(Block::from).collect();
    }

    let (w, h) = (f64::from(image_width), f64::from(image_height));
    let mut processed: Vec<ProcessedLine> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| ProcessedLine::new(i, &line.bbox, w, h))
        .collect();

    processed.sort_by(|a, b| a.pixel_top.total_cmp(&b.pixel_top));

    let mut blocks = Vec::with_capacity(lines.len());
    for window in windows(&processed, config.window_max_height) {
        for group in partition(window, config) {
            let members: Vec<&ProcessedLine> = group.iter().map(|&i| &window[i]).collect();
            blocks.push(build_block(&members, lines, config));
        }
    }

    blocks
}

/// Split lines (sorted by top) into height-bounded windows
fn windows(sorted: &[ProcessedLine], max_height: f64) -> Vec<&[ProcessedLine]> {
    let mut result = Vec::new();
    let mut start = 0;

    while start < sorted.len() {
        let window_top = sorted[start].pixel_top;
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].pixel_bottom - window_top <= max_height {
            end += 1;
        }
        result.push(&sorted[start..end]);
        start = end;
    }

    result
}

/// Partition one window into groups of window positions
fn partition(window: &[ProcessedLine], config: &ClusteringConfig) -> Vec<Vec<usize>> {
    let horizontal = SizeStats::compute(
        window.iter().filter(|l| !l.is_vertical),
        config.min_line_ratio,
    );
    let vertical = SizeStats::compute(
        window.iter().filter(|l| l.is_vertical),
        config.min_line_ratio,
    );
    let stats_for = |line: &ProcessedLine| if line.is_vertical { vertical } else { horizontal };

    let primary: Vec<bool> = window
        .iter()
        .map(|l| stats_for(l).is_primary(l.font_size))
        .collect();

    let mut uf = UnionFind::new(window.len());
    for i in 0..window.len() {
        for j in (i + 1)..window.len() {
            let (a, b) = (&window[i], &window[j]);
            if a.is_vertical != b.is_vertical {
                continue;
            }
            let robust_median = stats_for(a).robust_median;
            if should_merge(a, b, primary[i], primary[j], robust_median, config) {
                uf.union(i, j);
            }
        }
    }

    uf.groups()
}

/// Geometric merge test for two lines of the same orientation
fn should_merge(
    a: &ProcessedLine,
    b: &ProcessedLine,
    a_primary: bool,
    b_primary: bool,
    robust_median: f64,
    config: &ClusteringConfig,
) -> bool {
    let mixed = a_primary != b_primary;

    let ratio_limit = if mixed {
        config.font_ratio_for_mixed
    } else {
        config.font_ratio
    };
    if size_ratio(a.font_size, b.font_size) > ratio_limit {
        return false;
    }

    // Vertical text reads across columns, horizontal text down rows
    let (gap, overlap, min_perp) = if a.is_vertical {
        (
            axis_gap(a.left, a.right, b.left, b.right),
            axis_overlap(a.top, a.bottom, b.top, b.bottom),
            a.height().min(b.height()),
        )
    } else {
        (
            axis_gap(a.top, a.bottom, b.top, b.bottom),
            axis_overlap(a.left, a.right, b.left, b.right),
            a.width().min(b.width()),
        )
    };

    if gap > robust_median * config.dist_k {
        return false;
    }

    let overlap_ratio = if min_perp > 0.0 { overlap / min_perp } else { 0.0 };
    if overlap_ratio < config.overlap_min {
        return false;
    }
    if mixed && overlap_ratio < config.mixed_min_overlap_ratio {
        return false;
    }

    true
}

fn size_ratio(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return if a == b { 1.0 } else { f64::INFINITY };
    }
    (a / b).max(b / a)
}

/// Distance between two intervals, zero when they touch or overlap
fn axis_gap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_start.max(b_start) - a_end.min(b_end)).max(0.0)
}

fn axis_overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

fn build_block(members: &[&ProcessedLine], lines: &[RawLine], config: &ClusteringConfig) -> Block {
    if let [single] = members {
        return Block::from(lines[single.original_index].clone());
    }

    let vertical_votes = members.iter().filter(|m| m.height() > m.width()).count();
    let orientation = if vertical_votes * 2 > members.len() {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    };

    let mut ordered: Vec<&RawLine> = members.iter().map(|m| &lines[m.original_index]).collect();
    match orientation {
        // Columns right to left, each top to bottom
        Orientation::Vertical => ordered.sort_by(|a, b| {
            b.bbox
                .center_x()
                .total_cmp(&a.bbox.center_x())
                .then(a.bbox.center_y().total_cmp(&b.bbox.center_y()))
        }),
        Orientation::Horizontal => ordered.sort_by(|a, b| {
            a.bbox
                .center_y()
                .total_cmp(&b.bbox.center_y())
                .then(a.bbox.center_x().total_cmp(&b.bbox.center_x()))
        }),
    }

    let separator = if config.add_space_on_merge { " " } else { ZERO_WIDTH_SPACE };
    let text = ordered
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(separator);

    let bbox = ordered
        .iter()
        .skip(1)
        .fold(ordered[0].bbox, |acc, l| acc.union(&l.bbox));

    Block {
        text,
        bbox,
        is_merged: Some(true),
        forced_orientation: Some(orientation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, x: f64, y: f64, width: f64, height: f64) -> RawLine {
        RawLine::new(text, BoundingBox::new(x, y, width, height))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Every input text must show up exactly once across all blocks
    fn assert_total_partition(lines: &[RawLine], blocks: &[Block]) {
        let mut seen: Vec<String> = blocks
            .iter()
            .flat_map(|b| b.text.split(ZERO_WIDTH_SPACE).map(str::to_string).collect::<Vec<_>>())
            .collect();
        let mut expected: Vec<String> = lines.iter().map(|l| l.text.clone()).collect();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_three_line_bubble_merges() {
        let lines = vec![
            line("one", 0.2, 0.10, 0.3, 0.04),
            line("two", 0.2, 0.14, 0.3, 0.04),
            line("three", 0.2, 0.18, 0.3, 0.04),
        ];

        let blocks = cluster_lines(&lines, 1000, 1000, &ClusteringConfig::default());

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.text, "one\u{200B}two\u{200B}three");
        assert_eq!(block.is_merged, Some(true));
        assert_eq!(block.forced_orientation, Some(Orientation::Horizontal));
        assert!(approx(block.bbox.x, 0.2));
        assert!(approx(block.bbox.y, 0.10));
        assert!(approx(block.bbox.width, 0.3));
        assert!(approx(block.bbox.height, 0.12));
    }

    #[test]
    fn test_add_space_on_merge() {
        let lines = vec![
            line("hello", 0.2, 0.10, 0.3, 0.04),
            line("world", 0.2, 0.14, 0.3, 0.04),
        ];
        let config = ClusteringConfig {
            add_space_on_merge: true,
            ..Default::default()
        };

        let blocks = cluster_lines(&lines, 1000, 1000, &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "hello world");
    }

    #[test]
    fn test_disabled_returns_singletons_in_input_order() {
        let lines = vec![
            line("b", 0.2, 0.14, 0.3, 0.04),
            line("a", 0.2, 0.10, 0.3, 0.04),
        ];
        let config = ClusteringConfig {
            enabled: false,
            ..Default::default()
        };

        let blocks = cluster_lines(&lines, 1000, 1000, &config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "b");
        assert_eq!(blocks[1].text, "a");
        assert!(blocks.iter().all(|b| b.is_merged.is_none()));
    }

    #[test]
    fn test_single_line_passes_through() {
        let lines = vec![line("solo", 0.1, 0.1, 0.2, 0.05)];
        let blocks = cluster_lines(&lines, 800, 1200, &ClusteringConfig::default());
        assert_eq!(blocks, vec![Block::from(lines[0].clone())]);
        assert!(cluster_lines(&[], 800, 1200, &ClusteringConfig::default()).is_empty());
    }

    #[test]
    fn test_vertical_and_horizontal_never_merge() {
        // A tall column crossing a wide row
        let lines = vec![
            line("column", 0.50, 0.10, 0.02, 0.20),
            line("row", 0.45, 0.15, 0.20, 0.02),
        ];
        let config = ClusteringConfig {
            dist_k: 100.0,
            overlap_min: 0.0,
            font_ratio: 100.0,
            font_ratio_for_mixed: 100.0,
            mixed_min_overlap_ratio: 0.0,
            ..Default::default()
        };

        let blocks = cluster_lines(&lines, 1000, 1000, &config);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.is_merged.is_none()));
    }

    #[test]
    fn test_identical_boxes_always_merge() {
        let lines = vec![
            line("x", 0.3, 0.3, 0.1, 0.05),
            line("y", 0.3, 0.3, 0.1, 0.05),
        ];
        let config = ClusteringConfig {
            dist_k: 0.0,
            overlap_min: 1.0,
            ..Default::default()
        };

        let blocks = cluster_lines(&lines, 1000, 1000, &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].is_merged, Some(true));
    }

    #[test]
    fn test_vertical_columns_read_right_to_left() {
        let lines = vec![
            line("left", 0.55, 0.10, 0.03, 0.20),
            line("right", 0.60, 0.10, 0.03, 0.25),
        ];

        let blocks = cluster_lines(&lines, 1000, 1000, &ClusteringConfig::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "right\u{200B}left");
        assert_eq!(blocks[0].forced_orientation, Some(Orientation::Vertical));
        assert!(approx(blocks[0].bbox.x, 0.55));
        assert!(approx(blocks[0].bbox.right(), 0.63));
        assert!(approx(blocks[0].bbox.bottom(), 0.35));
    }

    #[test]
    fn test_font_size_mismatch_rejected() {
        let lines = vec![
            line("big", 0.2, 0.10, 0.3, 0.08),
            line("small", 0.2, 0.18, 0.3, 0.04),
        ];

        let blocks = cluster_lines(&lines, 1000, 1000, &ClusteringConfig::default());
        assert_eq!(blocks.len(), 2);
    }

    /// Three 40-unit body lines far from the pair under test fix the
    /// median at 40, so anything under 20 units is secondary.
    fn with_body_text(pair: [RawLine; 2]) -> Vec<RawLine> {
        let mut lines = vec![
            line("body1", 0.6, 0.4, 0.3, 0.04),
            line("body2", 0.6, 0.6, 0.3, 0.04),
            line("body3", 0.6, 0.8, 0.3, 0.04),
        ];
        lines.extend(pair);
        lines
    }

    fn merged_count(blocks: &[Block]) -> usize {
        blocks.iter().filter(|b| b.is_merged == Some(true)).count()
    }

    #[test]
    fn test_primary_secondary_pair_needs_mixed_overlap() {
        let config = ClusteringConfig::default();

        // 21-unit primary over a 19.5-unit secondary, 30% horizontal overlap
        let low = with_body_text([
            line("primary", 0.10, 0.100, 0.2, 0.021),
            line("secondary", 0.24, 0.125, 0.2, 0.0195),
        ]);
        let blocks = cluster_lines(&low, 1000, 1000, &config);
        assert_eq!(merged_count(&blocks), 0);
        assert_eq!(blocks.len(), 5);

        // Same pair at 80% overlap clears mixed_min_overlap_ratio
        let high = with_body_text([
            line("primary", 0.10, 0.100, 0.2, 0.021),
            line("secondary", 0.14, 0.125, 0.2, 0.0195),
        ]);
        let blocks = cluster_lines(&high, 1000, 1000, &config);
        assert_eq!(merged_count(&blocks), 1);
        assert_eq!(blocks.len(), 4);
        let merged = blocks.iter().find(|b| b.is_merged == Some(true)).unwrap();
        assert_eq!(merged.text, "primary\u{200B}secondary");
    }

    #[test]
    fn test_primary_secondary_pair_uses_mixed_size_ratio() {
        // 21 / 17 is inside font_ratio but outside font_ratio_for_mixed
        let lines = with_body_text([
            line("primary", 0.10, 0.100, 0.2, 0.021),
            line("secondary", 0.10, 0.125, 0.2, 0.017),
        ]);

        let blocks = cluster_lines(&lines, 1000, 1000, &ClusteringConfig::default());
        assert_eq!(merged_count(&blocks), 0);

        let relaxed = ClusteringConfig {
            font_ratio_for_mixed: 1.3,
            ..Default::default()
        };
        let blocks = cluster_lines(&lines, 1000, 1000, &relaxed);
        assert_eq!(merged_count(&blocks), 1);
    }

    #[test]
    fn test_far_apart_lines_stay_separate() {
        let lines = vec![
            line("top", 0.1, 0.05, 0.3, 0.04),
            line("bottom", 0.1, 0.80, 0.3, 0.04),
            line("side", 0.7, 0.05, 0.2, 0.04),
        ];

        let blocks = cluster_lines(&lines, 1000, 1000, &ClusteringConfig::default());
        assert_eq!(blocks.len(), 3);
        assert_total_partition(&lines, &blocks);
    }

    #[test]
    fn test_reclustering_singletons_is_idempotent() {
        let lines = vec![
            line("a", 0.1, 0.05, 0.3, 0.04),
            line("b", 0.1, 0.50, 0.3, 0.04),
            line("c", 0.6, 0.80, 0.02, 0.15),
        ];
        let config = ClusteringConfig::default();

        let first = cluster_lines(&lines, 1000, 1000, &config);
        let relines: Vec<RawLine> = first.iter().map(RawLine::from).collect();
        let second = cluster_lines(&relines, 1000, 1000, &config);

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_windows_bound_merging() {
        // b and c touch but c ends past the window started by a
        let lines = vec![
            line("a", 0.1, 0.000, 0.3, 0.004),
            line("b", 0.1, 0.295, 0.3, 0.004),
            line("c", 0.1, 0.299, 0.3, 0.004),
        ];

        let blocks = cluster_lines(&lines, 1000, 10000, &ClusteringConfig::default());
        assert_eq!(blocks.len(), 3);
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        // Same geometry with a taller window merges b and c
        let config = ClusteringConfig {
            window_max_height: 10000.0,
            ..Default::default()
        };
        let blocks = cluster_lines(&lines, 1000, 10000, &config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text, "b\u{200B}c");
    }

    #[test]
    fn test_partition_totality_on_dense_page() {
        let mut lines = Vec::new();
        for row in 0..12 {
            for col in 0..5 {
                let vertical = (row + col) % 3 == 0;
                let (w, h) = if vertical { (0.02, 0.07) } else { (0.12, 0.02) };
                lines.push(line(
                    &format!("L{}-{}", row, col),
                    0.05 + col as f64 * 0.18,
                    0.02 + row as f64 * 0.025,
                    w,
                    h,
                ));
            }
        }

        let config = ClusteringConfig {
            window_max_height: 200.0,
            ..Default::default()
        };
        let blocks = cluster_lines(&lines, 1000, 1400, &config);
        assert_total_partition(&lines, &blocks);
        assert!(blocks.len() < lines.len());
    }

    #[test]
    fn test_merged_box_stays_in_unit_square() {
        let lines = vec![
            line("a", 0.0, 0.96, 0.5, 0.02),
            line("b", 0.0, 0.98, 0.5, 0.02),
        ];
        let blocks = cluster_lines(&lines, 1000, 1000, &ClusteringConfig::default());
        assert_eq!(blocks.len(), 1);
        let b = blocks[0].bbox;
        assert!(b.x >= 0.0 && b.y >= 0.0);
        assert!(b.right() <= 1.0 + 1e-9 && b.bottom() <= 1.0 + 1e-9);
    }
}
