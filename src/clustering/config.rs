//! Clustering configuration

use serde::Deserialize;

/// Tuning knobs for grouping detected lines into blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// When false, every line is returned as its own block
    pub enabled: bool,
    /// Reading-direction gap tolerance, as a multiple of the median font size
    pub dist_k: f64,
    /// Max font-size ratio for two lines of the same class (primary/secondary)
    pub font_ratio: f64,
    /// Max font-size ratio when one line is primary and the other is not
    pub font_ratio_for_mixed: f64,
    /// Min perpendicular overlap, relative to the smaller line
    pub overlap_min: f64,
    /// Min perpendicular overlap for primary/secondary pairs
    pub mixed_min_overlap_ratio: f64,
    /// Lines smaller than `median * min_line_ratio` are secondary (furigana, SFX)
    pub min_line_ratio: f64,
    /// Join merged text with a space instead of U+200B
    pub add_space_on_merge: bool,
    /// Max pixel height of one clustering window
    pub window_max_height: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dist_k: 1.2,
            font_ratio: 1.3,
            font_ratio_for_mixed: 1.1,
            overlap_min: 0.1,
            mixed_min_overlap_ratio: 0.5,
            min_line_ratio: 0.5,
            add_space_on_merge: false,
            window_max_height: 3000.0,
        }
    }
}
