use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::consts::{BACKGROUND_HOT_MASK_FRACTION, MIN_BACKGROUND_PIXELS};
use crate::detection::{label_components, Connectivity};

use super::stats::{collect_values, mean_std, median_in_place, sigma_clipped_stats, ClippedStats};

/// Robust sky background of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundEstimate {
    pub stats: ClippedStats,
    /// Pixels the estimate was computed from.
    pub pixels_used: usize,
}

/// Whole-frame statistics surfaced in the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub num_sources_detected: usize,
}

/// Estimate the background with hot pixels and bright sources masked out.
///
/// Pixels at or above 90% of saturation are masked when `mask_hot` is set.
/// Sources are connected regions of at least `min_source_pixels` above
/// median + `source_mask_sigma` standard deviations. When fewer than 1000
/// pixels survive the masks, the estimate falls back to the hot-masked and
/// then the full pixel set.
pub fn estimate_background(
    data: &Array2<f32>,
    saturation_level: f64,
    mask_hot: bool,
    config: &AnalysisConfig,
) -> Option<BackgroundEstimate> {
    let hot_threshold = (BACKGROUND_HOT_MASK_FRACTION as f64 * saturation_level) as f32;
    let hot_mask = mask_hot.then(|| data.mapv(|v| v >= hot_threshold));

    let mut unmasked = collect_values(data, hot_mask.as_ref());
    if unmasked.is_empty() {
        unmasked = collect_values(data, None);
    }
    let (_, std) = mean_std(&unmasked)?;
    let median = median_in_place(&mut unmasked)?;

    let threshold = median + config.source_mask_sigma * std;
    let source_mask = source_pixels(data, threshold, config.min_source_pixels);
    let combined = match &hot_mask {
        Some(hot) => &source_mask | hot,
        None => source_mask,
    };

    let mut values = collect_values(data, Some(&combined));
    if values.len() < MIN_BACKGROUND_PIXELS {
        debug!(remaining = values.len(), "Too few background pixels after source masking");
        values = collect_values(data, hot_mask.as_ref());
        if values.len() < MIN_BACKGROUND_PIXELS {
            values = collect_values(data, None);
        }
    }

    let stats = sigma_clipped_stats(&values, config.clip_sigma, config.clip_iterations)?;
    Some(BackgroundEstimate {
        stats,
        pixels_used: values.len(),
    })
}

/// Number of sources: connected regions of at least `min_source_pixels`
/// above background median + `source_count_sigma` standard deviations.
pub fn count_sources(data: &Array2<f32>, background: &ClippedStats, config: &AnalysisConfig) -> usize {
    let threshold = background.median + config.source_count_sigma * background.std;
    let mask = data.mapv(|v| v.is_finite() && v as f64 > threshold);
    label_components(&mask, Connectivity::Eight)
        .components
        .iter()
        .filter(|c| c.area >= config.min_source_pixels)
        .count()
}

/// Whole-frame sigma-clipped statistics and source count.
pub fn image_stats(
    data: &Array2<f32>,
    background: &ClippedStats,
    config: &AnalysisConfig,
) -> Option<ImageStats> {
    let values = collect_values(data, None);
    let stats = sigma_clipped_stats(&values, config.clip_sigma, config.clip_iterations)?;
    Some(ImageStats {
        mean: stats.mean,
        median: stats.median,
        std: stats.std,
        num_sources_detected: count_sources(data, background, config),
    })
}

fn source_pixels(data: &Array2<f32>, threshold: f64, min_pixels: usize) -> Array2<bool> {
    let mask = data.mapv(|v| v.is_finite() && v as f64 > threshold);
    label_components(&mask, Connectivity::Eight).mask_min_area(min_pixels)
}
