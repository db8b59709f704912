use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{HIGH_SATURATION_FRACTION, PARALLEL_PIXEL_THRESHOLD};
use crate::detection::{label_components, Connectivity};
use crate::policy::{SaturationPolicy, Severity};

/// Saturation profile of a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaturationAnalysis {
    pub max_value: f64,
    pub saturation_level: f64,
    /// `max_value` as a percentage of `saturation_level`.
    pub max_percentage: f64,
    pub near_saturated_pixels: usize,
    pub near_saturated_percent: f64,
    /// Pixels between 80% and the near-saturation band.
    pub high_saturation_pixels: usize,
    pub high_saturation_percent: f64,
    /// Near-saturated pixels in regions at least as large as the cluster threshold.
    pub clustered_pixels: usize,
    pub isolated_pixels: usize,
    pub severity: Severity,
    pub likely_hot_pixels: bool,
    /// True when the saturation deserves the operator's attention.
    pub warning: bool,
    pub total_pixels: usize,
}

/// Classify near-saturated pixels into clusters and isolated hot pixels.
///
/// Returns `None` when the frame has no finite pixels or no usable saturation level.
pub fn analyze_saturation(
    data: &Array2<f32>,
    saturation_level: f64,
    policy: &SaturationPolicy,
) -> Option<SaturationAnalysis> {
    if !saturation_level.is_finite() || saturation_level <= 0.0 {
        return None;
    }
    let total_pixels = data.len();
    let near_threshold = (policy.near_saturation_fraction as f64 * saturation_level) as f32;
    let high_threshold = (HIGH_SATURATION_FRACTION as f64 * saturation_level) as f32;

    let (max_value, high_count) = row_scan(data, near_threshold, high_threshold)?;
    let near_mask = data.mapv(|v| v >= near_threshold);

    let labelling = label_components(&near_mask, Connectivity::Four);
    let near_count: usize = labelling.components.iter().map(|c| c.area).sum();
    let clustered: usize = labelling
        .components
        .iter()
        .filter(|c| c.area >= policy.min_cluster_pixels)
        .map(|c| c.area)
        .sum();
    let isolated = near_count - clustered;

    let percent = |count: usize| count as f64 / total_pixels as f64 * 100.0;
    let severity = policy.classify(near_count, percent(clustered));
    let likely_hot_pixels = near_count > 0 && isolated > clustered;
    let warning = severity >= Severity::Moderate || (severity == Severity::Minor && !likely_hot_pixels);

    Some(SaturationAnalysis {
        max_value,
        saturation_level,
        max_percentage: max_value / saturation_level * 100.0,
        near_saturated_pixels: near_count,
        near_saturated_percent: percent(near_count),
        high_saturation_pixels: high_count,
        high_saturation_percent: percent(high_count),
        clustered_pixels: clustered,
        isolated_pixels: isolated,
        severity,
        likely_hot_pixels,
        warning,
        total_pixels,
    })
}

/// Maximum finite value and the count of pixels in the high band `[high, near)`.
fn row_scan(data: &Array2<f32>, near: f32, high: f32) -> Option<(f64, usize)> {
    let (h, w) = data.dim();
    let scan_row = |row: usize| -> (Option<f32>, usize) {
        let mut max: Option<f32> = None;
        let mut count = 0usize;
        for col in 0..w {
            let v = data[[row, col]];
            if !v.is_finite() {
                continue;
            }
            max = Some(max.map_or(v, |m| m.max(v)));
            if v >= high && v < near {
                count += 1;
            }
        }
        (max, count)
    };

    let rows: Vec<(Option<f32>, usize)> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(scan_row).collect()
    } else {
        (0..h).map(scan_row).collect()
    };

    let max = rows.iter().filter_map(|(m, _)| *m).reduce(f32::max)?;
    let count = rows.iter().map(|(_, c)| c).sum();
    Some((max as f64, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_nan_frame_is_not_computable() {
        let data = Array2::from_elem((8, 8), f32::NAN);
        assert!(analyze_saturation(&data, 65535.0, &SaturationPolicy::default()).is_none());
    }

    #[test]
    fn test_high_band_is_counted_separately() {
        let mut data = Array2::from_elem((10, 10), 100.0f32);
        data[[0, 0]] = 850.0;
        data[[5, 5]] = 990.0;
        let sat = analyze_saturation(&data, 1000.0, &SaturationPolicy::default()).unwrap();
        assert_eq!(sat.high_saturation_pixels, 1);
        assert_eq!(sat.near_saturated_pixels, 1);
        assert_eq!(sat.isolated_pixels, 1);
        assert_eq!(sat.severity, Severity::Minor);
        assert!(sat.likely_hot_pixels);
        assert!(!sat.warning);
        assert_eq!(sat.max_value, 990.0);
    }
}
