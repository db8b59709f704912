use serde::{Deserialize, Serialize};

use super::stats::ClippedStats;

/// Signal level of a faint object, in background standard deviations.
pub const FAINT_OBJECT_SIGMA: f64 = 3.0;

/// Signal level of a moderate object, in background standard deviations.
pub const MODERATE_OBJECT_SIGMA: f64 = 10.0;

/// Modelled SNR tiers derived from the background.
///
/// The faint and moderate tiers describe a hypothetical source sitting 3σ and
/// 10σ above the background; they are not measured on detected stars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnrMetrics {
    pub snr_background: f64,
    pub snr_faint_object: f64,
    pub snr_moderate_object: f64,
    pub background_mean: f64,
    pub background_std: f64,
    pub faint_signal_level: f64,
    pub moderate_signal_level: f64,
}

/// SNR tiers for a background estimate. `None` when the background has no spread.
pub fn snr_metrics(background: &ClippedStats) -> Option<SnrMetrics> {
    let mean = background.mean;
    let std = background.std;
    if !std.is_finite() || !mean.is_finite() || std <= 0.0 {
        return None;
    }

    let faint_signal = mean + FAINT_OBJECT_SIGMA * std;
    let moderate_signal = mean + MODERATE_OBJECT_SIGMA * std;
    Some(SnrMetrics {
        snr_background: mean / std,
        snr_faint_object: (faint_signal - mean) / std,
        snr_moderate_object: (moderate_signal - mean) / std,
        background_mean: mean,
        background_std: std,
        faint_signal_level: faint_signal,
        moderate_signal_level: moderate_signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stats(mean: f64, std: f64) -> ClippedStats {
        ClippedStats {
            mean,
            median: mean,
            std,
            count: 1000,
        }
    }

    #[test]
    fn test_tiers() {
        let snr = snr_metrics(&stats(500.0, 55.0)).unwrap();
        assert_relative_eq!(snr.snr_background, 9.0909, epsilon = 1e-4);
        assert_relative_eq!(snr.snr_faint_object, 3.0, epsilon = 1e-9);
        assert_relative_eq!(snr.snr_moderate_object, 10.0, epsilon = 1e-9);
        assert_relative_eq!(snr.faint_signal_level, 665.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_std_is_not_computable() {
        assert!(snr_metrics(&stats(500.0, 0.0)).is_none());
    }
}
