use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::policy::SaturationPolicy;

use super::saturation::SaturationAnalysis;
use super::snr::SnrMetrics;

/// Why the recommended exposure has its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationReason {
    /// Reduced because of significant saturation.
    Saturation,
    /// Scaled toward the target SNR.
    SnrOptimization,
    /// Current exposure kept, no SNR available.
    Default,
    /// No exposure time in the header.
    NotComputable,
}

impl fmt::Display for OptimizationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saturation => write!(f, "saturation"),
            Self::SnrOptimization => write!(f, "snr_optimization"),
            Self::Default => write!(f, "default"),
            Self::NotComputable => write!(f, "not_computable"),
        }
    }
}

/// Recommended exposure for the next frames.
#[derive(Clone, Debug, PartialEq)]
pub struct ExposurePlan {
    pub recommended: Option<f64>,
    /// `recommended / current`.
    pub factor: Option<f64>,
    pub reason: OptimizationReason,
}

/// Derive the recommended exposure from the current one.
///
/// Saturation at MODERATE or above reduces the exposure by the policy factor;
/// otherwise it is scaled by `(target_snr / snr_moderate)²`. The result is
/// clamped to the configured bounds.
pub fn plan_exposure(
    current: Option<f64>,
    saturation: Option<&SaturationAnalysis>,
    snr: Option<&SnrMetrics>,
    config: &AnalysisConfig,
    policy: &SaturationPolicy,
) -> ExposurePlan {
    let Some(current) = current else {
        return ExposurePlan {
            recommended: None,
            factor: None,
            reason: OptimizationReason::NotComputable,
        };
    };

    let reduction = saturation.and_then(|s| policy.reduction_for(s.severity));
    let (raw, reason) = match (reduction, snr) {
        (Some(factor), _) => (current * factor, OptimizationReason::Saturation),
        (None, Some(snr)) if snr.snr_moderate_object > 0.0 => (
            current * (config.target_snr / snr.snr_moderate_object).powi(2),
            OptimizationReason::SnrOptimization,
        ),
        (None, _) => (current, OptimizationReason::Default),
    };

    let recommended = raw.min(config.max_exposure_secs).max(config.min_exposure_secs);
    ExposurePlan {
        recommended: Some(recommended),
        factor: Some(recommended / current),
        reason,
    }
}

/// Sub length at which sky electrons reach `swamp_factor × read_noise²`,
/// clamped to the configured bounds. `None` for a non-positive sky rate.
pub fn optimal_sub_length(read_noise: f64, sky_rate: f64, config: &AnalysisConfig) -> Option<f64> {
    if sky_rate <= 0.0 || !sky_rate.is_finite() {
        return None;
    }
    let sub = config.swamp_factor * read_noise * read_noise / sky_rate;
    Some(sub.min(config.max_sub_secs).max(config.min_sub_secs))
}
