//! Recommendation engine: a pure function from analysis output to advice.
//!
//! Lines are emitted in a fixed order: saturation, exposure verdict, SHO
//! note, noise regime, optimal sub length, sky brightness.

use crate::consts::{BRIGHT_SKY_MAG, DARK_SKY_MAG};
use crate::photometry::OptimizationReason;
use crate::policy::{ExposureBand, PolicyTable, Severity};
use crate::report::{AnalysisResult, ShoRecommendation};

const SHO_NOTE: &str = "For SII/OIII with same sky conditions";
const NO_EXPOSURE: &str = "Exposure not computable: no exposure time in header";
const NO_METRICS: &str = "Exposure not computable: metrics not computable for this frame";

/// Output of the recommendation engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendations {
    pub lines: Vec<String>,
    pub sho: Option<ShoRecommendation>,
}

/// Exposure verdict for a result, `None` when no factor could be computed.
pub fn exposure_band(analysis: &AnalysisResult, policy: &PolicyTable) -> Option<ExposureBand> {
    analysis.exposure_factor.map(|f| policy.exposure.classify(f))
}

/// SII/OIII exposure derived from the H-alpha baseline recommendation,
/// whatever filter the analyzed frame used.
pub fn sho_recommendation(analysis: &AnalysisResult, policy: &PolicyTable) -> Option<ShoRecommendation> {
    let baseline = analysis.recommended_exposure?;
    Some(ShoRecommendation {
        adjustment_factor: policy.sho_ratio,
        recommended_exposure: policy.sho_ratio * baseline,
        note: SHO_NOTE.to_string(),
    })
}

pub fn recommend(analysis: &AnalysisResult, policy: &PolicyTable) -> Recommendations {
    let mut lines = Vec::new();
    let current = analysis.current_exposure;
    // Set once a saturation line already states the reduced exposure.
    let mut reduction_given = false;

    if let Some(sat) = &analysis.saturation_analysis {
        match sat.severity {
            Severity::High | Severity::Critical => {
                lines.push(format!(
                    "SATURATION ({}): {:.3}% of pixels near saturation",
                    sat.severity, sat.near_saturated_percent
                ));
                if let (Some(rec), Some(cur)) = (analysis.recommended_exposure, current) {
                    lines.push(format!("Reduce exposure to {rec:.0}s (currently {cur:.0}s)"));
                    reduction_given =
                        analysis.optimization_reason == OptimizationReason::Saturation;
                }
            }
            Severity::Moderate => {
                lines.push(format!(
                    "Note: {:.3}% of pixels near saturation",
                    sat.near_saturated_percent
                ));
                if sat.likely_hot_pixels {
                    lines.push("Likely hot pixels, not object saturation".to_string());
                }
            }
            Severity::Minor => {
                lines.push(format!(
                    "Note: Few hot pixels detected ({} pixels)",
                    sat.near_saturated_pixels
                ));
                if !sat.likely_hot_pixels {
                    lines.push("Consider dark frame calibration".to_string());
                }
            }
            Severity::None => lines.push("No significant saturation detected".to_string()),
        }
    }

    match (exposure_band(analysis, policy), analysis.recommended_exposure, current) {
        (Some(ExposureBand::High), Some(rec), _) => {
            lines.push(format!("Increase exposure to {rec:.0}s"))
        }
        (Some(ExposureBand::Low), Some(_), _) if reduction_given => {}
        (Some(ExposureBand::Low), Some(rec), _) => {
            lines.push(format!("Decrease exposure to {rec:.0}s"))
        }
        (Some(ExposureBand::Good), _, Some(cur)) => {
            lines.push(format!("Exposure time is good: {cur:.0}s"))
        }
        _ if current.is_none() => lines.push(NO_EXPOSURE.to_string()),
        _ => lines.push(NO_METRICS.to_string()),
    }

    let sho = sho_recommendation(analysis, policy);
    if let Some(sho) = &sho {
        lines.push(format!(
            "For SII/OIII: {:.0}s ({:.1}x Ha)",
            sho.recommended_exposure, sho.adjustment_factor
        ));
    }

    if let Some(noise) = &analysis.noise_regime {
        if noise.read_noise_dominant {
            lines.push("Read-noise limited. Longer subs would help.".to_string());
        } else {
            lines.push("Sky-noise limited. Good exposure.".to_string());
        }
    }

    if let (Some(optimal), Some(cur)) = (analysis.optimal_sub_length, current) {
        if (cur - optimal).abs() > policy.sub_length_tolerance_secs {
            lines.push(format!("Optimal sub length: {optimal:.0}s (currently {cur:.0}s)"));
        }
    }

    if let Some(mag) = analysis
        .sky_brightness
        .as_ref()
        .and_then(|s| s.mag_per_arcsec2)
    {
        if mag < BRIGHT_SKY_MAG {
            lines.push(format!("Bright sky ({mag:.1} mag/arcsec²)"));
        } else if mag > DARK_SKY_MAG {
            lines.push(format!("Dark sky ({mag:.1} mag/arcsec²)"));
        }
    }

    Recommendations { lines, sho }
}
