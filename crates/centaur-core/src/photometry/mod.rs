pub mod background;
pub mod exposure;
pub mod noise;
pub mod saturation;
pub mod sky;
pub mod snr;
pub mod stats;

pub use background::{estimate_background, image_stats, BackgroundEstimate, ImageStats};
pub use exposure::{optimal_sub_length, plan_exposure, ExposurePlan, OptimizationReason};
pub use noise::{noise_regime, NoiseRegime};
pub use saturation::{analyze_saturation, SaturationAnalysis};
pub use sky::{sky_brightness, sky_signal, surface_brightness, SkyBrightness, SkySignal};
pub use snr::{snr_metrics, SnrMetrics};
pub use stats::{sigma_clipped_stats, ClippedStats};

use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::frame::Frame;
use crate::metadata::InstrumentMetadata;
use crate::policy::PolicyTable;
use crate::report::AnalysisResult;

/// Compute every photometric metric of a frame.
///
/// Metrics that need a missing calibration value are left absent. A frame
/// with no finite non-zero pixel yields a result with every metric absent.
/// The SHO block is filled in by the recommendation engine.
pub fn analyze_frame(
    frame: &Frame,
    instrument: &InstrumentMetadata,
    config: &AnalysisConfig,
    policy: &PolicyTable,
) -> AnalysisResult {
    let data = &frame.data;
    if !data.iter().any(|v| v.is_finite() && *v != 0.0) {
        warn!(
            width = frame.width(),
            height = frame.height(),
            "Frame has no finite non-zero pixels; metrics not computable"
        );
        return AnalysisResult::not_computable(instrument.exposure);
    }

    let saturation = analyze_saturation(data, instrument.saturation_level, &policy.saturation);
    let mask_hot = saturation
        .as_ref()
        .is_some_and(|s| s.near_saturated_pixels > 0);

    let Some(background) =
        estimate_background(data, instrument.saturation_level, mask_hot, config)
    else {
        warn!("Background estimate failed; metrics not computable");
        return AnalysisResult::not_computable(instrument.exposure);
    };
    let bg = background.stats;
    debug!(
        mean = bg.mean,
        median = bg.median,
        std = bg.std,
        pixels = background.pixels_used,
        "Background estimated"
    );

    let snr = snr_metrics(&bg);
    if snr.is_none() {
        warn!("Background has no spread; SNR metrics not computable");
    }
    let sky = sky_brightness(bg.median, instrument);
    let signal = sky_signal(bg.median, instrument);

    let plan = plan_exposure(
        instrument.exposure,
        saturation.as_ref(),
        snr.as_ref(),
        config,
        &policy.saturation,
    );

    let noise = match (instrument.read_noise, signal.as_ref()) {
        (Some(rn), Some(signal)) => Some(noise_regime(rn, signal)),
        _ => None,
    };
    let optimal_sub = match (instrument.read_noise, signal.as_ref()) {
        (Some(rn), Some(signal)) => {
            optimal_sub_length(rn, signal.electrons_per_second_per_pixel, config)
        }
        _ => None,
    };

    AnalysisResult {
        current_exposure: instrument.exposure,
        recommended_exposure: plan.recommended,
        exposure_factor: plan.factor,
        optimization_reason: plan.reason,
        optimal_sub_length: optimal_sub,
        noise_regime: noise,
        snr_metrics: snr,
        sky_brightness: sky,
        saturation_analysis: saturation,
        sho_recommendation: None,
        image_stats: image_stats(data, &bg, config),
    }
}
