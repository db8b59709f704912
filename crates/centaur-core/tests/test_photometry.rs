#[allow(dead_code)]
mod common;

use std::path::PathBuf;

use approx::assert_relative_eq;
use common::*;
use ndarray::Array2;
use proptest::prelude::*;
use tempfile::TempDir;

use centaur_core::config::CentaurConfig;
use centaur_core::photometry::{surface_brightness, OptimizationReason};
use centaur_core::pipeline::analyze_file;
use centaur_core::policy::Severity;
use centaur_core::report::Report;

const SIZE: usize = 128;

/// Reference frame: 300 s Ha, background 500 ± 55 ADU, one bright star
/// pixel at 60000 ADU.
fn reference_frame() -> Array2<f32> {
    let mut data = uniform_sky(SIZE, SIZE, 500.0, 55.0);
    data[[64, 64]] = 60000.0;
    data
}

fn analyze(dir: &TempDir, name: &str, data: &Array2<f32>, extra: &[(&str, Kw)]) -> Report {
    let path = write_file(dir.path(), name, &build_fits_f32(data, extra));
    analyze_file(&path, &CentaurConfig::default()).unwrap()
}

fn scattered_pixels(count: usize) -> Vec<(usize, usize)> {
    (0..SIZE / 4)
        .flat_map(|r| (0..SIZE / 4).map(move |c| (r * 4 + 1, c * 4 + 1)))
        .take(count)
        .collect()
}

#[test]
fn test_reference_frame_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let report = analyze(&tmp, "NGC7000_Ha_300s.fits", &reference_frame(), &rig_keywords());
    let a = &report.analysis;

    let snr = a.snr_metrics.as_ref().unwrap();
    assert_relative_eq!(snr.background_mean, 500.0, epsilon = 0.5);
    assert_relative_eq!(snr.background_std, 55.0, epsilon = 0.5);
    assert_relative_eq!(snr.snr_background, 500.0 / 55.0, epsilon = 0.1);

    let sat = a.saturation_analysis.as_ref().unwrap();
    assert_eq!(sat.severity, Severity::None);
    assert_eq!(sat.near_saturated_pixels, 0);
    assert_eq!(sat.high_saturation_pixels, 1);
    assert_eq!(sat.max_value, 60000.0);
    assert!(!sat.warning);

    assert_eq!(a.current_exposure, Some(300.0));
    assert_eq!(a.optimization_reason, OptimizationReason::SnrOptimization);
    let recommended = a.recommended_exposure.unwrap();
    assert!((30.0..=600.0).contains(&recommended));
    assert_relative_eq!(a.exposure_factor.unwrap(), recommended / 300.0, epsilon = 1e-12);

    let sho = a.sho_recommendation.as_ref().unwrap();
    assert_relative_eq!(sho.adjustment_factor, 0.6);
    assert_relative_eq!(sho.recommended_exposure, 0.6 * recommended, epsilon = 1e-9);
    assert_relative_eq!(sho.recommended_exposure, 180.0, epsilon = 5.0);

    let sky = a.sky_brightness.as_ref().unwrap();
    let mag = sky.mag_per_arcsec2.unwrap();
    assert!(mag > 21.0, "expected a dark sky, got {mag}");
    assert_relative_eq!(sky.exposure_time_used, 300.0);

    // No read noise in the header or config.
    assert!(a.noise_regime.is_none());
    assert!(a.optimal_sub_length.is_none());

    assert_eq!(report.recommendations[0], "No significant saturation detected");
    assert!(report.recommendations[1].starts_with("Exposure time is good"));
    assert_eq!(report.recommendations[2], format!("For SII/OIII: {:.0}s (0.6x Ha)", 0.6 * recommended));
    assert!(report.recommendations.iter().any(|l| l.starts_with("Dark sky")));
}

#[test]
fn test_no_saturation() {
    let tmp = TempDir::new().unwrap();
    let data = uniform_sky(SIZE, SIZE, 500.0, 55.0);
    let report = analyze(&tmp, "clean.fits", &data, &rig_keywords());
    let sat = report.analysis.saturation_analysis.unwrap();
    assert_eq!(sat.severity, Severity::None);
    assert!(!sat.likely_hot_pixels);
    assert_eq!(sat.total_pixels, SIZE * SIZE);
}

#[test]
fn test_isolated_hot_pixels_are_minor() {
    let tmp = TempDir::new().unwrap();
    let mut data = uniform_sky(SIZE, SIZE, 500.0, 55.0);
    // ~0.5% of the frame, none touching.
    let hot = scattered_pixels(SIZE * SIZE / 200);
    for &(r, c) in &hot {
        data[[r, c]] = 65000.0;
    }
    let report = analyze(&tmp, "hot.fits", &data, &rig_keywords());
    let sat = report.analysis.saturation_analysis.as_ref().unwrap();

    assert_eq!(sat.near_saturated_pixels, hot.len());
    assert_eq!(sat.isolated_pixels, hot.len());
    assert_eq!(sat.clustered_pixels, 0);
    assert_eq!(sat.severity, Severity::Minor);
    assert!(sat.likely_hot_pixels);
    assert!(!sat.warning);
    assert_ne!(report.analysis.optimization_reason, OptimizationReason::Saturation);
    assert_eq!(
        report.recommendations[0],
        format!("Note: Few hot pixels detected ({} pixels)", hot.len())
    );
    assert!(!report.recommendations.iter().any(|l| l == "Consider dark frame calibration"));
}

#[test]
fn test_saturated_star_core_is_severe() {
    let tmp = TempDir::new().unwrap();
    let mut data = uniform_sky(SIZE, SIZE, 500.0, 55.0);
    // 18x18 block, ~2% of the frame.
    for r in 40..58 {
        for c in 40..58 {
            data[[r, c]] = 65000.0;
        }
    }
    let report = analyze(&tmp, "star.fits", &data, &rig_keywords());
    let a = &report.analysis;
    let sat = a.saturation_analysis.as_ref().unwrap();

    assert_eq!(sat.clustered_pixels, 18 * 18);
    assert!(matches!(sat.severity, Severity::High | Severity::Critical));
    assert!(!sat.likely_hot_pixels);
    assert!(sat.warning);

    assert_eq!(a.optimization_reason, OptimizationReason::Saturation);
    assert_relative_eq!(a.recommended_exposure.unwrap(), 150.0);
    assert!(report.recommendations[0].starts_with("SATURATION (HIGH)"));
    assert_eq!(report.recommendations[1], "Reduce exposure to 150s (currently 300s)");
    // The saturation line already carries the reduction.
    assert!(!report
        .recommendations
        .iter()
        .any(|l| l.starts_with("Decrease exposure")));
    assert_eq!(report.recommendations[2], "For SII/OIII: 90s (0.6x Ha)");
}

#[test]
fn test_read_noise_enables_noise_regime() {
    let tmp = TempDir::new().unwrap();
    let mut extra = rig_keywords();
    extra.push(("RDNOISE", Kw::Float(3.5)));
    let report = analyze(&tmp, "rn.fits", &reference_frame(), &extra);
    let a = &report.analysis;

    let noise = a.noise_regime.as_ref().unwrap();
    assert_relative_eq!(noise.read_noise, 3.5);
    // ~500 e- of sky against 3.5 e- read noise.
    assert!(!noise.read_noise_dominant);
    assert!(report
        .recommendations
        .contains(&"Sky-noise limited. Good exposure.".to_string()));

    let optimal = a.optimal_sub_length.unwrap();
    assert!((60.0..=600.0).contains(&optimal));
}

#[test]
fn test_missing_exposure_is_not_computable() {
    let tmp = TempDir::new().unwrap();
    let report = analyze(&tmp, "noexp.fits", &reference_frame(), &[("GAIN", Kw::Float(1.0))]);
    let a = &report.analysis;
    assert_eq!(a.current_exposure, None);
    assert_eq!(a.recommended_exposure, None);
    assert_eq!(a.exposure_factor, None);
    assert_eq!(a.optimization_reason, OptimizationReason::NotComputable);
    assert!(a.sho_recommendation.is_none());
    assert!(a.sky_brightness.is_none());
    // Background metrics do not depend on the exposure.
    assert!(a.snr_metrics.is_some());
    assert!(report
        .recommendations
        .contains(&"Exposure not computable: no exposure time in header".to_string()));
}

#[test]
fn test_blank_frames_are_not_computable() {
    let tmp = TempDir::new().unwrap();
    let zeros = Array2::<f32>::zeros((32, 32));
    let report = analyze(&tmp, "zeros.fits", &zeros, &rig_keywords());
    assert_eq!(report.analysis.optimization_reason, OptimizationReason::NotComputable);
    assert!(report.analysis.snr_metrics.is_none());
    assert_eq!(report.analysis.current_exposure, Some(300.0));
    assert_eq!(
        report.recommendations,
        vec!["Exposure not computable: metrics not computable for this frame".to_string()]
    );

    let nans = Array2::<f32>::from_elem((32, 32), f32::NAN);
    let report = analyze(&tmp, "nans.fits", &nans, &rig_keywords());
    assert_eq!(report.analysis.optimization_reason, OptimizationReason::NotComputable);
}

#[test]
fn test_flat_frame_has_no_snr() {
    let tmp = TempDir::new().unwrap();
    let flat = Array2::<f32>::from_elem((64, 64), 1200.0);
    let report = analyze(&tmp, "flat.fits", &flat, &rig_keywords());
    assert!(report.analysis.snr_metrics.is_none());
    assert_eq!(report.analysis.optimization_reason, OptimizationReason::Default);
    assert_eq!(report.analysis.recommended_exposure, Some(300.0));
}

#[test]
fn test_sho_uses_ha_baseline_for_any_filter() {
    let tmp = TempDir::new().unwrap();
    let mut extra = rig_keywords();
    extra.retain(|(k, _)| *k != "FILTER");
    extra.push(("FILTER", Kw::Str("OIII")));
    let oiii = analyze(&tmp, "oiii.fits", &reference_frame(), &extra);
    let ha = analyze(&tmp, "ha.fits", &reference_frame(), &rig_keywords());

    assert_eq!(oiii.file_info.filter, "OIII");
    assert_eq!(oiii.analysis.sho_recommendation, ha.analysis.sho_recommendation);
}

#[test]
fn test_analysis_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    let path: PathBuf = write_file(
        tmp.path(),
        "repeat.fits",
        &build_fits_f32(&reference_frame(), &rig_keywords()),
    );
    let config = CentaurConfig::default();
    let first = analyze_file(&path, &config).unwrap();
    let second = analyze_file(&path, &config).unwrap();
    assert_eq!(first.analysis, second.analysis);
    assert_eq!(first.recommendations, second.recommendations);
    assert_eq!(first.file_info, second.file_info);
}

proptest! {
    #[test]
    fn prop_brighter_sky_has_lower_magnitude(
        rate in 0.01f64..1000.0,
        scale in 0.2f64..10.0,
        ratio in 1.01f64..100.0,
    ) {
        let faint = surface_brightness(rate, scale, 25.0).unwrap();
        let bright = surface_brightness(rate * ratio, scale, 25.0).unwrap();
        prop_assert!(bright < faint);
    }

    #[test]
    fn prop_no_sky_signal_has_no_magnitude(rate in -100.0f64..=0.0) {
        prop_assert!(surface_brightness(rate, 1.2, 25.0).is_none());
    }
}
