use serde::{Deserialize, Serialize};

use crate::metadata::InstrumentMetadata;

/// Background signal converted to electrons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkySignal {
    pub electrons_per_pixel: f64,
    pub electrons_per_second_per_pixel: f64,
}

/// Sky brightness block of a report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyBrightness {
    /// `None` when the sky rate is not positive.
    pub mag_per_arcsec2: Option<f64>,
    pub electrons_per_pixel: f64,
    pub electrons_per_second_per_pixel: f64,
    pub adu_per_pixel: f64,
    pub exposure_time_used: f64,
    pub gain: f64,
    pub pixel_scale: f64,
    pub zero_point: f64,
}

/// Convert a background level in ADU to electrons and electrons per second.
///
/// Needs both gain and exposure time from the header.
pub fn sky_signal(background_adu: f64, instrument: &InstrumentMetadata) -> Option<SkySignal> {
    let gain = instrument.gain?;
    let exposure = instrument.exposure?;
    let electrons = background_adu * gain;
    Some(SkySignal {
        electrons_per_pixel: electrons,
        electrons_per_second_per_pixel: electrons / exposure,
    })
}

/// Surface brightness in mag/arcsec² for an electron rate per pixel.
pub fn surface_brightness(rate: f64, pixel_scale: f64, zero_point: f64) -> Option<f64> {
    if rate <= 0.0 || pixel_scale <= 0.0 {
        return None;
    }
    let mag = zero_point - 2.5 * (rate / (pixel_scale * pixel_scale)).log10();
    mag.is_finite().then_some(mag)
}

/// Sky brightness from the background median. `None` without gain, exposure
/// time or pixel scale.
pub fn sky_brightness(background_adu: f64, instrument: &InstrumentMetadata) -> Option<SkyBrightness> {
    let signal = sky_signal(background_adu, instrument)?;
    let pixel_scale = instrument.pixel_scale?;
    let gain = instrument.gain?;
    let exposure = instrument.exposure?;

    Some(SkyBrightness {
        mag_per_arcsec2: surface_brightness(
            signal.electrons_per_second_per_pixel,
            pixel_scale,
            instrument.zero_point,
        ),
        electrons_per_pixel: signal.electrons_per_pixel,
        electrons_per_second_per_pixel: signal.electrons_per_second_per_pixel,
        adu_per_pixel: background_adu,
        exposure_time_used: exposure,
        gain,
        pixel_scale,
        zero_point: instrument.zero_point,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn instrument(gain: Option<f64>, scale: Option<f64>) -> InstrumentMetadata {
        InstrumentMetadata {
            exposure: Some(300.0),
            gain,
            read_noise: None,
            pixel_scale: scale,
            saturation_level: 65000.0,
            zero_point: 25.0,
        }
    }

    #[test]
    fn test_sky_magnitude() {
        let sky = sky_brightness(500.0, &instrument(Some(1.0), Some(1.2))).unwrap();
        assert_relative_eq!(sky.electrons_per_second_per_pixel, 500.0 / 300.0);
        let expected = 25.0 - 2.5 * ((500.0 / 300.0) / 1.44f64).log10();
        assert_relative_eq!(sky.mag_per_arcsec2.unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_calibration_nulls_block() {
        assert!(sky_brightness(500.0, &instrument(None, Some(1.2))).is_none());
        assert!(sky_brightness(500.0, &instrument(Some(1.0), None)).is_none());
    }

    #[test]
    fn test_non_positive_rate_has_no_magnitude() {
        let sky = sky_brightness(-3.0, &instrument(Some(1.0), Some(1.2))).unwrap();
        assert!(sky.mag_per_arcsec2.is_none());
    }
}
