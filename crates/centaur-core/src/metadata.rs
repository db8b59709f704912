use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::consts::ARCSEC_PER_MICRON_PER_MM;
use crate::error::{CentaurError, Result};
use crate::frame::{derive_rig, FileInfo, Frame};
use crate::io::fits::{FitsHeader, FitsReader};

/// Physical calibration values read from the header.
///
/// `None` means the value is not available; no instrument default is ever
/// substituted for a physical constant except the configured read noise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    /// Exposure time in seconds, always positive when present.
    pub exposure: Option<f64>,
    /// Electrons per ADU.
    pub gain: Option<f64>,
    /// Read noise in electrons.
    pub read_noise: Option<f64>,
    /// Arcseconds per pixel.
    pub pixel_scale: Option<f64>,
    /// Saturation level in ADU (SATURATE, or the sample type's full scale).
    pub saturation_level: f64,
    pub zero_point: f64,
}

/// Everything the analyzer needs to know about a frame besides its pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameMetadata {
    pub info: FileInfo,
    pub instrument: InstrumentMetadata,
}

/// Open a FITS file and extract its display metadata.
pub fn extract_file_info(path: &Path) -> Result<FileInfo> {
    let reader = FitsReader::open(path)?;
    let frame = reader.read_frame()?;
    Ok(file_info(&reader.header, &frame, path))
}

/// Extract display and calibration metadata for an opened frame.
///
/// Fails with `MalformedHeader` when an exposure keyword is present but not a
/// positive finite number.
pub fn extract_metadata(
    reader: &FitsReader,
    frame: &Frame,
    config: &AnalysisConfig,
) -> Result<FrameMetadata> {
    let header = &reader.header;
    let path = reader.path();

    let exposure = match header.first_f64(&["EXPTIME", "EXPOSURE"]) {
        Some(t) if t.is_finite() && t > 0.0 => Some(t),
        Some(t) => {
            return Err(CentaurError::malformed(
                path,
                format!("Exposure time must be positive, got {t}"),
            ))
        }
        None => {
            let err = CentaurError::MissingMetadata("EXPTIME".into());
            warn!(file = %path.display(), "{err}; exposure metrics will be null");
            None
        }
    };

    let gain = positive(header, &["EGAIN", "GAIN"], path);
    let read_noise = positive(header, &["RDNOISE"], path).or(config.read_noise);
    let pixel_scale = pixel_scale(header, path);

    let saturation_level = match positive(header, &["SATURATE"], path) {
        Some(level) => level,
        None => frame.full_scale(),
    };
    let zero_point = header
        .get_f64("MAGZPT")
        .filter(|z| z.is_finite())
        .unwrap_or(config.zero_point);

    let mut info = file_info(header, frame, path);
    info.exposure_from_header = exposure;
    info.gain = gain;
    info.saturation_level = Some(saturation_level);

    debug!(
        file = %info.filename,
        ?exposure,
        ?gain,
        ?read_noise,
        ?pixel_scale,
        saturation_level,
        "Extracted frame metadata"
    );

    Ok(FrameMetadata {
        info,
        instrument: InstrumentMetadata {
            exposure,
            gain,
            read_noise,
            pixel_scale,
            saturation_level,
            zero_point,
        },
    })
}

fn file_info(header: &FitsHeader, frame: &Frame, path: &Path) -> FileInfo {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let camera = header
        .get_text("INSTRUME")
        .unwrap_or_else(|| FileInfo::UNKNOWN_EQUIPMENT.to_string());
    let telescope = header
        .get_text("TELESCOP")
        .unwrap_or_else(|| FileInfo::UNKNOWN_EQUIPMENT.to_string());
    let rig = header
        .get_text("RIG")
        .unwrap_or_else(|| derive_rig(&camera, &telescope));

    FileInfo {
        filename,
        object: header
            .first_text(&["OBJECT", "OBJNAME"])
            .unwrap_or_else(|| FileInfo::UNKNOWN_OBJECT.to_string()),
        filter: header
            .first_text(&["FILTER", "FILT"])
            .unwrap_or_else(|| FileInfo::UNKNOWN_FILTER.to_string()),
        dimensions: (frame.width(), frame.height()),
        telescope,
        camera,
        rig,
        exposure_from_header: header.first_f64(&["EXPTIME", "EXPOSURE"]),
        gain: None,
        saturation_level: None,
        full_path: Some(path.display().to_string()),
    }
}

/// First positive finite value among `keys`. Unusable values are logged and ignored.
fn positive(header: &FitsHeader, keys: &[&str], path: &Path) -> Option<f64> {
    for key in keys {
        match header.get_f64(key) {
            Some(v) if v.is_finite() && v > 0.0 => return Some(v),
            Some(v) => warn!(file = %path.display(), key, value = v, "Ignoring non-positive keyword"),
            None => {}
        }
    }
    None
}

fn pixel_scale(header: &FitsHeader, path: &Path) -> Option<f64> {
    if let Some(scale) = positive(header, &["PIXSCALE", "SCALE"], path) {
        return Some(scale);
    }
    let pixel_size = positive(header, &["XPIXSZ"], path)?;
    let focal_length = positive(header, &["FOCALLEN"], path)?;
    Some(ARCSEC_PER_MICRON_PER_MM * pixel_size / focal_length)
}
