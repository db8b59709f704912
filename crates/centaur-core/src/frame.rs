use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single grayscale image frame.
/// Pixel values are f32 in raw ADU, after BZERO/BSCALE.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// FITS BITPIX of the stored samples (8, 16, 32, 64, -32, -64)
    pub bitpix: i32,
}

impl Frame {
    pub fn new(data: Array2<f32>, bitpix: i32) -> Self {
        Self { data, bitpix }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Full-scale value of the stored sample type, used when the header has no SATURATE.
    pub fn full_scale(&self) -> f64 {
        match self.bitpix {
            8 => u8::MAX as f64,
            16 => u16::MAX as f64,
            32 => u32::MAX as f64,
            _ => 65535.0,
        }
    }
}

/// Display metadata about a frame, as surfaced in every report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub object: String,
    pub filter: String,
    /// (width, height) taken from the pixel array.
    pub dimensions: (usize, usize),
    pub telescope: String,
    pub camera: String,
    pub rig: String,
    #[serde(default)]
    pub exposure_from_header: Option<f64>,
    #[serde(default)]
    pub gain: Option<f64>,
    #[serde(default)]
    pub saturation_level: Option<f64>,
    #[serde(default)]
    pub full_path: Option<String>,
}

impl FileInfo {
    pub const UNKNOWN_OBJECT: &'static str = "Unknown";
    pub const UNKNOWN_FILTER: &'static str = "N/A";
    pub const UNKNOWN_EQUIPMENT: &'static str = "Unknown";
}

/// Derive the rig label from camera and telescope names: first word of each.
pub fn derive_rig(camera: &str, telescope: &str) -> String {
    format!("{}/{}", short_name(camera), short_name(telescope))
}

fn short_name(name: &str) -> &str {
    name.split_whitespace()
        .next()
        .unwrap_or(FileInfo::UNKNOWN_EQUIPMENT)
}
