use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::ANALYZER_VERSION;
use crate::frame::FileInfo;
use crate::photometry::{
    ImageStats, NoiseRegime, OptimizationReason, SaturationAnalysis, SkyBrightness, SnrMetrics,
};

/// Narrowband exposure relative to the H-alpha baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShoRecommendation {
    pub adjustment_factor: f64,
    pub recommended_exposure: f64,
    pub note: String,
}

/// Computed metrics for one frame. Absent values mean "not computable".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub current_exposure: Option<f64>,
    #[serde(default)]
    pub recommended_exposure: Option<f64>,
    #[serde(default)]
    pub exposure_factor: Option<f64>,
    pub optimization_reason: OptimizationReason,
    #[serde(default)]
    pub optimal_sub_length: Option<f64>,
    #[serde(default)]
    pub noise_regime: Option<NoiseRegime>,
    #[serde(default)]
    pub snr_metrics: Option<SnrMetrics>,
    #[serde(default)]
    pub sky_brightness: Option<SkyBrightness>,
    #[serde(default)]
    pub saturation_analysis: Option<SaturationAnalysis>,
    #[serde(default)]
    pub sho_recommendation: Option<ShoRecommendation>,
    #[serde(default)]
    pub image_stats: Option<ImageStats>,
}

impl AnalysisResult {
    /// A result with every derived metric absent.
    pub fn not_computable(current_exposure: Option<f64>) -> Self {
        Self {
            current_exposure,
            recommended_exposure: None,
            exposure_factor: None,
            optimization_reason: OptimizationReason::NotComputable,
            optimal_sub_length: None,
            noise_regime: None,
            snr_metrics: None,
            sky_brightness: None,
            saturation_analysis: None,
            sho_recommendation: None,
            image_stats: None,
        }
    }
}

/// The persisted unit: one per analyzed file, never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub file_info: FileInfo,
    pub timestamp: DateTime<Utc>,
    pub analysis: AnalysisResult,
    pub recommendations: Vec<String>,
    #[serde(default = "default_version")]
    pub analyzer_version: String,
}

fn default_version() -> String {
    ANALYZER_VERSION.to_string()
}

impl Report {
    pub fn new(file_info: FileInfo, analysis: AnalysisResult, recommendations: Vec<String>) -> Self {
        Self {
            file_info,
            timestamp: Utc::now(),
            analysis,
            recommendations,
            analyzer_version: default_version(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.file_info.filename
    }

    /// First recommendation line, as shown in compact listings.
    pub fn top_recommendation(&self) -> Option<&str> {
        self.recommendations.first().map(String::as_str)
    }
}
