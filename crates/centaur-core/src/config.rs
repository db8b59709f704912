use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CLIP_ITERATIONS, DEFAULT_CLIP_SIGMA, DEFAULT_FITS_EXTENSIONS,
    DEFAULT_LISTING_TIMEOUT_SECS, DEFAULT_MAX_BACKOFF_SECS, DEFAULT_MAX_EXPOSURE_SECS,
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_SUB_SECS, DEFAULT_MIN_EXPOSURE_SECS, DEFAULT_MIN_SOURCE_PIXELS,
    DEFAULT_MIN_SUB_SECS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SETTLE_SECS,
    DEFAULT_SOURCE_COUNT_SIGMA, DEFAULT_SOURCE_MASK_SIGMA, DEFAULT_SWAMP_FACTOR,
    DEFAULT_TARGET_SNR, DEFAULT_ZERO_POINT,
};
use crate::error::{CentaurError, Result};
use crate::policy::PolicyTable;

/// Complete configuration, loadable from a TOML document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CentaurConfig {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub policy: PolicyTable,
}

impl CentaurConfig {
    /// Reject settings the watcher or analyzer cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.watch.validate()?;
        self.analysis.validate()?;
        self.policy.validate()
    }
}

/// Directory watching and dispatch settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root of the watched directory tree.
    #[serde(default = "default_watch_path")]
    pub path: PathBuf,
    /// Directory for reports, processed-file state and logs.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Files modified more recently than this are left for a later poll.
    #[serde(default = "default_settle")]
    pub settle_secs: u64,
    /// Time allowed for one directory listing or file read.
    #[serde(default = "default_listing_timeout")]
    pub io_timeout_secs: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
    /// Consecutive failures for one identity before it is quarantined.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Files dispatched per poll cycle, 0 for no limit.
    #[serde(default)]
    pub max_files_per_poll: usize,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_watch_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_output() -> PathBuf {
    PathBuf::from("Centaur_Analysis")
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_settle() -> u64 {
    DEFAULT_SETTLE_SECS
}
fn default_listing_timeout() -> u64 {
    DEFAULT_LISTING_TIMEOUT_SECS
}
fn default_max_backoff() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_extensions() -> Vec<String> {
    DEFAULT_FITS_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            path: default_watch_path(),
            output: default_output(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            settle_secs: DEFAULT_SETTLE_SECS,
            io_timeout_secs: DEFAULT_LISTING_TIMEOUT_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_files_per_poll: 0,
            extensions: default_extensions(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs.max(self.poll_interval_secs))
    }

    fn validate(&self) -> Result<()> {
        if self.io_timeout_secs == 0 {
            return Err(CentaurError::InvalidConfig(
                "watch.io_timeout_secs must be positive".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(CentaurError::InvalidConfig(
                "watch.max_retries must be at least 1".into(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(CentaurError::InvalidConfig(
                "watch.extensions must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Numerical settings of the photometric analyzer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Rejection threshold for sigma-clipped statistics.
    #[serde(default = "default_clip_sigma")]
    pub clip_sigma: f64,
    #[serde(default = "default_clip_iterations")]
    pub clip_iterations: usize,
    /// Sources brighter than median + this many sigma are masked from the background.
    #[serde(default = "default_source_mask_sigma")]
    pub source_mask_sigma: f64,
    /// Regions brighter than median + this many sigma are counted as sources.
    #[serde(default = "default_source_count_sigma")]
    pub source_count_sigma: f64,
    #[serde(default = "default_min_source_pixels")]
    pub min_source_pixels: usize,
    /// Zero point used when the header has no MAGZPT.
    #[serde(default = "default_zero_point")]
    pub zero_point: f64,
    #[serde(default = "default_target_snr")]
    pub target_snr: f64,
    #[serde(default = "default_min_exposure")]
    pub min_exposure_secs: f64,
    #[serde(default = "default_max_exposure")]
    pub max_exposure_secs: f64,
    #[serde(default = "default_min_sub")]
    pub min_sub_secs: f64,
    #[serde(default = "default_max_sub")]
    pub max_sub_secs: f64,
    /// Sky electrons per sub as a multiple of read noise squared.
    #[serde(default = "default_swamp_factor")]
    pub swamp_factor: f64,
    /// Read noise (e-) for cameras that do not write RDNOISE.
    #[serde(default)]
    pub read_noise: Option<f64>,
}

fn default_clip_sigma() -> f64 {
    DEFAULT_CLIP_SIGMA
}
fn default_clip_iterations() -> usize {
    DEFAULT_CLIP_ITERATIONS
}
fn default_source_mask_sigma() -> f64 {
    DEFAULT_SOURCE_MASK_SIGMA
}
fn default_source_count_sigma() -> f64 {
    DEFAULT_SOURCE_COUNT_SIGMA
}
fn default_min_source_pixels() -> usize {
    DEFAULT_MIN_SOURCE_PIXELS
}
fn default_zero_point() -> f64 {
    DEFAULT_ZERO_POINT
}
fn default_target_snr() -> f64 {
    DEFAULT_TARGET_SNR
}
fn default_min_exposure() -> f64 {
    DEFAULT_MIN_EXPOSURE_SECS
}
fn default_max_exposure() -> f64 {
    DEFAULT_MAX_EXPOSURE_SECS
}
fn default_min_sub() -> f64 {
    DEFAULT_MIN_SUB_SECS
}
fn default_max_sub() -> f64 {
    DEFAULT_MAX_SUB_SECS
}
fn default_swamp_factor() -> f64 {
    DEFAULT_SWAMP_FACTOR
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            clip_sigma: DEFAULT_CLIP_SIGMA,
            clip_iterations: DEFAULT_CLIP_ITERATIONS,
            source_mask_sigma: DEFAULT_SOURCE_MASK_SIGMA,
            source_count_sigma: DEFAULT_SOURCE_COUNT_SIGMA,
            min_source_pixels: DEFAULT_MIN_SOURCE_PIXELS,
            zero_point: DEFAULT_ZERO_POINT,
            target_snr: DEFAULT_TARGET_SNR,
            min_exposure_secs: DEFAULT_MIN_EXPOSURE_SECS,
            max_exposure_secs: DEFAULT_MAX_EXPOSURE_SECS,
            min_sub_secs: DEFAULT_MIN_SUB_SECS,
            max_sub_secs: DEFAULT_MAX_SUB_SECS,
            swamp_factor: DEFAULT_SWAMP_FACTOR,
            read_noise: None,
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<()> {
        if self.clip_sigma <= 0.0 || self.target_snr <= 0.0 || self.swamp_factor <= 0.0 {
            return Err(CentaurError::InvalidConfig(
                "analysis.clip_sigma, target_snr and swamp_factor must be positive".into(),
            ));
        }
        if self.min_exposure_secs > self.max_exposure_secs {
            return Err(CentaurError::InvalidConfig(format!(
                "analysis exposure bounds inverted: {} > {}",
                self.min_exposure_secs, self.max_exposure_secs
            )));
        }
        if self.min_sub_secs > self.max_sub_secs {
            return Err(CentaurError::InvalidConfig(format!(
                "analysis sub length bounds inverted: {} > {}",
                self.min_sub_secs, self.max_sub_secs
            )));
        }
        Ok(())
    }
}
