/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Arcseconds per radian divided by 1000, for pixel scale from microns and millimetres.
pub const ARCSEC_PER_MICRON_PER_MM: f64 = 206.265;

/// Photometric zero point used when the header carries no MAGZPT.
pub const DEFAULT_ZERO_POINT: f64 = 25.0;

/// Sigma threshold for sigma-clipped background statistics.
pub const DEFAULT_CLIP_SIGMA: f64 = 3.0;

/// Maximum rejection passes for sigma-clipped statistics.
pub const DEFAULT_CLIP_ITERATIONS: usize = 5;

/// Sigma above the background median for the source mask used during background estimation.
pub const DEFAULT_SOURCE_MASK_SIGMA: f64 = 5.0;

/// Sigma above the background median for counting detected sources.
pub const DEFAULT_SOURCE_COUNT_SIGMA: f64 = 3.0;

/// Minimum connected pixels for a region to count as a source.
pub const DEFAULT_MIN_SOURCE_PIXELS: usize = 5;

/// Fewer remaining background pixels than this falls back to a wider pixel set.
pub const MIN_BACKGROUND_PIXELS: usize = 1000;

/// Pixels at or above this fraction of saturation are masked from the background.
pub const BACKGROUND_HOT_MASK_FRACTION: f32 = 0.90;

/// Lower edge of the "high saturation" band (fraction of saturation level).
pub const HIGH_SATURATION_FRACTION: f32 = 0.80;

/// Target SNR for a 10-sigma object when optimizing exposure.
pub const DEFAULT_TARGET_SNR: f64 = 10.0;

/// Bounds applied to the recommended exposure (seconds).
pub const DEFAULT_MIN_EXPOSURE_SECS: f64 = 30.0;
pub const DEFAULT_MAX_EXPOSURE_SECS: f64 = 600.0;

/// Bounds applied to the optimal sub length (seconds).
pub const DEFAULT_MIN_SUB_SECS: f64 = 60.0;
pub const DEFAULT_MAX_SUB_SECS: f64 = 300.0;

/// Multiple of read noise squared the sky background should reach per sub.
pub const DEFAULT_SWAMP_FACTOR: f64 = 1.0;

/// Sky brighter than this (mag/arcsec²) is reported as a bright sky.
pub const BRIGHT_SKY_MAG: f64 = 19.0;

/// Sky darker than this (mag/arcsec²) is reported as a dark sky.
pub const DARK_SKY_MAG: f64 = 21.0;

/// Default seconds between directory polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Upper bound for the backoff delay while the watch path is unavailable.
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 120;

/// Time allowed for one directory listing before the mount is treated as stale.
pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 30;

/// Files modified more recently than this are assumed to still be written.
pub const DEFAULT_SETTLE_SECS: u64 = 2;

/// Consecutive failures for one identity before it is quarantined.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Extensions treated as FITS images (compared case-insensitively).
pub const DEFAULT_FITS_EXTENSIONS: [&str; 3] = ["fits", "fit", "fts"];

/// Version string stamped on every report.
pub const ANALYZER_VERSION: &str = "1.2";

/// Suffix of per-file report documents written by the JSON sink.
pub const REPORT_FILE_SUFFIX: &str = "_centaur_analysis.json";

/// File name of the persisted processed-identity store.
pub const PROCESSED_STORE_FILE: &str = "processed_files.json";
