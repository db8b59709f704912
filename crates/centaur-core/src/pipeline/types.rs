use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Scanning,
    Analyzing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "Scanning for FITS files"),
            Self::Analyzing => write!(f, "Analyzing frames"),
        }
    }
}

/// Thread-safe progress reporting for batch processing.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of files, if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One file has been handled, successfully or not.
    fn advance(&self, _items_done: usize, _file: &str) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// A file that could not be analyzed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of processing a set of files.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Filenames analyzed and stored.
    pub processed: Vec<String>,
    pub failed: Vec<FileFailure>,
    /// Files skipped because their identity was already processed.
    pub skipped: usize,
    /// Files given up on after repeated failures.
    pub quarantined: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.quarantined.is_empty()
    }
}
