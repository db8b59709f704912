use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CentaurError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Malformed header in {path}: {reason}")]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("Watch path {path} unavailable: {reason}")]
    MountUnavailable { path: PathBuf, reason: String },

    #[error("{path} quarantined after {attempts} failed attempts")]
    Quarantined { path: PathBuf, attempts: u32 },

    #[error("Analysis not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Watcher is already running")]
    AlreadyRunning,
}

impl CentaurError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CentaurError>;
