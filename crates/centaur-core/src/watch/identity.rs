use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Composite identity of a file version: path, size and modification time.
///
/// Overwriting a file in place yields a new identity, so the new content is
/// analyzed again.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub size: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            size,
            mtime_secs: modified.timestamp(),
            mtime_nanos: modified.timestamp_subsec_nanos(),
        }
    }

    /// Identity from filesystem metadata. `None` when the platform reports no mtime.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Option<Self> {
        let modified = metadata.modified().ok()?;
        Some(Self::new(path, metadata.len(), DateTime::<Utc>::from(modified)))
    }

    pub fn modified(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.mtime_secs, self.mtime_nanos)
            .single()
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bytes, modified {})",
            self.path.display(),
            self.size,
            self.modified().to_rfc3339()
        )
    }
}
