use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::consts::REPORT_FILE_SUFFIX;
use crate::error::{CentaurError, Result};
use crate::report::Report;

use super::summary::{summarize, GroupBy, QuarantineRecord, Summary};
use super::{paginate, ReportSink};

const QUARANTINE_FILE: &str = "quarantined_files.json";

struct Inner {
    reports: HashMap<String, Report>,
    quarantined: Vec<QuarantineRecord>,
}

/// Report sink persisting one JSON document per analyzed file.
///
/// Documents are named `<stem>_centaur_analysis.json` with spaces replaced by
/// `_` and colons by `-`. All documents are loaded into memory on open.
pub struct JsonDirSink {
    dir: PathBuf,
    inner: RwLock<Inner>,
}

impl JsonDirSink {
    /// Open (creating if needed) a report directory and load existing reports.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            CentaurError::Storage(format!("cannot create {}: {e}", dir.display()))
        })?;

        let mut reports = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_report = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(REPORT_FILE_SUFFIX));
            if !is_report {
                continue;
            }
            match load_report(&path) {
                Ok(report) => {
                    reports.insert(report.file_info.filename.clone(), report);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
            }
        }

        let quarantine_path = dir.join(QUARANTINE_FILE);
        let quarantined = if quarantine_path.exists() {
            serde_json::from_slice(&fs::read(&quarantine_path)?)?
        } else {
            Vec::new()
        };

        info!(dir = %dir.display(), reports = reports.len(), "Opened report directory");
        Ok(Self {
            dir: dir.to_path_buf(),
            inner: RwLock::new(Inner {
                reports,
                quarantined,
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document holding the report for `filename`.
    pub fn report_path(&self, filename: &str) -> PathBuf {
        self.dir.join(report_file_name(filename))
    }
}

/// Document file name for a FITS filename.
pub fn report_file_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let safe = stem.replace(' ', "_").replace(':', "-");
    format!("{safe}{REPORT_FILE_SUFFIX}")
}

fn load_report(path: &Path) -> Result<Report> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write through a temporary file so readers never see a partial document.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| CentaurError::Storage(format!("cannot write {}: {e}", path.display())))
}

impl ReportSink for JsonDirSink {
    fn put(&self, report: Report) -> Result<()> {
        let path = self.report_path(report.filename());
        write_atomic(&path, &serde_json::to_vec_pretty(&report)?)?;
        debug!(path = %path.display(), "Report written");

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .reports
            .insert(report.file_info.filename.clone(), report);
        Ok(())
    }

    fn get(&self, filename: &str) -> Result<Report> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .reports
            .get(filename)
            .cloned()
            .ok_or_else(|| CentaurError::NotFound(filename.to_string()))
    }

    fn list(&self, page: usize, per_page: usize) -> Result<(Vec<Report>, usize)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(paginate(inner.reports.values().cloned().collect(), page, per_page))
    }

    fn summary(&self, group_by: GroupBy) -> Result<Summary> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(summarize(inner.reports.values(), &inner.quarantined, group_by))
    }

    fn note_quarantine(&self, path: &Path, attempts: u32) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.quarantined.push(QuarantineRecord {
            path: path.to_path_buf(),
            attempts,
        });
        let bytes = serde_json::to_vec_pretty(&inner.quarantined)?;
        write_atomic(&self.dir.join(QUARANTINE_FILE), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_file_name_is_sanitized() {
        assert_eq!(
            report_file_name("M 31_Ha_2024-01-01T22:10:05.fits"),
            "M_31_Ha_2024-01-01T22-10-05_centaur_analysis.json"
        );
        assert_eq!(report_file_name("frame.fit"), "frame_centaur_analysis.json");
    }
}
