use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use crate::error::{CentaurError, Result};
use crate::report::Report;

use super::summary::{summarize, GroupBy, QuarantineRecord, Summary};
use super::{paginate, ReportSink};

#[derive(Default)]
struct Inner {
    reports: HashMap<String, Report>,
    quarantined: Vec<QuarantineRecord>,
}

/// In-memory report sink.
#[derive(Default)]
pub struct MemorySink {
    inner: RwLock<Inner>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .reports
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemorySink {
    fn put(&self, report: Report) -> Result<()> {
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
        Ok(())
    }
}
