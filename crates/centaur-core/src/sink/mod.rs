//! Report sinks: where finished reports go and how they are queried.

pub mod json_dir;
pub mod memory;
pub mod summary;

pub use json_dir::JsonDirSink;
pub use memory::MemorySink;
pub use summary::{summarize, CohortSummary, GroupBy, QuarantineRecord, RangeStats, Summary};

use std::path::Path;

use crate::error::Result;
use crate::report::Report;

/// Destination for per-file reports.
///
/// Reports are keyed by filename; storing a report for a filename already
/// present replaces the older one.
pub trait ReportSink: Send + Sync {
    fn put(&self, report: Report) -> Result<()>;

    /// Report for `filename`, or `CentaurError::NotFound`.
    fn get(&self, filename: &str) -> Result<Report>;

    /// One page of reports, newest first, and the total report count.
    /// Pages are numbered from 1.
    fn list(&self, page: usize, per_page: usize) -> Result<(Vec<Report>, usize)>;

    /// Aggregate statistics per cohort.
    fn summary(&self, group_by: GroupBy) -> Result<Summary>;

    /// Record that a file was given up on after repeated failures.
    fn note_quarantine(&self, path: &Path, attempts: u32) -> Result<()>;
}

/// Sort newest first, filename breaking ties, and cut out one page.
pub(crate) fn paginate(mut reports: Vec<Report>, page: usize, per_page: usize) -> (Vec<Report>, usize) {
    let total = reports.len();
    reports.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.file_info.filename.cmp(&b.file_info.filename))
    });
    let per_page = per_page.max(1);
    let start = (page.max(1) - 1).saturating_mul(per_page);
    let page_items = reports.into_iter().skip(start).take(per_page).collect();
    (page_items, total)
}
