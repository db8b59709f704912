//! Payloads of the dashboard's JSON contract. Field names are part of the
//! contract and must not change.

use serde::{Deserialize, Serialize};

use crate::error::{CentaurError, Result};
use crate::report::Report;
use crate::sink::ReportSink;

/// Default page size of `GET /api/analyses`.
pub const DEFAULT_PER_PAGE: usize = 20;

/// `GET /api/analyses?page=N&per_page=M`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysesPage {
    pub analyses: Vec<Report>,
    pub pages: usize,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// `GET /api/watcher/status`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStatus {
    pub watcher_running: bool,
    pub total_new_files: usize,
}

/// `GET /api/watcher/start` and `GET /api/watcher/stop`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub message: String,
}

impl ControlMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned with a 404 or 500 status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    /// HTTP status code a handler should answer with for `err`.
    pub fn status_code(err: &CentaurError) -> u16 {
        match err {
            CentaurError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

impl From<&CentaurError> for ErrorBody {
    fn from(err: &CentaurError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Build one page of the analyses listing. Pages are numbered from 1.
pub fn analyses_page(sink: &dyn ReportSink, page: usize, per_page: usize) -> Result<AnalysesPage> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let (analyses, total) = sink.list(page, per_page)?;
    Ok(AnalysesPage {
        analyses,
        pages: total.div_ceil(per_page),
        total,
        page,
        per_page,
    })
}
