use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::CentaurConfig;
use crate::error::Result;
use crate::io::fits::FitsReader;
use crate::metadata::extract_metadata;
use crate::photometry::analyze_frame;
use crate::recommend::recommend;
use crate::report::Report;
use crate::sink::ReportSink;

use super::types::{BatchSummary, FileFailure, PipelineStage, ProgressReporter};

/// Run metadata extraction, analysis and recommendations on an opened file.
pub fn analyze_reader(reader: &FitsReader, config: &CentaurConfig) -> Result<Report> {
    let frame = reader.read_frame()?;
    let metadata = extract_metadata(reader, &frame, &config.analysis)?;

    let mut analysis = analyze_frame(&frame, &metadata.instrument, &config.analysis, &config.policy);
    let recs = recommend(&analysis, &config.policy);
    analysis.sho_recommendation = recs.sho;

    Ok(Report::new(metadata.info, analysis, recs.lines))
}

/// Analyze one FITS file from disk.
pub fn analyze_file(path: &Path, config: &CentaurConfig) -> Result<Report> {
    let reader = FitsReader::open(path)?;
    analyze_reader(&reader, config)
}

/// Analyze one file and store its report.
pub fn process_file(path: &Path, sink: &dyn ReportSink, config: &CentaurConfig) -> Result<Report> {
    let report = analyze_file(path, config)?;
    sink.put(report.clone())?;
    info!(
        file = %report.filename(),
        filter = %report.file_info.filter,
        "Analysis stored"
    );
    Ok(report)
}

/// Process files one after another. A failing file is recorded and the
/// batch moves on.
pub fn process_batch(
    paths: &[PathBuf],
    sink: &dyn ReportSink,
    config: &CentaurConfig,
    reporter: &dyn ProgressReporter,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    reporter.begin_stage(PipelineStage::Analyzing, Some(paths.len()));

    for (i, path) in paths.iter().enumerate() {
        match process_file(path, sink, config) {
            Ok(report) => summary.processed.push(report.file_info.filename),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Analysis failed");
                summary.failed.push(FileFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        reporter.advance(i + 1, &name);
    }

    reporter.finish_stage();
    info!(
        processed = summary.processed.len(),
        failed = summary.failed.len(),
        "Batch complete"
    );
    summary
}
