mod orchestrator;
mod types;

pub use orchestrator::{analyze_file, analyze_reader, process_batch, process_file};
pub use types::{BatchSummary, FileFailure, NoOpReporter, PipelineStage, ProgressReporter};
