use std::path::PathBuf;

use anyhow::{bail, Result};
use centaur_core::config::CentaurConfig;
use centaur_core::pipeline::{process_batch, NoOpReporter, ProgressReporter};
use centaur_core::report::Report;
use centaur_core::sink::{MemorySink, ReportSink};
use clap::Args;

use super::open_reports;
use crate::progress::BarReporter;
use crate::summary::{print_batch, print_report};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// FITS files to analyze
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Store reports in the output directory
    #[arg(long)]
    pub save: bool,

    /// Report directory used with --save
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &AnalyzeArgs, config: &CentaurConfig) -> Result<()> {
    let sink: Box<dyn ReportSink> = if args.save {
        Box::new(open_reports(args.output.as_ref(), config)?)
    } else {
        Box::new(MemorySink::new())
    };
    let reporter: Box<dyn ProgressReporter> = if args.files.len() > 1 && !args.json {
        Box::new(BarReporter::new())
    } else {
        Box::new(NoOpReporter)
    };

    let summary = process_batch(&args.files, sink.as_ref(), config, reporter.as_ref());
    let reports = summary
        .processed
        .iter()
        .map(|name| sink.get(name))
        .collect::<centaur_core::error::Result<Vec<Report>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
        if args.files.len() > 1 || !summary.is_clean() {
            print_batch(&summary);
        }
    }

    if reports.is_empty() {
        bail!("No file could be analyzed");
    }
    Ok(())
}
