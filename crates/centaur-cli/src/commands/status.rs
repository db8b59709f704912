use std::path::PathBuf;

use anyhow::Result;
use centaur_core::config::CentaurConfig;
use centaur_core::consts::PROCESSED_STORE_FILE;
use centaur_core::sink::ReportSink;
use centaur_core::watch::{JsonFileStore, ProcessedStore};
use clap::Args;

use super::open_reports;

#[derive(Args)]
pub struct StatusArgs {
    /// Report directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Processed and quarantined file counts recorded in an output directory.
pub fn run(args: &StatusArgs, config: &CentaurConfig) -> Result<()> {
    let dir = args.output.as_ref().unwrap_or(&config.watch.output);
    let state = JsonFileStore::new(dir.join(PROCESSED_STORE_FILE)).load()?;
    let sink = open_reports(Some(dir), config)?;
    let (_, reports) = sink.list(1, 1)?;

    println!("Output:       {}", dir.display());
    println!("Processed:    {}", state.processed.len());
    println!("Reports:      {}", reports);
    println!("Quarantined:  {}", state.quarantined.len());
    for identity in &state.quarantined {
        println!("  {}", identity);
    }
    Ok(())
}
