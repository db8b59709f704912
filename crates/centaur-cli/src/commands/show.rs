use std::path::PathBuf;

use anyhow::Result;
use centaur_core::api::ErrorBody;
use centaur_core::config::CentaurConfig;
use centaur_core::sink::ReportSink;
use clap::Args;

use super::open_reports;
use crate::summary::print_report;

#[derive(Args)]
pub struct ShowArgs {
    /// FITS filename the analysis was stored under
    pub filename: String,

    /// Report directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &ShowArgs, config: &CentaurConfig) -> Result<()> {
    let sink = open_reports(args.output.as_ref(), config)?;
    match sink.get(&args.filename) {
        Ok(report) if args.json => println!("{}", serde_json::to_string_pretty(&report)?),
        Ok(report) => print_report(&report),
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ErrorBody::from(&e))?);
            }
            return Err(e.into());
        }
    }
    Ok(())
}
