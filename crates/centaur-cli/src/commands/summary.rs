use std::path::PathBuf;

use anyhow::Result;
use centaur_core::config::CentaurConfig;
use centaur_core::sink::{GroupBy, ReportSink};
use clap::{Args, ValueEnum};

use super::open_reports;
use crate::summary::print_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum GroupByArg {
    Filter,
    Rig,
}

impl From<GroupByArg> for GroupBy {
    fn from(arg: GroupByArg) -> Self {
        match arg {
            GroupByArg::Filter => GroupBy::Filter,
            GroupByArg::Rig => GroupBy::Rig,
        }
    }
}

#[derive(Args)]
pub struct SummaryArgs {
    /// Cohort key
    #[arg(long, value_enum, default_value = "filter")]
    pub by: GroupByArg,

    /// Report directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &SummaryArgs, config: &CentaurConfig) -> Result<()> {
    let sink = open_reports(args.output.as_ref(), config)?;
    let summary = sink.summary(args.by.into())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}
