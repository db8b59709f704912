use std::path::PathBuf;

use anyhow::Result;
use centaur_core::api::{analyses_page, DEFAULT_PER_PAGE};
use centaur_core::config::CentaurConfig;
use clap::Args;
use console::Style;

use super::open_reports;

#[derive(Args)]
pub struct ListArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Analyses per page
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: usize,

    /// Report directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the page as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &ListArgs, config: &CentaurConfig) -> Result<()> {
    let sink = open_reports(args.output.as_ref(), config)?;
    let page = analyses_page(&sink, args.page, args.per_page)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!(
        "{:<40} {:<8} {:>8} {:>8}  {}",
        "File", "Filter", "Exp", "Rec", "Top recommendation"
    );
    for report in &page.analyses {
        let a = &report.analysis;
        let secs = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.0}s"));
        println!(
            "{:<40} {:<8} {:>8} {:>8}  {}",
            report.filename(),
            report.file_info.filter,
            secs(a.current_exposure),
            secs(a.recommended_exposure),
            report.top_recommendation().unwrap_or("")
        );
    }
    println!(
        "{}",
        dim.apply_to(format!(
            "page {} of {} ({} analyses)",
            page.page,
            page.pages.max(1),
            page.total
        ))
    );
    Ok(())
}
