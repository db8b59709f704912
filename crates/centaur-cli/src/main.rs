mod commands;
mod logging;
mod progress;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "centaur", about = "Exposure quality analyzer for astronomical FITS frames")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and analyze new FITS files
    Watch(commands::watch::WatchArgs),
    /// Analyze FITS files once
    Analyze(commands::analyze::AnalyzeArgs),
    /// Show FITS header metadata
    Info(commands::info::InfoArgs),
    /// List stored analyses, newest first
    List(commands::list::ListArgs),
    /// Show one stored analysis
    Show(commands::show::ShowArgs),
    /// Aggregate stored analyses per filter or rig
    Summary(commands::summary::SummaryArgs),
    /// Show processed-file state of an output directory
    Status(commands::status::StatusArgs),
    /// Print the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    // The watcher installs its own subscriber with a log file.
    if !matches!(cli.command, Commands::Watch(_)) {
        logging::init_console(cli.verbose, "warn");
    }

    match &cli.command {
        Commands::Watch(args) => commands::watch::run(args, config, cli.verbose),
        Commands::Analyze(args) => commands::analyze::run(args, &config),
        Commands::Info(args) => commands::info::run(args, &config),
        Commands::List(args) => commands::list::run(args, &config),
        Commands::Show(args) => commands::show::run(args, &config),
        Commands::Summary(args) => commands::summary::run(args, &config),
        Commands::Status(args) => commands::status::run(args, &config),
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
