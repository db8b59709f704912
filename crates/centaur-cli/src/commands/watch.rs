use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use centaur_core::config::CentaurConfig;
use centaur_core::watch::{StartMode, Watcher};
use clap::{ArgGroup, Args};
use tracing::{info, warn};

use crate::logging;
use crate::progress::BarReporter;
use crate::summary::print_batch;

#[derive(Args)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["process_existing", "continuous"])
))]
pub struct WatchArgs {
    /// Analyze the files already present, then exit
    #[arg(long)]
    pub process_existing: bool,

    /// Keep watching for new files until Ctrl-C
    #[arg(long)]
    pub continuous: bool,

    /// With --continuous, analyze existing files before watching
    #[arg(long, requires = "continuous")]
    pub process_existing_first: bool,

    /// Maximum number of existing files to analyze
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Directory to watch
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Directory for reports, state and logs
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Poll interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

impl WatchArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut CentaurConfig) {
        if let Some(ref path) = self.path {
            config.watch.path = path.clone();
        }
        if let Some(ref output) = self.output {
            config.watch.output = output.clone();
        }
        if let Some(interval) = self.interval {
            config.watch.poll_interval_secs = interval;
        }
    }
}

pub fn run(args: &WatchArgs, mut config: CentaurConfig, verbose: bool) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let watch_path = config.watch.path.clone();
    if !watch_path.is_dir() {
        bail!("Watch path does not exist: {}", watch_path.display());
    }
    let _guard = logging::init_with_file(verbose, &config.watch.output)?;

    let watcher = Arc::new(
        Watcher::open(config)
            .context("Failed to open output directory")?
            .with_reporter(Arc::new(BarReporter::new())),
    );

    println!("Watching:  {}", watch_path.display());
    println!("Reports:   {}", watcher.config().watch.output.display());

    if args.process_existing {
        interrupt_on_ctrl_c(Arc::clone(&watcher))?;
        let summary = watcher.run_batch(args.max_files)?;
        print_batch(&summary);
        return Ok(());
    }

    let mode = if args.process_existing_first {
        StartMode::ProcessExisting {
            max_files: args.max_files,
        }
    } else {
        StartMode::NewFilesOnly
    };
    let started = watcher.start(mode)?;
    println!("{} (Ctrl-C to stop)", started.message);

    wait_for_ctrl_c()?;
    info!("Shutdown requested");
    let stopped = watcher.stop();
    println!(
        "{}: {} new files analyzed",
        stopped.message,
        watcher.status().total_new_files
    );
    Ok(())
}

/// Stop a batch after its file in flight once Ctrl-C arrives. The batch keeps
/// the calling thread and exits normally with what it committed.
fn interrupt_on_ctrl_c(watcher: Arc<Watcher>) -> Result<()> {
    thread::Builder::new()
        .name("centaur-signal".into())
        .spawn(move || match wait_for_ctrl_c() {
            Ok(()) => {
                info!("Shutdown requested; finishing the file in flight");
                watcher.interrupt();
            }
            Err(e) => warn!(error = %e, "Ctrl-C handler unavailable"),
        })
        .context("Failed to start signal thread")?;
    Ok(())
}

/// Block the calling thread until Ctrl-C.
fn wait_for_ctrl_c() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("Failed to listen for Ctrl-C")
}
