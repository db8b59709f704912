use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::api::{ControlMessage, WatcherStatus};
use crate::config::CentaurConfig;
use crate::consts::PROCESSED_STORE_FILE;
use crate::error::{CentaurError, Result};
use crate::io::fits::FitsReader;
use crate::pipeline::{
    analyze_reader, BatchSummary, FileFailure, NoOpReporter, PipelineStage, ProgressReporter,
};
use crate::report::Report;
use crate::sink::{JsonDirSink, ReportSink};

use super::identity::FileIdentity;
use super::scan::{read_with_timeout, scan, ScanOptions, ScanResult};
use super::store::{JsonFileStore, ProcessedStore};
use super::tracker::{FailureOutcome, FileTracker};

/// How the seen-set is initialised when the watcher starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    /// Files present at start are marked seen without analysis.
    NewFilesOnly,
    /// Files present at start are analyzed first. Beyond `max_files`, the
    /// rest of the backlog is marked seen.
    ProcessExisting { max_files: Option<usize> },
}

/// State shared by the control handle and the loop thread.
struct Engine {
    config: CentaurConfig,
    sink: Arc<dyn ReportSink>,
    store: Arc<dyn ProcessedStore>,
    tracker: Mutex<FileTracker>,
    processed: AtomicUsize,
    stop: AtomicBool,
}

struct LoopHandle {
    wake: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Polling directory watcher with a start/stop control surface.
///
/// One loop thread owns dispatch; control calls from other threads only
/// flip the stop flag and wake the loop. Files are analyzed one at a time.
pub struct Watcher {
    engine: Arc<Engine>,
    running: Mutex<Option<LoopHandle>>,
    reporter: Arc<dyn ProgressReporter>,
}

impl Watcher {
    /// Create a watcher, resuming the seen-set from `store`.
    pub fn new(
        config: CentaurConfig,
        sink: Arc<dyn ReportSink>,
        store: Arc<dyn ProcessedStore>,
    ) -> Result<Self> {
        config.validate()?;
        let state = store.load()?;
        let tracker = FileTracker::from_state(state, config.watch.max_retries);
        info!(
            path = %config.watch.path.display(),
            known = tracker.processed_len(),
            "Watcher created"
        );

        Ok(Self {
            engine: Arc::new(Engine {
                config,
                sink,
                store,
                tracker: Mutex::new(tracker),
                processed: AtomicUsize::new(0),
                stop: AtomicBool::new(false),
            }),
            running: Mutex::new(None),
            reporter: Arc::new(NoOpReporter),
        })
    }

    /// Watcher writing reports and processed-file state into the configured
    /// output directory.
    pub fn open(config: CentaurConfig) -> Result<Self> {
        let output = config.watch.output.clone();
        let sink = Arc::new(JsonDirSink::open(&output)?);
        let store = Arc::new(JsonFileStore::new(output.join(PROCESSED_STORE_FILE)));
        Self::new(config, sink, store)
    }

    /// Progress reporter used while a backlog of existing files is processed.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &CentaurConfig {
        &self.engine.config
    }

    pub fn sink(&self) -> Arc<dyn ReportSink> {
        Arc::clone(&self.engine.sink)
    }

    /// Start the poll loop. Starting a running watcher changes nothing.
    pub fn start(&self, mode: StartMode) -> Result<ControlMessage> {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|h| !h.thread.is_finished()) {
            return Ok(ControlMessage::new("Watcher already running"));
        }
        if let Some(stale) = running.take() {
            let _ = stale.thread.join();
        }

        self.engine.stop.store(false, Ordering::SeqCst);
        let (wake, wake_rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let reporter = Arc::clone(&self.reporter);
        let thread = thread::Builder::new()
            .name("centaur-watcher".into())
            .spawn(move || engine.run_loop(mode, wake_rx, reporter.as_ref()))?;

        *running = Some(LoopHandle { wake, thread });
        info!(?mode, "Watcher started");
        Ok(ControlMessage::new("Watcher started"))
    }

    /// Ask the loop to stop and wait for the file in flight to finish.
    /// Stopping a stopped watcher changes nothing.
    pub fn stop(&self) -> ControlMessage {
        self.engine.stop.store(true, Ordering::SeqCst);
        let handle = self.lock_running().take();
        match handle {
            Some(handle) => {
                let _ = handle.wake.send(());
                if handle.thread.join().is_err() {
                    error!("Watcher loop panicked");
                }
                info!("Watcher stopped");
                ControlMessage::new("Watcher stopped")
            }
            None => ControlMessage::new("Watcher not running"),
        }
    }

    /// Ask a batch or poll cycle running on another thread to stop after the
    /// file in flight. Unlike [`Watcher::stop`] this does not wait.
    pub fn interrupt(&self) {
        self.engine.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.lock_running().as_ref() {
            let _ = handle.wake.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|h| !h.thread.is_finished())
    }

    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            watcher_running: self.is_running(),
            total_new_files: self.engine.processed.load(Ordering::SeqCst),
        }
    }

    /// Analyze the files already present, at most `max_files` of them, on the
    /// calling thread. Files beyond the cap stay unseen.
    pub fn run_batch(&self, max_files: Option<usize>) -> Result<BatchSummary> {
        if self.is_running() {
            return Err(CentaurError::AlreadyRunning);
        }
        self.engine.stop.store(false, Ordering::SeqCst);
        let summary = self
            .engine
            .poll_cycle(max_files, false, Some(self.reporter.as_ref()))?;
        self.engine.persist();
        Ok(summary)
    }

    /// Run a single poll cycle on the calling thread.
    pub fn poll_once(&self) -> Result<BatchSummary> {
        if self.is_running() {
            return Err(CentaurError::AlreadyRunning);
        }
        self.engine.stop.store(false, Ordering::SeqCst);
        self.engine.poll_cycle(None, false, None)
    }

    /// Analyze one file now, whether or not it was seen before.
    pub fn process_now(&self, path: &Path) -> Result<Report> {
        let meta = std::fs::metadata(path)
            .map_err(|e| CentaurError::unreadable(path, e.to_string()))?;
        let identity = FileIdentity::from_metadata(path, &meta)
            .ok_or_else(|| CentaurError::unreadable(path, "no modification time"))?;

        let report = self.engine.analyze_identity(&identity)?.ok_or_else(|| {
            CentaurError::unreadable(path, "file changed while it was read")
        })?;
        self.engine.lock_tracker().mark_done(&identity);
        self.engine.processed.fetch_add(1, Ordering::SeqCst);
        self.engine.persist();
        Ok(report)
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if self.lock_running().is_some() {
            self.stop();
        }
    }
}

impl Engine {
    fn lock_tracker(&self) -> MutexGuard<'_, FileTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn scan_options(&self) -> ScanOptions {
        let watch = &self.config.watch;
        ScanOptions {
            extensions: watch.extensions.iter().map(|e| e.to_lowercase()).collect(),
            settle: watch.settle_time(),
            timeout: watch.io_timeout(),
        }
    }

    fn scan(&self) -> Result<ScanResult> {
        let result = scan(&self.config.watch.path, &self.scan_options())?;
        debug!(
            ready = result.ready.len(),
            settling = result.settling,
            "Directory listed"
        );
        Ok(result)
    }

    fn run_loop(&self, mode: StartMode, wake: mpsc::Receiver<()>, reporter: &dyn ProgressReporter) {
        let interval = self.config.watch.poll_interval();
        let max_backoff = self.config.watch.max_backoff();
        let mut delay = interval;
        let mut initialised = false;

        while !self.stop_requested() {
            let result = if initialised {
                self.poll_cycle(None, false, None)
            } else {
                self.initialise(mode, reporter)
            };

            match result {
                Ok(summary) => {
                    initialised = true;
                    delay = interval;
                    if !summary.processed.is_empty() || !summary.failed.is_empty() {
                        info!(
                            processed = summary.processed.len(),
                            failed = summary.failed.len(),
                            "Poll cycle complete"
                        );
                    }
                }
                Err(CentaurError::MountUnavailable { path, reason }) => {
                    delay = (delay * 2).min(max_backoff);
                    warn!(
                        path = %path.display(),
                        %reason,
                        retry_in = ?delay,
                        "Watch path unavailable"
                    );
                }
                Err(e) => {
                    delay = interval;
                    error!(error = %e, "Poll cycle failed");
                }
            }

            if self.stop_requested() {
                break;
            }
            // Woken early by `stop`; the flag is checked at the top.
            let _ = wake.recv_timeout(delay);
        }

        self.persist();
        info!("Watcher loop exited");
    }

    fn initialise(&self, mode: StartMode, reporter: &dyn ProgressReporter) -> Result<BatchSummary> {
        match mode {
            StartMode::NewFilesOnly => {
                let listing = self.scan()?;
                let seeded = self.lock_tracker().seed(&listing.ready);
                self.persist();
                info!(seeded, "Existing files marked as seen; watching for new files");
                Ok(BatchSummary {
                    skipped: listing.ready.len(),
                    ..BatchSummary::default()
                })
            }
            StartMode::ProcessExisting { max_files } => {
                info!(?max_files, "Processing existing files first");
                self.poll_cycle(max_files, true, Some(reporter))
            }
        }
    }

    /// List the tree and dispatch unseen identities in path order.
    ///
    /// With `limit`, identities beyond it are either marked seen
    /// (`seed_overflow`) or left for later.
    fn poll_cycle(
        &self,
        limit: Option<usize>,
        seed_overflow: bool,
        reporter: Option<&dyn ProgressReporter>,
    ) -> Result<BatchSummary> {
        if let Some(r) = reporter {
            r.begin_stage(PipelineStage::Scanning, None);
        }
        let listing = self.scan();
        if let Some(r) = reporter {
            r.finish_stage();
        }
        let listing = listing?;
        let mut fresh = self.lock_tracker().unseen(&listing.ready);
        let mut summary = BatchSummary {
            skipped: listing.ready.len() - fresh.len(),
            ..BatchSummary::default()
        };

        if let Some(limit) = limit {
            if fresh.len() > limit {
                let overflow = fresh.split_off(limit);
                if seed_overflow {
                    let seeded = self.lock_tracker().seed(&overflow);
                    info!(seeded, limit, "Backlog beyond limit marked as seen");
                } else {
                    info!(left = overflow.len(), limit, "Backlog beyond limit left unprocessed");
                }
            }
        }
        let per_poll = self.config.watch.max_files_per_poll;
        if per_poll > 0 && fresh.len() > per_poll {
            debug!(deferred = fresh.len() - per_poll, "Per-poll cap reached");
            fresh.truncate(per_poll);
        }
        if fresh.is_empty() {
            return Ok(summary);
        }

        info!(count = fresh.len(), "Found new FITS files");
        if let Some(r) = reporter {
            r.begin_stage(PipelineStage::Analyzing, Some(fresh.len()));
        }
        for (i, identity) in fresh.iter().enumerate() {
            if self.stop_requested() {
                info!(remaining = fresh.len() - i, "Stop requested; remaining files left for later");
                break;
            }
            self.dispatch(identity, &mut summary);
            if let Some(r) = reporter {
                r.advance(i + 1, &identity.file_name());
            }
        }
        if let Some(r) = reporter {
            r.finish_stage();
        }

        self.persist();
        Ok(summary)
    }

    fn dispatch(&self, identity: &FileIdentity, summary: &mut BatchSummary) {
        let name = identity.file_name();
        let err = match self.analyze_identity(identity) {
            Ok(Some(report)) => {
                self.lock_tracker().mark_done(identity);
                self.processed.fetch_add(1, Ordering::SeqCst);
                info!(file = %name, filter = %report.file_info.filter, "Analyzed");
                summary.processed.push(report.file_info.filename);
                return;
            }
            Ok(None) => {
                debug!(identity = %identity, "File changed while reading; will retry");
                return;
            }
            Err(e) => e,
        };

        let outcome = self.lock_tracker().record_failure(identity);
        summary.failed.push(FileFailure {
            path: identity.path.clone(),
            reason: err.to_string(),
        });
        match outcome {
            FailureOutcome::Retry { attempts } => {
                warn!(file = %name, identity = %identity, attempts, error = %err, "Analysis failed; will retry");
            }
            FailureOutcome::Quarantined { attempts } => {
                let quarantined = CentaurError::Quarantined {
                    path: identity.path.clone(),
                    attempts,
                };
                error!(identity = %identity, error = %err, "{quarantined}");
                if let Err(e) = self.sink.note_quarantine(&identity.path, attempts) {
                    warn!(error = %e, "Could not record quarantine");
                }
                summary.quarantined.push(identity.path.clone());
            }
        }
    }

    /// Read, analyze and store one identity. `Ok(None)` when the file no
    /// longer matches the identity (still being written).
    fn analyze_identity(&self, identity: &FileIdentity) -> Result<Option<Report>> {
        let bytes = read_with_timeout(&identity.path, self.config.watch.io_timeout())?;
        if bytes.len() as u64 != identity.size {
            return Ok(None);
        }
        let reader = FitsReader::from_bytes(bytes, &identity.path)?;
        let report = analyze_reader(&reader, &self.config)?;
        self.sink.put(report.clone())?;
        Ok(Some(report))
    }

    fn persist(&self) {
        let state = self.lock_tracker().snapshot();
        if let Err(e) = self.store.save(&state) {
            warn!(error = %e, "Could not save processed-file state");
        }
    }
}
