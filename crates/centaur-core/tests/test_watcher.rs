#[allow(dead_code)]
mod common;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use common::*;
use tempfile::TempDir;

use centaur_core::config::CentaurConfig;
use centaur_core::error::CentaurError;
use centaur_core::sink::{GroupBy, JsonDirSink, MemorySink, ReportSink};
use centaur_core::watch::{JsonFileStore, MemoryStore, ProcessedStore, StartMode, Watcher};

fn light_frame(mean: f32) -> Vec<u8> {
    build_fits_f32(&uniform_sky(32, 32, mean, 10.0), &rig_keywords())
}

struct Fixture {
    _tmp: TempDir,
    watch: std::path::PathBuf,
    config: CentaurConfig,
    sink: Arc<MemorySink>,
    store: Arc<MemoryStore>,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let watch = tmp.path().join("lights");
        std::fs::create_dir_all(&watch).unwrap();
        let config = test_config(&watch, &tmp.path().join("out"));
        Self {
            _tmp: tmp,
            watch,
            config,
            sink: Arc::new(MemorySink::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    fn watcher(&self) -> Watcher {
        Watcher::new(self.config.clone(), self.sink.clone(), self.store.clone()).unwrap()
    }

    fn add(&self, name: &str, mean: f32) -> std::path::PathBuf {
        write_file(&self.watch, name, &light_frame(mean))
    }

    fn seen(&self) -> usize {
        self.store.load().unwrap().processed.len()
    }
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(50));
    }
}

fn touch(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

#[test]
fn test_unchanged_files_are_analyzed_once() {
    let fx = Fixture::new();
    fx.add("a.fits", 500.0);
    fx.add("b.fit", 600.0);
    let watcher = fx.watcher();

    let first = watcher.poll_once().unwrap();
    assert_eq!(first.processed, vec!["a.fits".to_string(), "b.fit".to_string()]);
    assert!(first.is_clean());

    let second = watcher.poll_once().unwrap();
    assert!(second.processed.is_empty());
    assert_eq!(second.skipped, 2);
    assert_eq!(fx.sink.len(), 2);
    assert_eq!(watcher.status().total_new_files, 2);
}

#[test]
fn test_changed_identity_is_reanalyzed() {
    let fx = Fixture::new();
    let path = fx.add("frame.fits", 500.0);
    let watcher = fx.watcher();
    assert_eq!(watcher.poll_once().unwrap().processed.len(), 1);

    // Same size, new modification time.
    touch(&path, SystemTime::now() - Duration::from_secs(3600));
    assert_eq!(watcher.poll_once().unwrap().processed, vec!["frame.fits".to_string()]);

    // New size.
    let mut bigger = light_frame(700.0);
    bigger.extend_from_slice(&[0u8; 2880]);
    std::fs::write(&path, bigger).unwrap();
    assert_eq!(watcher.poll_once().unwrap().processed.len(), 1);

    assert_eq!(fx.sink.len(), 1, "reports are keyed by filename");
    assert_eq!(fx.seen(), 1, "older identities of a path are dropped");
}

#[test]
fn test_corrupt_file_is_quarantined_after_retries() {
    let fx = Fixture::new();
    let bad = write_file(&fx.watch, "bad.fits", &vec![0u8; 4000]);
    fx.add("good.fits", 500.0);
    let watcher = fx.watcher();

    let first = watcher.poll_once().unwrap();
    assert_eq!(first.processed, vec!["good.fits".to_string()]);
    assert_eq!(first.failed.len(), 1);
    assert!(first.quarantined.is_empty());

    let second = watcher.poll_once().unwrap();
    assert_eq!(second.failed.len(), 1);
    assert!(second.quarantined.is_empty());

    let third = watcher.poll_once().unwrap();
    assert_eq!(third.quarantined, vec![bad.clone()]);

    let fourth = watcher.poll_once().unwrap();
    assert!(fourth.failed.is_empty());
    assert_eq!(fourth.skipped, 2);

    let summary = fx.sink.summary(GroupBy::Filter).unwrap();
    assert_eq!(summary.quarantined.len(), 1);
    assert_eq!(summary.quarantined[0].path, bad);
    assert_eq!(summary.quarantined[0].attempts, 3);
    assert_eq!(fx.store.load().unwrap().quarantined.len(), 1);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let fx = Fixture::new();
    let watcher = fx.watcher();
    assert!(!watcher.status().watcher_running);
    assert_eq!(watcher.stop().message, "Watcher not running");

    assert_eq!(watcher.start(StartMode::NewFilesOnly).unwrap().message, "Watcher started");
    assert_eq!(
        watcher.start(StartMode::NewFilesOnly).unwrap().message,
        "Watcher already running"
    );
    assert!(watcher.status().watcher_running);
    assert!(matches!(watcher.poll_once(), Err(CentaurError::AlreadyRunning)));

    assert_eq!(watcher.stop().message, "Watcher stopped");
    assert_eq!(watcher.stop().message, "Watcher not running");
    assert!(!watcher.status().watcher_running);

    assert_eq!(watcher.start(StartMode::NewFilesOnly).unwrap().message, "Watcher started");
    watcher.stop();
}

#[test]
fn test_new_files_only_skips_existing() {
    let fx = Fixture::new();
    fx.add("old.fits", 500.0);
    let watcher = fx.watcher();
    watcher.start(StartMode::NewFilesOnly).unwrap();
    wait_until("existing files to be seeded", || fx.seen() == 1);

    fx.add("new.fits", 520.0);
    wait_until("the new file to be analyzed", || fx.sink.len() == 1);
    watcher.stop();

    assert!(fx.sink.get("new.fits").is_ok());
    assert!(matches!(fx.sink.get("old.fits"), Err(CentaurError::NotFound(_))));
    assert_eq!(watcher.status().total_new_files, 1);
}

#[test]
fn test_process_existing_caps_backlog() {
    let fx = Fixture::new();
    for name in ["1.fits", "2.fits", "3.fits"] {
        fx.add(name, 500.0);
    }
    let watcher = fx.watcher();
    watcher
        .start(StartMode::ProcessExisting { max_files: Some(1) })
        .unwrap();
    wait_until("the backlog to be handled", || {
        watcher.status().total_new_files == 1 && fx.seen() == 3
    });
    watcher.stop();

    assert_eq!(fx.sink.len(), 1);
    assert!(fx.sink.get("1.fits").is_ok());
}

#[test]
fn test_batch_leaves_overflow_for_later() {
    let fx = Fixture::new();
    for name in ["a.fits", "b.fits", "c.fits"] {
        fx.add(name, 500.0);
    }
    let watcher = fx.watcher();

    let first = watcher.run_batch(Some(2)).unwrap();
    assert_eq!(first.processed.len(), 2);
    let rest = watcher.run_batch(None).unwrap();
    assert_eq!(rest.processed, vec!["c.fits".to_string()]);
    assert_eq!(rest.skipped, 2);
}

#[test]
fn test_per_poll_cap() {
    let mut fx = Fixture::new();
    fx.config.watch.max_files_per_poll = 2;
    for name in ["a.fits", "b.fits", "c.fits"] {
        fx.add(name, 500.0);
    }
    let watcher = fx.watcher();
    assert_eq!(watcher.poll_once().unwrap().processed.len(), 2);
    assert_eq!(watcher.poll_once().unwrap().processed.len(), 1);
}

#[test]
fn test_seen_set_survives_restart() {
    let fx = Fixture::new();
    fx.add("kept.fits", 500.0);
    let state_path = fx.config.watch.output.join("processed_files.json");

    {
        let store = Arc::new(JsonFileStore::new(&state_path));
        let watcher = Watcher::new(fx.config.clone(), fx.sink.clone(), store).unwrap();
        assert_eq!(watcher.poll_once().unwrap().processed.len(), 1);
    }
    assert!(state_path.exists());

    let store = Arc::new(JsonFileStore::new(&state_path));
    let watcher = Watcher::new(fx.config.clone(), fx.sink.clone(), store).unwrap();
    let summary = watcher.poll_once().unwrap();
    assert!(summary.processed.is_empty());
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_missing_watch_path() {
    let mut fx = Fixture::new();
    fx.config.watch.path = fx.watch.join("unmounted");
    let watcher = fx.watcher();
    assert!(matches!(
        watcher.poll_once(),
        Err(CentaurError::MountUnavailable { .. })
    ));
}

#[test]
fn test_settling_and_foreign_files_are_ignored() {
    let mut fx = Fixture::new();
    fx.config.watch.settle_secs = 3600;
    fx.add("fresh.fits", 500.0);
    write_file(&fx.watch, "notes.txt", b"not an image");
    write_file(&fx.watch, "._fresh.fits", b"resource fork");
    let watcher = fx.watcher();
    let summary = watcher.poll_once().unwrap();
    assert!(summary.processed.is_empty());
    assert!(summary.failed.is_empty());
    assert_eq!(summary.skipped, 0);
}

#[test]
fn test_nested_directories_are_watched() {
    let fx = Fixture::new();
    fx.add("night1/Ha/frame_001.fits", 500.0);
    fx.add("night2/OIII/frame_001.fts", 500.0);
    let watcher = fx.watcher();
    assert_eq!(watcher.poll_once().unwrap().processed.len(), 2);
}

#[test]
fn test_process_now_ignores_seen_set() {
    let fx = Fixture::new();
    let path = fx.add("again.fits", 500.0);
    let watcher = fx.watcher();
    watcher.poll_once().unwrap();

    let report = watcher.process_now(&path).unwrap();
    assert_eq!(report.filename(), "again.fits");
    assert_eq!(watcher.status().total_new_files, 2);
}

#[test]
fn test_open_writes_into_output_directory() {
    let fx = Fixture::new();
    fx.add("M 31.fits", 500.0);
    let watcher = Watcher::open(fx.config.clone()).unwrap();
    watcher.poll_once().unwrap();

    let output = &fx.config.watch.output;
    assert!(output.join("M_31_centaur_analysis.json").exists());
    drop(watcher);

    let reopened = JsonDirSink::open(output).unwrap();
    assert_eq!(reopened.get("M 31.fits").unwrap().file_info.filter, "Ha");
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut fx = Fixture::new();
    fx.config.watch.max_retries = 0;
    let err = Watcher::new(fx.config.clone(), fx.sink.clone(), fx.store.clone()).err();
    assert!(matches!(err, Some(CentaurError::InvalidConfig(_))));
}

#[test]
fn test_oversized_header_fails_without_stopping_the_loop() {
    let fx = Fixture::new();
    let huge = write_file(&fx.watch, "huge.fits", &build_fits_oversized());
    fx.add("good.fits", 500.0);
    let watcher = fx.watcher();

    let first = watcher.poll_once().unwrap();
    assert_eq!(first.processed, vec!["good.fits".to_string()]);
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].path, huge);
    assert!(first.failed[0].reason.contains("overflows"), "{}", first.failed[0].reason);

    watcher.poll_once().unwrap();
    let third = watcher.poll_once().unwrap();
    assert_eq!(third.quarantined, vec![huge]);
    assert_eq!(fx.store.load().unwrap().quarantined.len(), 1);
}

#[test]
fn test_loop_recovers_when_watch_path_appears() {
    let mut fx = Fixture::new();
    let late = fx.watch.join("late");
    fx.config.watch.path = late.clone();
    fx.config.watch.max_backoff_secs = 2;
    let watcher = fx.watcher();
    watcher.start(StartMode::NewFilesOnly).unwrap();

    thread::sleep(Duration::from_millis(300));
    assert!(watcher.status().watcher_running);
    assert_eq!(fx.seen(), 0);

    // The directory appears with its first file already in place.
    let staging = fx.watch.join("staging");
    write_file(&staging, "before.fits", &light_frame(500.0));
    std::fs::rename(&staging, &late).unwrap();
    wait_until("existing files to be seeded", || fx.seen() == 1);

    write_file(&late, "after.fits", &light_frame(520.0));
    wait_until("the new file to be analyzed", || fx.sink.len() == 1);
    assert!(watcher.status().watcher_running);
    watcher.stop();

    assert!(fx.sink.get("after.fits").is_ok());
    assert!(matches!(fx.sink.get("before.fits"), Err(CentaurError::NotFound(_))));
}

/// Every report in the sink must have a matching seen-set entry.
fn assert_reports_committed(fx: &Fixture) {
    let (reports, total) = fx.sink.list(1, 1000).unwrap();
    let state = fx.store.load().unwrap();
    assert_eq!(state.processed.len(), total);
    for report in &reports {
        let name = report.filename();
        assert!(
            state
                .processed
                .iter()
                .any(|id| id.path.file_name().is_some_and(|n| n == name)),
            "{name} has a report but is not marked seen"
        );
    }
}

#[test]
fn test_stop_during_backlog_commits_analyzed_files() {
    let fx = Fixture::new();
    for i in 0..40 {
        fx.add(&format!("frame_{i:03}.fits"), 500.0);
    }
    let watcher = fx.watcher();
    watcher
        .start(StartMode::ProcessExisting { max_files: None })
        .unwrap();
    wait_until("the first report", || fx.sink.len() >= 1);
    assert_eq!(watcher.stop().message, "Watcher stopped");

    assert!(fx.sink.len() >= 1);
    assert_reports_committed(&fx);
    assert_eq!(watcher.status().total_new_files, fx.sink.len());
}

#[test]
fn test_interrupted_batch_commits_analyzed_files() {
    let fx = Fixture::new();
    for i in 0..40 {
        fx.add(&format!("frame_{i:03}.fits"), 500.0);
    }
    let watcher = Arc::new(fx.watcher());
    let batch = {
        let watcher = Arc::clone(&watcher);
        thread::spawn(move || watcher.run_batch(None))
    };
    wait_until("the first report", || fx.sink.len() >= 1);
    watcher.interrupt();
    let summary = batch.join().unwrap().unwrap();

    assert_eq!(summary.processed.len(), fx.sink.len());
    assert_reports_committed(&fx);

    // Files left by the interruption are picked up by the next batch.
    let rest = watcher.run_batch(None).unwrap();
    assert_eq!(summary.processed.len() + rest.processed.len(), 40);
    assert_reports_committed(&fx);
}
