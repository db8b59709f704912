use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{CentaurError, Result};

use super::identity::FileIdentity;

/// What to list and how long to wait for the filesystem.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    /// Files modified more recently than this are not ready yet.
    pub settle: Duration,
    pub timeout: Duration,
}

/// Candidate files found by one listing, sorted by path.
#[derive(Clone, Debug, Default)]
pub struct ScanResult {
    pub ready: Vec<FileIdentity>,
    /// Files skipped because they may still be being written.
    pub settling: usize,
}

/// Run `work` on a helper thread and give up after `timeout`.
///
/// A timed-out helper is left to finish on its own; its result is dropped.
pub fn run_with_timeout<T, F>(timeout: Duration, work: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("centaur-io".into())
        .spawn(move || {
            let _ = tx.send(work());
        });
    if spawned.is_err() {
        return None;
    }
    rx.recv_timeout(timeout).ok()
}

/// Recursively list FITS candidates under `root`.
///
/// A missing, unreadable or unresponsive root is reported as `MountUnavailable`.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<ScanResult> {
    let unavailable = |reason: String| CentaurError::MountUnavailable {
        path: root.to_path_buf(),
        reason,
    };

    let owned_root = root.to_path_buf();
    let extensions = options.extensions.clone();
    let listing = run_with_timeout(options.timeout, move || list_tree(&owned_root, &extensions))
        .ok_or_else(|| unavailable(format!("listing timed out after {:?}", options.timeout)))?
        .map_err(|e| unavailable(e.to_string()))?;

    let now = Utc::now();
    let mut result = ScanResult::default();
    for identity in listing {
        let age = now.signed_duration_since(identity.modified());
        let settling = age.to_std().is_ok_and(|age| age < options.settle);
        if settling {
            debug!(file = %identity.path.display(), "File still settling");
            result.settling += 1;
        } else {
            result.ready.push(identity);
        }
    }
    Ok(result)
}

/// Read a whole file on a helper thread, bounded by `timeout`.
pub fn read_with_timeout(path: &Path, timeout: Duration) -> Result<Vec<u8>> {
    let owned = path.to_path_buf();
    match run_with_timeout(timeout, move || fs::read(owned)) {
        Some(Ok(bytes)) => Ok(bytes),
        Some(Err(e)) => Err(CentaurError::unreadable(path, e.to_string())),
        None => Err(CentaurError::unreadable(
            path,
            format!("read timed out after {timeout:?}"),
        )),
    }
}

pub(crate) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn list_tree(root: &Path, extensions: &[String]) -> io::Result<Vec<FileIdentity>> {
    let mut found = Vec::new();
    // The root must be readable; failures below it only skip that subtree.
    let mut pending: Vec<PathBuf> = Vec::new();
    visit_dir(root, extensions, &mut found, &mut pending)?;

    while let Some(dir) = pending.pop() {
        if let Err(e) = visit_dir(&dir, extensions, &mut found, &mut pending) {
            warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
        }
    }

    found.sort();
    Ok(found)
}

fn visit_dir(
    dir: &Path,
    extensions: &[String],
    found: &mut Vec<FileIdentity>,
    pending: &mut Vec<PathBuf>,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            pending.push(path);
        } else if has_extension(&path, extensions) {
            // Hidden files are usually partial copies (e.g. `._frame.fits`).
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            match entry.metadata() {
                Ok(meta) if meta.is_file() => {
                    if let Some(identity) = FileIdentity::from_metadata(&path, &meta) {
                        found.push(identity);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "Cannot stat file"),
            }
        }
    }
    Ok(())
}
