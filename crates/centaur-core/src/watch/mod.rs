//! Polling file-set tracker: lists the watched tree, diffs it against the
//! seen-set and dispatches new file identities to the analysis pipeline.

pub mod identity;
pub mod scan;
pub mod store;
pub mod tracker;
pub mod watcher;

pub use identity::FileIdentity;
pub use scan::{scan, ScanOptions, ScanResult};
pub use store::{JsonFileStore, MemoryStore, ProcessedStore, StoredState};
pub use tracker::{FailureOutcome, FileTracker};
pub use watcher::{StartMode, Watcher};
