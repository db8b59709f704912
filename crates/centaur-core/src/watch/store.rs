use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CentaurError, Result};

use super::identity::FileIdentity;

/// Persisted seen-set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default)]
    pub processed: Vec<FileIdentity>,
    /// Identities given up on after repeated failures.
    #[serde(default)]
    pub quarantined: Vec<FileIdentity>,
}

/// Durable record of processed file identities.
pub trait ProcessedStore: Send + Sync {
    fn load(&self) -> Result<StoredState>;
    fn save(&self, state: &StoredState) -> Result<()>;
}

/// Store kept in a JSON document, `processed_files.json` by default.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProcessedStore for JsonFileStore {
    fn load(&self) -> Result<StoredState> {
        if !self.path.exists() {
            return Ok(StoredState::default());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CentaurError::Storage(format!("corrupt state file {}: {e}", self.path.display()))
        })
    }

    fn save(&self, state: &StoredState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(
            path = %self.path.display(),
            processed = state.processed.len(),
            quarantined = state.quarantined.len(),
            "Saved processed-file state"
        );
        Ok(())
    }
}

/// Non-durable store for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoredState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessedStore for MemoryStore {
    fn load(&self) -> Result<StoredState> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &StoredState) -> Result<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();
        Ok(())
    }
}
