use std::collections::{BTreeSet, HashMap};

use super::identity::FileIdentity;
use super::store::StoredState;

/// What happened after recording a failed analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The identity stays unseen and is retried on the next poll.
    Retry { attempts: u32 },
    /// The retry budget is spent; the identity is marked seen without a report.
    Quarantined { attempts: u32 },
}

/// Seen-set of file identities with per-identity failure counts.
///
/// At most one identity per path is kept: committing a new identity for a
/// path replaces the older ones.
#[derive(Clone, Debug)]
pub struct FileTracker {
    processed: BTreeSet<FileIdentity>,
    quarantined: BTreeSet<FileIdentity>,
    failures: HashMap<FileIdentity, u32>,
    max_retries: u32,
}

impl FileTracker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            processed: BTreeSet::new(),
            quarantined: BTreeSet::new(),
            failures: HashMap::new(),
            max_retries: max_retries.max(1),
        }
    }

    /// Tracker resuming from persisted state.
    pub fn from_state(state: StoredState, max_retries: u32) -> Self {
        let mut tracker = Self::new(max_retries);
        tracker.processed.extend(state.processed);
        tracker.quarantined.extend(state.quarantined);
        tracker
    }

    pub fn snapshot(&self) -> StoredState {
        StoredState {
            processed: self.processed.iter().cloned().collect(),
            quarantined: self.quarantined.iter().cloned().collect(),
        }
    }

    pub fn is_seen(&self, identity: &FileIdentity) -> bool {
        self.processed.contains(identity) || self.quarantined.contains(identity)
    }

    /// Mark identities as seen without analyzing them.
    pub fn seed<'a>(&mut self, identities: impl IntoIterator<Item = &'a FileIdentity>) -> usize {
        let mut added = 0;
        for identity in identities {
            if !self.is_seen(identity) {
                self.forget_older(identity);
                self.processed.insert(identity.clone());
                added += 1;
            }
        }
        added
    }

    /// Identities from a listing that have not been seen, in listing order.
    ///
    /// Failure counts of identities missing from the listing are dropped.
    pub fn unseen(&mut self, listing: &[FileIdentity]) -> Vec<FileIdentity> {
        self.failures.retain(|id, _| listing.contains(id));
        listing
            .iter()
            .filter(|id| !self.is_seen(id))
            .cloned()
            .collect()
    }

    /// Record a successful analysis.
    pub fn mark_done(&mut self, identity: &FileIdentity) {
        self.forget_older(identity);
        self.processed.insert(identity.clone());
    }

    /// Record a failed analysis, quarantining the identity once the retry
    /// budget is spent.
    pub fn record_failure(&mut self, identity: &FileIdentity) -> FailureOutcome {
        let attempts = {
            let count = self.failures.entry(identity.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if attempts >= self.max_retries {
            self.forget_older(identity);
            self.quarantined.insert(identity.clone());
            FailureOutcome::Quarantined { attempts }
        } else {
            FailureOutcome::Retry { attempts }
        }
    }

    /// Drop every entry for the path of `identity`, including its own
    /// failure count.
    fn forget_older(&mut self, identity: &FileIdentity) {
        let path = &identity.path;
        self.processed.retain(|id| id.path != *path);
        self.quarantined.retain(|id| id.path != *path);
        self.failures.retain(|id, _| id.path != *path);
    }

    pub fn failure_count(&self, identity: &FileIdentity) -> u32 {
        self.failures.get(identity).copied().unwrap_or(0)
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    pub fn quarantined_len(&self) -> usize {
        self.quarantined.len()
    }
}
