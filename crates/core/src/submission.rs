//! Submission outcome labels and the history store.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::SubmissionEntry;

/// Well-known list identifier for submission history.
pub const SUBMISSIONS_KEY: &str = "readyboard:submissions";

/// Default cap on retained submission entries.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Status label for a submission that never got an HTTP response.
pub const ERROR_LABEL: &str = "error";

/// HTTP status recorded for transport failures.
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Map an HTTP status from the submission endpoint to a history label.
pub fn status_label(http_status: u16) -> String {
    match http_status {
        200 | 201 => "delivered".to_string(),
        401 => "auth_rejected".to_string(),
        429 => "rate_limited".to_string(),
        other => format!("http_{other}"),
    }
}

/// Capped, newest-first list of submission attempts.
pub trait SubmissionStore: Send + Sync {
    /// Prepend an entry, evicting the oldest beyond the cap.
    fn append(&self, entry: SubmissionEntry) -> Result<()>;

    /// Entries, newest first.
    fn list(&self) -> Result<Vec<SubmissionEntry>>;
}

/// In-memory history. Not durable.
#[derive(Debug)]
pub struct MemorySubmissionStore {
    max_entries: usize,
    inner: Mutex<VecDeque<SubmissionEntry>>,
}

impl MemorySubmissionStore {
    /// Empty store keeping at most `max_entries` (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Seed from previously persisted entries (newest first).
    pub fn with_entries(max_entries: usize, entries: Vec<SubmissionEntry>) -> Self {
        let store = Self::new(max_entries);
        if let Ok(mut inner) = store.inner.lock() {
            inner.extend(entries.into_iter().take(store.max_entries));
        }
        store
    }

    /// Effective cap.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for MemorySubmissionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn append(&self, entry: SubmissionEntry) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::action("submission history lock poisoned"))?;
        inner.push_front(entry);
        while inner.len() > self.max_entries {
            if let Some(evicted) = inner.pop_back() {
                tracing::debug!(id = %evicted.id, "evicted oldest submission entry");
            }
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<SubmissionEntry>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| Error::action("submission history lock poisoned"))?;
        Ok(inner.iter().cloned().collect())
    }
}
