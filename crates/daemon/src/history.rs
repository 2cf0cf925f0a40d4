use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use readyboard_core::model::SubmissionEntry;
use readyboard_core::submission::{MemorySubmissionStore, SubmissionStore, SUBMISSIONS_KEY};
use readyboard_core::{new_ulid, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    key: String,
    entries: Vec<SubmissionEntry>,
}

/// Submission history mirrored to a JSON file after every append.
///
/// Appends are serialised so the file always holds the list that was in
/// memory when it was written, and the last write is the newest list.
#[derive(Debug)]
pub struct FileSubmissionStore {
    path: PathBuf,
    inner: MemorySubmissionStore,
    writer: Mutex<()>,
}

impl FileSubmissionStore {
    /// Load `path` if it exists. A file written under another list key is
    /// ignored.
    pub fn open(path: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => {
                let file: HistoryFile = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::action(format!("parse {}: {e}", path.display())))?;
                if file.key == SUBMISSIONS_KEY {
                    file.entries
                } else {
                    warn!(path = %path.display(), key = %file.key, "history file has a foreign key; starting empty");
                    Vec::new()
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::action(format!("read {}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            inner: MemorySubmissionStore::with_entries(max_entries, entries),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, entries: Vec<SubmissionEntry>) -> Result<()> {
        let file = HistoryFile {
            key: SUBMISSIONS_KEY.to_string(),
            entries,
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(Error::action)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(Error::action)?;
        }
        let tmp = self.path.with_extension(format!("{}.tmp", new_ulid()));
        fs::write(&tmp, bytes).map_err(Error::action)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::action(e)
        })
    }
}

impl SubmissionStore for FileSubmissionStore {
    fn append(&self, entry: SubmissionEntry) -> Result<()> {
        let _writer = self.writer();
        self.inner.append(entry)?;
        self.persist(self.inner.list()?)
    }

    fn list(&self) -> Result<Vec<SubmissionEntry>> {
        self.inner.list()
    }
}
