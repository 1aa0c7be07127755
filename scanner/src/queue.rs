//! Durable device-local queue of offline check-in intents.
//!
//! A scan captured without connectivity becomes an intent persisted to a JSON
//! file before the capture call returns, so a restart or crash between scan
//! and sync loses nothing. Writes go through a sibling temp file and a rename
//! so the queue file is never left half-written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// One offline-captured scan awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineIntent {
    /// Device-local identity; never reused within one queue file.
    pub local_id: u64,
    pub session_id: i64,
    pub qr_token: String,
    /// When the device captured the scan.
    pub scanned_at: DateTime<Utc>,
    /// Session expiry snapshot taken from the scanned payload. Intents whose
    /// snapshot has passed are dropped without a replay attempt.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueueFile {
    next_local_id: u64,
    entries: Vec<OfflineIntent>,
}

impl Default for QueueFile {
    fn default() -> Self {
        Self {
            next_local_id: 1,
            entries: Vec::new(),
        }
    }
}

/// The on-disk queue. Every mutating call persists before returning.
pub struct OfflineQueue {
    path: PathBuf,
    state: QueueFile,
}

impl OfflineQueue {
    /// Opens the queue at `path`, starting empty when the file does not
    /// exist. A file that no longer parses also starts empty: the damage is
    /// logged and the device keeps scanning rather than bricking on a bad
    /// byte.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "offline queue file unreadable, starting empty"
                    );
                    QueueFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => QueueFile::default(),
            Err(e) => return Err(QueueError::Io(e)),
        };
        Ok(Self { path, state })
    }

    /// Appends an intent and persists, returning the assigned local id.
    ///
    /// There is deliberately no deduplication here: the server's record
    /// store arbitrates duplicates at replay time.
    pub fn enqueue(
        &mut self,
        session_id: i64,
        qr_token: &str,
        scanned_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, QueueError> {
        let local_id = self.state.next_local_id;
        self.state.next_local_id += 1;
        self.state.entries.push(OfflineIntent {
            local_id,
            session_id,
            qr_token: qr_token.to_owned(),
            scanned_at,
            expires_at,
        });
        self.persist()?;
        Ok(local_id)
    }

    /// Intents still awaiting replay, in capture order.
    pub fn pending(&self) -> &[OfflineIntent] {
        &self.state.entries
    }

    /// Removes the intent with `local_id` and persists. Unknown ids are a
    /// no-op.
    pub fn remove(&mut self, local_id: u64) -> Result<(), QueueError> {
        let before = self.state.entries.len();
        self.state.entries.retain(|e| e.local_id != local_id);
        if self.state.entries.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), QueueError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.temp_path();
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        let fname = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("queue.json");
        tmp.set_file_name(format!("{fname}.tmp"));
        tmp
    }
}
