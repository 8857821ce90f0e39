//! Resumable download state: the sidecar JSON record a paused or crashed
//! download leaves behind, and the load/save/resume-validation operations
//! around it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::StateError;

/// Persisted state for one in-progress download, keyed implicitly by the
/// sidecar file's path (`<final_path>.state`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadState {
    pub uri: String,
    pub total_size: u64,
    pub completed: BTreeSet<u32>,
    pub partial: BTreeMap<u32, u64>,
    pub timestamp: u64,
    /// Last known `ETag`/`Last-Modified`, used to detect a changed remote
    /// resource before trusting a resume.
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl DownloadState {
    pub fn new(uri: impl Into<String>, total_size: u64) -> Self {
        Self {
            uri: uri.into(),
            total_size,
            completed: BTreeSet::new(),
            partial: BTreeMap::new(),
            timestamp: now_unix(),
            etag: None,
            last_modified: None,
        }
    }

    /// Bytes already written for `id`; missing entries default to zero.
    pub fn resume_offset(&self, id: u32) -> u64 {
        self.partial.get(&id).copied().unwrap_or(0)
    }

    /// Records a segment as fully written: removes it from `partial` (the
    /// two sets are disjoint by invariant) and adds it to `completed`.
    pub fn mark_completed(&mut self, id: u32) {
        self.partial.remove(&id);
        self.completed.insert(id);
    }

    /// Records partial progress for a segment still in flight. A segment
    /// that is already `completed` never regresses back into `partial`.
    pub fn mark_partial(&mut self, id: u32, bytes_written: u64) {
        if !self.completed.contains(&id) {
            self.partial.insert(id, bytes_written);
        }
    }

    pub fn touch(&mut self) {
        self.timestamp = now_unix();
    }

    pub fn is_complete(&self, total_segments: usize) -> bool {
        self.completed.len() == total_segments
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Loads state from `path`. A missing file is `StateError::Io`; a file that
/// fails to parse is `StateError::Corrupt`; both are treated as "start
/// fresh" by the Coordinator's resume-validation step.
pub fn load(path: &Path) -> Result<DownloadState, StateError> {
    let data = fs::read_to_string(path).map_err(|source| StateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| StateError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically writes `state` to `path`: serialize to a sibling temp file,
/// then rename over the target, so a reader never observes a half-written
/// checkpoint.
pub fn save(path: &Path, state: &DownloadState) -> Result<(), StateError> {
    let json = serde_json::to_string_pretty(state).map_err(|source| StateError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = sibling_tmp_path(path);
    fs::write(&tmp_path, json).map_err(|source| StateError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Removes the state file. A missing file is not an error: the Coordinator
/// calls this unconditionally on completion.
pub fn delete(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn sibling_tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Returns `true` if `state` can be trusted to resume against the current
/// probe result.
///
/// A stored `etag`/`last_modified` that the current probe doesn't confirm is
/// a mismatch; absence of a stored value (older state file, or the header
/// was never sent) is never itself treated as a mismatch.
pub fn resume_is_valid(
    state: &DownloadState,
    uri: &str,
    total_size: u64,
    current_etag: Option<&str>,
    current_last_modified: Option<&str>,
) -> bool {
    if state.uri != uri || state.total_size != total_size {
        return false;
    }
    if let Some(stored) = &state.etag {
        if Some(stored.as_str()) != current_etag {
            return false;
        }
    }
    if let Some(stored) = &state.last_modified {
        if Some(stored.as_str()) != current_last_modified {
            return false;
        }
    }
    true
}
