//! Hook-reported agent state.
//!
//! The agent CLI runs a hook script on lifecycle events. The hook writes one
//! small JSON file per working directory into a shared directory; the daemon
//! reads them back each refresh cycle.
//!
//! ```text
//! ~/.termwatch/hooks/
//!   <md5(cwd)>.json   {"cwd": "/Users/me/proj", "state": "asking", "timestamp": 1718000000.5}
//! ```
//!
//! Freshness rule: for a given directory the entry with the larger
//! timestamp wins, regardless of the order writes are observed in. An
//! out-of-order write can therefore never clear an unanswered question.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{DomainError, DomainResult};
use crate::project::paths_overlap;

/// State label written by the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookLabel {
    Asking,
    Waiting,
    Working,
    /// Any label this version does not know about
    #[serde(other)]
    Unknown,
}

/// One hook write for a working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookStateEntry {
    pub cwd: PathBuf,
    pub state: HookLabel,
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
}

impl HookStateEntry {
    pub fn new(cwd: impl Into<PathBuf>, state: HookLabel, timestamp: f64) -> Self {
        Self {
            cwd: cwd.into(),
            state,
            timestamp,
        }
    }

    /// Strictly newer than `other`.
    pub fn is_newer_than(&self, other: &HookStateEntry) -> bool {
        self.timestamp > other.timestamp
    }
}

// ============================================================================
// In-memory view
// ============================================================================

/// All known hook entries, keyed by working directory.
#[derive(Debug, Clone, Default)]
pub struct HookStates {
    entries: HashMap<PathBuf, HookStateEntry>,
}

impl HookStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entry unless an entry with a newer-or-equal timestamp
    /// already exists for the same directory.
    pub fn record(&mut self, entry: HookStateEntry) {
        let key = normalize_dir(&entry.cwd);
        match self.entries.get(&key) {
            Some(existing) if !entry.is_newer_than(existing) => {
                trace!(cwd = %key.display(), "Ignoring older hook entry");
            }
            _ => {
                self.entries.insert(key, entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for `cwd`.
    ///
    /// An exact key wins. Otherwise any key that is an ancestor or a
    /// descendant of `cwd` is a candidate (the agent may run one level
    /// above or below the tracked directory) and the freshest candidate
    /// is returned.
    pub fn lookup(&self, cwd: &Path) -> Option<&HookStateEntry> {
        let key = normalize_dir(cwd);
        if let Some(entry) = self.entries.get(&key) {
            return Some(entry);
        }

        self.entries
            .iter()
            .filter(|(candidate, _)| paths_overlap(candidate, &key))
            .map(|(_, entry)| entry)
            .max_by(|a, b| a.timestamp.total_cmp(&b.timestamp))
    }
}

impl FromIterator<HookStateEntry> for HookStates {
    fn from_iter<I: IntoIterator<Item = HookStateEntry>>(iter: I) -> Self {
        let mut states = Self::new();
        for entry in iter {
            states.record(entry);
        }
        states
    }
}

// ============================================================================
// On-disk store
// ============================================================================

/// Directory of hook state files.
#[derive(Debug, Clone)]
pub struct HookStore {
    dir: PathBuf,
}

impl HookStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for a working directory.
    pub fn path_for(&self, cwd: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", dir_digest(cwd)))
    }

    /// Reads every state file in the directory.
    ///
    /// A missing directory means no hooks have fired yet and yields an
    /// empty set. Unreadable or malformed files are skipped.
    pub fn load(&self) -> HookStates {
        let mut states = HookStates::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return states,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Failed to read hook state directory");
                return states;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_entry(&path) {
                Ok(hook) => states.record(hook),
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping hook state file"),
            }
        }

        states
    }

    /// Reads the current entry for `cwd`, if any.
    pub fn read(&self, cwd: &Path) -> DomainResult<Option<HookStateEntry>> {
        let path = self.path_for(cwd);
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DomainError::ParseError {
                    field: path.display().to_string(),
                    reason: e.to_string(),
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DomainError::HookIo { path, source }),
        }
    }

    /// Writes `entry` unless the file already holds a newer entry.
    ///
    /// Returns `true` if the file was written. The write goes through a
    /// temporary file and a rename so readers never see a partial file.
    pub fn write(&self, entry: &HookStateEntry) -> DomainResult<bool> {
        if let Ok(Some(existing)) = self.read(&entry.cwd) {
            if !entry.is_newer_than(&existing) {
                debug!(cwd = %entry.cwd.display(), "Existing hook entry is newer, not overwriting");
                return Ok(false);
            }
        }

        fs::create_dir_all(&self.dir).map_err(|source| DomainError::HookIo {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(&entry.cwd);
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let json = serde_json::to_string(entry).map_err(|e| DomainError::ParseError {
            field: "hook entry".to_string(),
            reason: e.to_string(),
        })?;

        fs::write(&tmp, json).map_err(|source| DomainError::HookIo {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| DomainError::HookIo {
            path: path.clone(),
            source,
        })?;

        Ok(true)
    }

    /// Removes the entry for `cwd`. Missing files are not an error.
    pub fn remove(&self, cwd: &Path) -> DomainResult<()> {
        let path = self.path_for(cwd);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DomainError::HookIo { path, source }),
        }
    }
}

fn read_entry(path: &Path) -> DomainResult<HookStateEntry> {
    let raw = fs::read_to_string(path).map_err(|source| DomainError::HookIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| DomainError::ParseError {
        field: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Drops trailing separators so `/a/b/` and `/a/b` share a key.
fn normalize_dir(path: &Path) -> PathBuf {
    path.components().collect()
}

/// md5 hex digest of the normalized directory, used as the file stem.
fn dir_digest(cwd: &Path) -> String {
    let normalized = normalize_dir(cwd);
    format!("{:x}", md5::compute(normalized.to_string_lossy().as_bytes()))
}
