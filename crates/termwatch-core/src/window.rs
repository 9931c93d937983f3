//! Window records and published snapshots.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::agent::AgentState;
use crate::error::DomainError;
use crate::hook::HookLabel;

// ============================================================================
// Window Identifier
// ============================================================================

/// Cycle-scoped address of a window: owning pid plus 1-based position in
/// that process's window list.
///
/// Window handles are not portable across OS calls, so this pair is
/// re-derived on every refresh. An id is only meaningful against the
/// snapshot it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId {
    pub pid: u32,
    pub index: u32,
}

impl WindowId {
    pub const fn new(pid: u32, index: u32) -> Self {
        Self { pid, index }
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pid, self.index)
    }
}

impl FromStr for WindowId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidWindowId {
            value: s.to_string(),
        };
        let (pid, index) = s.split_once('-').ok_or_else(invalid)?;
        let pid = pid.parse::<u32>().map_err(|_| invalid())?;
        let index = index.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { pid, index })
    }
}

impl Serialize for WindowId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WindowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Window Record
// ============================================================================

/// One terminal window as seen during a refresh cycle.
///
/// Enumeration fills in the identity and title; attribution and
/// classification fill in the rest before the snapshot is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    pub title: String,
    pub owner_pid: u32,
    /// 1-based position within the owning process's window list.
    pub index: u32,
    pub project: Option<String>,
    pub cwd: Option<PathBuf>,
    pub has_agent_process: bool,
    pub hook_state: Option<HookLabel>,
    pub agent_state: AgentState,
}

impl WindowRecord {
    /// Creates an unenriched record straight from enumeration.
    pub fn new(owner_pid: u32, index: u32, title: impl Into<String>) -> Self {
        Self {
            id: WindowId::new(owner_pid, index),
            title: title.into(),
            owner_pid,
            index,
            project: None,
            cwd: None,
            has_agent_process: false,
            hook_state: None,
            agent_state: AgentState::NotRunning,
        }
    }

    /// Name shown to users: the attributed project, else the raw title.
    pub fn display_name(&self) -> &str {
        match &self.project {
            Some(project) => project.as_str(),
            None if self.title.trim().is_empty() => "Terminal",
            None => self.title.as_str(),
        }
    }
}

// ============================================================================
// Window Snapshot
// ============================================================================

/// A complete, immutable set of window records from one refresh cycle.
///
/// Readers only ever hold a whole snapshot; the tracker replaces it
/// wholesale at the end of each cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Incremented on every publish. Zero means nothing published yet.
    pub generation: u64,
    pub captured_at: Option<DateTime<Utc>>,
    pub windows: Vec<WindowRecord>,
}

impl WindowSnapshot {
    pub fn new(generation: u64, windows: Vec<WindowRecord>) -> Self {
        Self {
            generation,
            captured_at: Some(Utc::now()),
            windows,
        }
    }

    pub fn find(&self, id: &WindowId) -> Option<&WindowRecord> {
        self.windows.iter().find(|w| w.id == *id)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_id_round_trip_display() {
        let id = WindowId::new(501, 2);
        assert_eq!(id.to_string(), "501-2");
        assert_eq!("501-2".parse::<WindowId>().ok(), Some(id));
    }

    #[test]
    fn test_window_id_rejects_malformed() {
        for bad in ["", "501", "501-", "-1", "a-1", "1-b", "1-2-3", "-1-2", "501_1"] {
            assert!(bad.parse::<WindowId>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_window_id_serializes_as_string() {
        let json = serde_json::to_string(&WindowId::new(7, 1)).unwrap();
        assert_eq!(json, "\"7-1\"");
        let back: WindowId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WindowId::new(7, 1));
    }

    #[test]
    fn test_new_record_is_unenriched() {
        let record = WindowRecord::new(500, 1, "zsh");
        assert_eq!(record.id, WindowId::new(500, 1));
        assert!(record.project.is_none());
        assert!(record.cwd.is_none());
        assert!(!record.has_agent_process);
        assert_eq!(record.agent_state, AgentState::NotRunning);
    }

    #[test]
    fn test_display_name_prefers_project() {
        let mut record = WindowRecord::new(500, 1, "✳ Claude Code");
        assert_eq!(record.display_name(), "✳ Claude Code");
        record.project = Some("proj".to_string());
        assert_eq!(record.display_name(), "proj");
    }

    #[test]
    fn test_display_name_blank_title() {
        let record = WindowRecord::new(500, 1, "  ");
        assert_eq!(record.display_name(), "Terminal");
    }

    #[test]
    fn test_snapshot_find() {
        let snapshot = WindowSnapshot::new(
            3,
            vec![WindowRecord::new(500, 1, "a"), WindowRecord::new(500, 2, "b")],
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.find(&WindowId::new(500, 2)).map(|w| w.title.as_str()),
            Some("b")
        );
        assert!(snapshot.find(&WindowId::new(501, 1)).is_none());
    }
}
