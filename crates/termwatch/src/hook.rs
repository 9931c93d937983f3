//! Agent hook writer.
//!
//! The agent CLI invokes `termwatch hook` on lifecycle events, passing a
//! JSON object on stdin. The event is mapped to a [`HookLabel`] and stored
//! in the shared hook directory, where the daemon picks it up on its next
//! refresh cycle.
//!
//! | Event                                   | Effect          |
//! |-----------------------------------------|-----------------|
//! | `PermissionRequest`                     | write `asking`  |
//! | `Notification` + `permission_prompt`    | write `asking`  |
//! | `Notification` + `idle_prompt`          | write `waiting` |
//! | `Stop`, `SessionStart`                  | write `waiting` |
//! | `UserPromptSubmit`, `Pre/PostToolUse`   | write `working` |
//! | `SessionEnd`                            | remove entry    |
//! | anything else                           | ignored         |

use std::io::Read;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;
use termwatch_core::{DomainError, HookLabel, HookStateEntry, HookStore};
use thiserror::Error;
use tracing::debug;

/// Payload the agent writes to the hook's stdin. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookInput {
    pub hook_event_name: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub notification_type: Option<String>,
}

/// What a hook event does to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Write(HookLabel),
    Remove,
    Ignore,
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Failed to read hook input: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid hook input: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Hook event {event} has no cwd")]
    MissingCwd { event: String },

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl HookInput {
    /// Reads and parses the payload from `reader` (normally stdin).
    pub fn read_from(mut reader: impl Read) -> Result<Self, HookError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn action(&self) -> HookAction {
        map_event(&self.hook_event_name, self.notification_type.as_deref())
    }
}

/// Maps an event name (and notification subtype) to its store action.
pub fn map_event(event: &str, notification_type: Option<&str>) -> HookAction {
    match (event, notification_type) {
        ("PermissionRequest", _) => HookAction::Write(HookLabel::Asking),
        ("Notification", Some("permission_prompt")) => HookAction::Write(HookLabel::Asking),
        ("Notification", Some("idle_prompt")) => HookAction::Write(HookLabel::Waiting),
        ("Notification", _) => HookAction::Ignore,
        ("Stop" | "SessionStart", _) => HookAction::Write(HookLabel::Waiting),
        ("UserPromptSubmit" | "PreToolUse" | "PostToolUse", _) => HookAction::Write(HookLabel::Working),
        ("SessionEnd", _) => HookAction::Remove,
        _ => HookAction::Ignore,
    }
}

/// Seconds since the epoch with microsecond precision.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Applies `input` to `store`, stamping writes with `timestamp`.
///
/// Returns the action taken. A write that loses to a newer entry already
/// on disk still reports `Write`; the store keeps the newer one.
pub fn apply(store: &HookStore, input: &HookInput, timestamp: f64) -> Result<HookAction, HookError> {
    let action = input.action();
    if action == HookAction::Ignore {
        debug!(event = %input.hook_event_name, "Ignoring hook event");
        return Ok(action);
    }

    let cwd = match &input.cwd {
        Some(cwd) if !cwd.as_os_str().is_empty() => cwd,
        _ => {
            return Err(HookError::MissingCwd {
                event: input.hook_event_name.clone(),
            })
        }
    };

    match action {
        HookAction::Write(state) => {
            let written = store.write(&HookStateEntry::new(cwd.clone(), state, timestamp))?;
            debug!(cwd = %cwd.display(), ?state, written, "Recorded hook state");
        }
        HookAction::Remove => {
            store.remove(cwd)?;
            debug!(cwd = %cwd.display(), "Removed hook state");
        }
        HookAction::Ignore => {}
    }
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn input(event: &str, cwd: &str, notification: Option<&str>) -> HookInput {
        HookInput {
            hook_event_name: event.to_string(),
            cwd: Some(PathBuf::from(cwd)),
            notification_type: notification.map(str::to_string),
        }
    }

    #[test]
    fn test_event_mapping() {
        assert_eq!(map_event("PermissionRequest", None), HookAction::Write(HookLabel::Asking));
        assert_eq!(
            map_event("Notification", Some("permission_prompt")),
            HookAction::Write(HookLabel::Asking)
        );
        assert_eq!(
            map_event("Notification", Some("idle_prompt")),
            HookAction::Write(HookLabel::Waiting)
        );
        assert_eq!(map_event("Notification", Some("auth_success")), HookAction::Ignore);
        assert_eq!(map_event("Stop", None), HookAction::Write(HookLabel::Waiting));
        assert_eq!(map_event("SessionStart", None), HookAction::Write(HookLabel::Waiting));
        assert_eq!(map_event("PreToolUse", None), HookAction::Write(HookLabel::Working));
        assert_eq!(map_event("SessionEnd", None), HookAction::Remove);
        assert_eq!(map_event("SubagentStop", None), HookAction::Ignore);
    }

    #[test]
    fn test_read_from_ignores_extra_fields() {
        let raw = r#"{"session_id":"abc","hook_event_name":"Notification","cwd":"/Users/me/proj","notification_type":"permission_prompt","message":"?"}"#;
        let parsed = HookInput::read_from(raw.as_bytes()).unwrap();
        assert_eq!(parsed, input("Notification", "/Users/me/proj", Some("permission_prompt")));
    }

    #[test]
    fn test_read_from_rejects_garbage() {
        let err = HookInput::read_from("not json".as_bytes()).unwrap_err();
        assert!(matches!(err, HookError::Parse(_)));
    }

    #[test]
    fn test_apply_writes_and_removes() {
        let temp = tempfile::tempdir().unwrap();
        let store = HookStore::new(temp.path());
        let cwd = Path::new("/Users/me/proj");

        apply(&store, &input("PermissionRequest", "/Users/me/proj", None), 10.0).unwrap();
        assert_eq!(store.read(cwd).unwrap().unwrap().state, HookLabel::Asking);

        apply(&store, &input("Stop", "/Users/me/proj", None), 11.0).unwrap();
        assert_eq!(store.read(cwd).unwrap().unwrap().state, HookLabel::Waiting);

        let action = apply(&store, &input("SessionEnd", "/Users/me/proj", None), 12.0).unwrap();
        assert_eq!(action, HookAction::Remove);
        assert!(store.read(cwd).unwrap().is_none());
    }

    #[test]
    fn test_stale_write_keeps_newer_entry() {
        let temp = tempfile::tempdir().unwrap();
        let store = HookStore::new(temp.path());
        let cwd = Path::new("/Users/me/proj");

        apply(&store, &input("PermissionRequest", "/Users/me/proj", None), 20.0).unwrap();
        apply(&store, &input("PostToolUse", "/Users/me/proj", None), 19.0).unwrap();
        assert_eq!(store.read(cwd).unwrap().unwrap().state, HookLabel::Asking);
    }

    #[test]
    fn test_ignored_event_needs_no_cwd() {
        let temp = tempfile::tempdir().unwrap();
        let store = HookStore::new(temp.path());
        let event = HookInput {
            hook_event_name: "SubagentStop".to_string(),
            cwd: None,
            notification_type: None,
        };
        assert_eq!(apply(&store, &event, 1.0).unwrap(), HookAction::Ignore);
    }

    #[test]
    fn test_missing_cwd_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let store = HookStore::new(temp.path());
        let event = HookInput {
            hook_event_name: "Stop".to_string(),
            cwd: None,
            notification_type: None,
        };
        assert!(matches!(apply(&store, &event, 1.0), Err(HookError::MissingCwd { .. })));
    }

    #[test]
    fn test_now_timestamp_is_recent() {
        // 2023-11-14 onwards
        assert!(now_timestamp() > 1_700_000_000.0);
    }
}
