//! Bringing a window to the front.

use termwatch_core::WindowId;
use thiserror::Error;
use tracing::{debug, info};

use crate::osascript::{self, ScriptError};

/// Errors that can occur while focusing a window.
#[derive(Debug, Error)]
pub enum FocusError {
    /// Not in the latest snapshot, or its index is out of range.
    #[error("window {0} not found")]
    TargetNotFound(WindowId),

    #[error("accessibility permission not granted")]
    PermissionDenied,

    #[error("focus is not supported on this platform")]
    Unsupported,

    #[error("focus script failed: {0}")]
    Script(#[source] ScriptError),
}

impl FocusError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TargetNotFound(_))
    }
}

/// Activates a process and raises one of its windows.
pub trait WindowFocuser: Send + Sync {
    fn focus(&self, id: WindowId) -> Result<(), FocusError>;
}

/// Raises through System Events.
const FOCUS_SCRIPT: &str = r#"
on run argv
  set targetPid to (item 1 of argv) as integer
  set targetIndex to (item 2 of argv) as integer
  tell application "System Events"
    if not (exists (application process whose unix id is targetPid)) then return "missing"
    set proc to first application process whose unix id is targetPid
    if targetIndex > (count of windows of proc) then return "missing"
    set frontmost of proc to true
    perform action "AXRaise" of window targetIndex of proc
  end tell
  return "ok"
end run
"#;

/// [`WindowFocuser`] backed by `osascript`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEventsFocuser;

impl WindowFocuser for SystemEventsFocuser {
    fn focus(&self, id: WindowId) -> Result<(), FocusError> {
        let pid = id.pid.to_string();
        let index = id.index.to_string();
        let outcome = osascript::run(FOCUS_SCRIPT, &[pid.as_str(), index.as_str()])
            .map_err(|e| script_failure(id, e))?;
        interpret_outcome(id, &outcome)
    }
}

fn script_failure(id: WindowId, error: ScriptError) -> FocusError {
    match error {
        ScriptError::Unsupported => FocusError::Unsupported,
        // -1728: the process exited between the existence check and the raise
        ScriptError::Failed { ref stderr, .. } if stderr.contains("-1728") => FocusError::TargetNotFound(id),
        e if e.is_permission_denied() => FocusError::PermissionDenied,
        e => FocusError::Script(e),
    }
}

/// `"missing"` covers both a vanished process and an out-of-range index.
fn interpret_outcome(id: WindowId, stdout: &str) -> Result<(), FocusError> {
    if stdout.trim() == "missing" {
        debug!(window = %id, "Focus target no longer exists");
        return Err(FocusError::TargetNotFound(id));
    }

    info!(window = %id, "Focused window");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let id = WindowId::new(1, 2);
        assert!(FocusError::TargetNotFound(id).is_not_found());
        assert!(!FocusError::PermissionDenied.is_not_found());
        assert!(FocusError::TargetNotFound(id).to_string().contains("1-2"));
    }

    #[test]
    fn test_script_checks_process_before_addressing_it() {
        let check = FOCUS_SCRIPT.find("exists (application process").unwrap();
        let address = FOCUS_SCRIPT.find("first application process").unwrap();
        assert!(check < address);
    }

    #[test]
    fn test_missing_outcome_is_not_found() {
        let id = WindowId::new(4242, 1);
        assert!(interpret_outcome(id, "missing\n").unwrap_err().is_not_found());
        assert!(interpret_outcome(id, "ok").is_ok());
    }

    #[test]
    fn test_script_failure_mapping() {
        let id = WindowId::new(4242, 1);
        let vanished = ScriptError::Failed {
            code: 1,
            stderr: "execution error: Can't get application process 1. (-1728)".to_string(),
        };
        assert!(script_failure(id, vanished).is_not_found());

        let denied = ScriptError::Failed {
            code: 1,
            stderr: "osascript is not allowed assistive access. (-25211)".to_string(),
        };
        assert!(matches!(script_failure(id, denied), FocusError::PermissionDenied));
        assert!(matches!(script_failure(id, ScriptError::Unsupported), FocusError::Unsupported));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_unsupported_off_macos() {
        let err = SystemEventsFocuser.focus(WindowId::new(1, 1)).unwrap_err();
        assert!(matches!(err, FocusError::Unsupported));
    }
}
