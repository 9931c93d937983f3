//! Runs AppleScript through `osascript`.
//!
//! Blocking; callers are already on the blocking pool.

use std::process::Command;

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("osascript requires macOS")]
    Unsupported,

    #[error("failed to run osascript: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("osascript exited with status {code}: {stderr}")]
    Failed { code: i32, stderr: String },
}

impl ScriptError {
    /// True when the failure looks like a missing Accessibility grant
    /// (System Events error -1719 / -25211).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Failed { stderr, .. } => {
                stderr.contains("-1719") || stderr.contains("-25211") || stderr.contains("assistive access")
            }
            _ => false,
        }
    }
}

/// Runs `script` with `args` passed to its `on run argv` handler and
/// returns trimmed stdout.
pub fn run(script: &str, args: &[&str]) -> Result<String, ScriptError> {
    if !cfg!(target_os = "macos") {
        return Err(ScriptError::Unsupported);
    }

    let mut cmd = Command::new("osascript");
    cmd.arg("-e").arg(script);
    if !args.is_empty() {
        cmd.arg("--").args(args);
    }

    let output = cmd.output().map_err(ScriptError::Spawn)?;
    if !output.status.success() {
        return Err(ScriptError::Failed {
            code: output.status.code().unwrap_or(1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    trace!(bytes = stdout.len(), "osascript finished");
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_detection() {
        let err = ScriptError::Failed {
            code: 1,
            stderr: "execution error: System Events got an error: osascript is not allowed assistive access. (-1719)".to_string(),
        };
        assert!(err.is_permission_denied());

        let other = ScriptError::Failed {
            code: 1,
            stderr: "syntax error".to_string(),
        };
        assert!(!other.is_permission_denied());
        assert!(!ScriptError::Unsupported.is_permission_denied());
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_unsupported_off_macos() {
        assert!(matches!(run("return 1", &[]), Err(ScriptError::Unsupported)));
    }
}
