//! Structured window listing through System Events.

use termwatch_core::WindowRecord;
use tracing::{debug, trace};

use super::{EnumerateError, WindowEnumerator};
use crate::osascript;

/// Subroles that are never tracked windows.
pub const EXCLUDED_SUBROLES: [&str; 3] = ["AXFloatingWindow", "AXDialog", "AXSystemDialog"];

/// Emits one `pid<TAB>index<TAB>subrole<TAB>title` line per window.
const LIST_SCRIPT: &str = r#"
on run argv
  set appName to item 1 of argv
  set linesOut to {}
  tell application "System Events"
    repeat with proc in (every application process whose name is appName)
      set procPid to unix id of proc
      set winIndex to 0
      repeat with w in (every window of proc)
        set winIndex to winIndex + 1
        set sr to ""
        try
          set sr to (subrole of w) as text
        end try
        set t to ""
        try
          set t to (name of w) as text
        end try
        set end of linesOut to (procPid as text) & tab & (winIndex as text) & tab & sr & tab & t
      end repeat
    end repeat
  end tell
  set AppleScript's text item delimiters to linefeed
  set outText to linesOut as text
  set AppleScript's text item delimiters to ""
  return outText
end run
"#;

/// Lists windows per process via `osascript`.
#[derive(Debug, Clone)]
pub struct SystemEventsEnumerator {
    app_name: String,
}

impl SystemEventsEnumerator {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl WindowEnumerator for SystemEventsEnumerator {
    fn name(&self) -> &'static str {
        "system-events"
    }

    fn enumerate(&self) -> Result<Vec<WindowRecord>, EnumerateError> {
        let stdout = osascript::run(LIST_SCRIPT, &[self.app_name.as_str()])?;
        let windows = parse_window_listing(&stdout);
        debug!(app = %self.app_name, count = windows.len(), "Enumerated windows");
        Ok(windows)
    }
}

/// Parses the listing script's output.
///
/// The index is the window's position in its process's full window list,
/// so excluded windows leave a gap rather than shifting later indices.
/// `missing value` titles become empty strings. Malformed lines are skipped.
pub fn parse_window_listing(stdout: &str) -> Vec<WindowRecord> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.splitn(4, '\t');
            let pid = fields.next()?.trim().parse::<u32>().ok()?;
            let index = fields.next()?.trim().parse::<u32>().ok()?;
            let subrole = fields.next()?.trim();
            let title = fields.next().unwrap_or("");

            if index == 0 {
                return None;
            }
            if EXCLUDED_SUBROLES.contains(&subrole) {
                trace!(pid, index, subrole, "Skipping non-document window");
                return None;
            }

            let title = if title == "missing value" { "" } else { title };
            Some(WindowRecord::new(pid, index, title))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use termwatch_core::WindowId;

    #[test]
    fn test_parse_listing() {
        let out = "500\t1\tAXStandardWindow\t✳ Claude Code\n500\t2\tAXStandardWindow\t~/proj\n600\t1\tAXStandardWindow\tzsh";
        let windows = parse_window_listing(out);
        let ids: Vec<WindowId> = windows.iter().map(|w| w.id).collect();
        assert_eq!(
            ids,
            vec![WindowId::new(500, 1), WindowId::new(500, 2), WindowId::new(600, 1)]
        );
        assert_eq!(windows[0].title, "✳ Claude Code");
        assert_eq!(windows[2].owner_pid, 600);
    }

    #[test]
    fn test_dialogs_excluded_and_indices_preserved() {
        let out = "500\t1\tAXDialog\tSave?\n500\t2\tAXStandardWindow\tmain\n500\t3\tAXFloatingWindow\tpalette\n500\t4\tAXSystemDialog\tx\n500\t5\tAXStandardWindow\tsecond";
        let windows = parse_window_listing(out);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].index, 2);
        assert_eq!(windows[1].index, 5);
    }

    #[test]
    fn test_title_with_tabs_and_missing_value() {
        let out = "500\t1\t\ta\tb\n500\t2\tAXStandardWindow\tmissing value\n500\t3\tAXStandardWindow";
        let windows = parse_window_listing(out);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].title, "a\tb");
        assert_eq!(windows[1].title, "");
        assert_eq!(windows[2].title, "");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let out = "\nabc\t1\tAXStandardWindow\tx\n500\tz\tAXStandardWindow\tx\n500\t0\tAXStandardWindow\tx\n500";
        assert!(parse_window_listing(out).is_empty());
    }
}
