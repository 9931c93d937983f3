//! Plain-text rendering of window listings.

use termwatch_core::AgentState;
use termwatch_protocol::WindowView;

/// Single-glyph marker per state, so attention-worthy rows stand out.
fn state_marker(state: AgentState) -> &'static str {
    match state {
        AgentState::Asking => "?",
        AgentState::Waiting => "*",
        AgentState::Running => "+",
        AgentState::Working => "~",
        AgentState::NotRunning => " ",
    }
}

/// Renders `windows` as an aligned table, highest-priority state first.
pub fn format_table(windows: &[WindowView]) -> String {
    if windows.is_empty() {
        return "No terminal windows\n".to_string();
    }

    let mut rows: Vec<&WindowView> = windows.iter().collect();
    // stable: enumeration order is kept within a state
    rows.sort_by(|a, b| b.claude_state.cmp(&a.claude_state));

    let ids: Vec<String> = rows.iter().map(|w| w.id.to_string()).collect();
    let id_width = ids.iter().map(String::len).max().unwrap_or(0).max(2);
    let state_width = rows
        .iter()
        .map(|w| w.claude_state.as_str().len())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = format!("  {:<id_width$}  {:<state_width$}  NAME\n", "ID", "STATE");
    for (window, id) in rows.iter().zip(&ids) {
        out.push_str(&format!(
            "{} {:<id_width$}  {:<state_width$}  {}\n",
            state_marker(window.claude_state),
            id,
            window.claude_state.as_str(),
            window.display_name,
        ));
    }
    out
}
