//! Agent state and window-title sigils.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Derived state of the agent inside a window.
///
/// Ordered by display priority: `Asking > Waiting > Running > Working > NotRunning`.
/// Serialized in camelCase to match the query API (`"notRunning"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentState {
    /// Agent is blocked on a question for the user
    Asking,
    /// Agent is idle at its prompt
    Waiting,
    /// An agent process is present but its finer state is unknown
    Running,
    /// Agent is busy (spinner in the title)
    Working,
    /// No agent detected
    #[default]
    NotRunning,
}

impl AgentState {
    /// Display priority, higher sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Asking => 4,
            Self::Waiting => 3,
            Self::Running => 2,
            Self::Working => 1,
            Self::NotRunning => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asking => "asking",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Working => "working",
            Self::NotRunning => "notRunning",
        }
    }
}

impl PartialOrd for AgentState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AgentState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Title Sigils
// ============================================================================

/// What a window title's leading character says about the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSignal {
    /// Ready-for-input sigil
    Ready,
    /// One of the spinner glyphs
    Busy,
    /// No recognised sigil (including user-overridden titles)
    Absent,
}

/// Leading-character conventions the agent uses in terminal titles.
///
/// These are an undocumented convention of the agent CLI and can change
/// without notice, so they are loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleSigils {
    pub ready: char,
    pub busy: Vec<char>,
}

impl Default for TitleSigils {
    fn default() -> Self {
        Self {
            ready: '✳',
            busy: "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏⠂⠐⠁⠈⠄⠠⡀⢀".chars().collect(),
        }
    }
}

impl TitleSigils {
    pub fn classify(&self, title: &str) -> TitleSignal {
        match title.chars().next() {
            Some(c) if c == self.ready => TitleSignal::Ready,
            Some(c) if self.busy.contains(&c) => TitleSignal::Busy,
            _ => TitleSignal::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut states = vec![
            AgentState::Working,
            AgentState::NotRunning,
            AgentState::Asking,
            AgentState::Running,
            AgentState::Waiting,
        ];
        states.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            states,
            vec![
                AgentState::Asking,
                AgentState::Waiting,
                AgentState::Running,
                AgentState::Working,
                AgentState::NotRunning,
            ]
        );
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&AgentState::NotRunning).unwrap(),
            "\"notRunning\""
        );
        assert_eq!(serde_json::to_string(&AgentState::Asking).unwrap(), "\"asking\"");
        let parsed: AgentState = serde_json::from_str("\"working\"").unwrap();
        assert_eq!(parsed, AgentState::Working);
    }

    #[test]
    fn test_as_str_matches_serde() {
        for state in [
            AgentState::Asking,
            AgentState::Waiting,
            AgentState::Running,
            AgentState::Working,
            AgentState::NotRunning,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json.trim_matches('"'), state.as_str());
        }
    }

    #[test]
    fn test_classify_title() {
        let sigils = TitleSigils::default();
        assert_eq!(sigils.classify("✳ Claude Code"), TitleSignal::Ready);
        assert_eq!(sigils.classify("⠂ Refactoring"), TitleSignal::Busy);
        assert_eq!(sigils.classify("my-fixed-title"), TitleSignal::Absent);
        assert_eq!(sigils.classify(""), TitleSignal::Absent);
        // Sigil must be the first character
        assert_eq!(sigils.classify(" ✳ Claude Code"), TitleSignal::Absent);
    }

    #[test]
    fn test_custom_sigils() {
        let sigils = TitleSigils {
            ready: '*',
            busy: vec!['~'],
        };
        assert_eq!(sigils.classify("* idle"), TitleSignal::Ready);
        assert_eq!(sigils.classify("~ busy"), TitleSignal::Busy);
        assert_eq!(sigils.classify("✳ idle"), TitleSignal::Absent);
    }
}
