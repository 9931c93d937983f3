//! Agent state classification.
//!
//! Combines three weak signals into one [`AgentState`] per window:
//!
//! 1. The title's leading sigil. The ready sigil means the agent is at its
//!    prompt; the hook store then says whether it is asking a question.
//! 2. A busy spinner glyph means the agent is working.
//! 3. Without a sigil, an agent process somewhere below the window's owner
//!    means it is at least running.
//!
//! Classification is a pure function of its inputs.

use std::collections::HashSet;
use std::path::Path;

use termwatch_core::{
    AgentState, HookLabel, HookStates, ProcessSnapshot, TitleSignal, TitleSigils,
    MAX_ANCESTRY_HOPS,
};

/// Result of classifying one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub state: AgentState,
    pub has_agent_process: bool,
    pub hook_state: Option<HookLabel>,
}

/// Per-cycle classifier. Build once per cycle, then call [`classify`]
/// for each window.
///
/// [`classify`]: AgentStateClassifier::classify
pub struct AgentStateClassifier<'a> {
    sigils: &'a TitleSigils,
    hooks: &'a HookStates,
    /// Every pid some agent process descends from.
    agent_ancestors: HashSet<u32>,
}

impl<'a> AgentStateClassifier<'a> {
    pub fn new(sigils: &'a TitleSigils, hooks: &'a HookStates, snapshot: &ProcessSnapshot) -> Self {
        Self {
            sigils,
            hooks,
            agent_ancestors: snapshot.agent_ancestors(MAX_ANCESTRY_HOPS),
        }
    }

    pub fn classify(&self, title: &str, owner_pid: u32, cwd: Option<&Path>) -> Classification {
        let has_agent_process = self.agent_ancestors.contains(&owner_pid);
        let hook_state = cwd
            .and_then(|cwd| self.hooks.lookup(cwd))
            .map(|entry| entry.state);

        let state = match self.sigils.classify(title) {
            TitleSignal::Ready => match hook_state {
                Some(HookLabel::Asking) => AgentState::Asking,
                _ => AgentState::Waiting,
            },
            TitleSignal::Busy => AgentState::Working,
            TitleSignal::Absent if has_agent_process => AgentState::Running,
            TitleSignal::Absent => AgentState::NotRunning,
        };

        Classification {
            state,
            has_agent_process,
            hook_state,
        }
    }
}
