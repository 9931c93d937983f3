//! Process table snapshots.
//!
//! A [`ProcessSnapshot`] is captured once per refresh cycle and shared by
//! every lookup in that cycle: the login/shell walk used for attribution and
//! the ancestry walk used for agent detection both read the same table.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Maximum number of parent hops when tracing an agent back to its window.
pub const MAX_ANCESTRY_HOPS: usize = 15;

/// One row of the OS process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: u32,
    /// Command as reported by the lister. May be a full executable path.
    pub command: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, parent_pid: u32, command: impl Into<String>) -> Self {
        Self {
            pid,
            parent_pid,
            command: command.into(),
        }
    }

    /// Final path component of the command (`/usr/bin/login` -> `login`).
    pub fn command_name(&self) -> &str {
        self.command.rsplit('/').next().unwrap_or(&self.command)
    }
}

/// Immutable view of the process table for a single refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    processes: BTreeMap<u32, ProcessInfo>,
    /// Parent pid -> child pids, ascending.
    children: BTreeMap<u32, Vec<u32>>,
    agent_pids: Vec<u32>,
}

impl ProcessSnapshot {
    /// Builds a snapshot, marking every process whose command name equals
    /// `agent_name` (ASCII case-insensitive) as an agent process.
    pub fn from_processes(processes: impl IntoIterator<Item = ProcessInfo>, agent_name: &str) -> Self {
        let processes: BTreeMap<u32, ProcessInfo> =
            processes.into_iter().map(|p| (p.pid, p)).collect();

        // BTreeMap iterates in pid order, so each child list comes out sorted
        let mut children: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for process in processes.values() {
            children
                .entry(process.parent_pid)
                .or_default()
                .push(process.pid);
        }

        let agent_pids = processes
            .values()
            .filter(|p| p.command_name().eq_ignore_ascii_case(agent_name))
            .map(|p| p.pid)
            .collect();

        Self {
            processes,
            children,
            agent_pids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessInfo> {
        self.processes.get(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn parent_of(&self, pid: u32) -> Option<u32> {
        self.processes.get(&pid).map(|p| p.parent_pid)
    }

    /// Child pids of `pid`, ascending.
    pub fn children_of(&self, pid: u32) -> &[u32] {
        self.children.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pids whose command matched the agent process name.
    pub fn agent_pids(&self) -> &[u32] {
        &self.agent_pids
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessInfo> {
        self.processes.values()
    }

    /// First child of `pid` (lowest pid) matching `predicate`.
    pub fn find_child<F>(&self, pid: u32, predicate: F) -> Option<&ProcessInfo>
    where
        F: Fn(&ProcessInfo) -> bool,
    {
        self.children_of(pid)
            .iter()
            .filter_map(|child| self.processes.get(child))
            .find(|p| predicate(p))
    }

    /// Every pid reachable by walking parents from any agent pid.
    ///
    /// Computed once per cycle so each window is a set lookup instead of
    /// a walk per (agent, window) pair.
    pub fn agent_ancestors(&self, max_hops: usize) -> HashSet<u32> {
        let mut ancestors = HashSet::new();
        for &agent in &self.agent_pids {
            let mut current = agent;
            for _ in 0..max_hops {
                match self.parent_of(current) {
                    Some(parent) if parent > 1 => {
                        ancestors.insert(parent);
                        current = parent;
                    }
                    _ => break,
                }
            }
        }
        ancestors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProcessSnapshot {
        ProcessSnapshot::from_processes(
            vec![
                ProcessInfo::new(1, 0, "/sbin/launchd"),
                ProcessInfo::new(500, 1, "/Applications/Ghostty.app/Contents/MacOS/ghostty"),
                ProcessInfo::new(501, 500, "/usr/bin/login"),
                ProcessInfo::new(502, 501, "-zsh"),
                ProcessInfo::new(610, 502, "Claude"),
                ProcessInfo::new(611, 610, "node"),
            ],
            "claude",
        )
    }

    #[test]
    fn test_command_name_strips_path() {
        let info = ProcessInfo::new(1, 0, "/usr/bin/login");
        assert_eq!(info.command_name(), "login");
        let bare = ProcessInfo::new(2, 0, "zsh");
        assert_eq!(bare.command_name(), "zsh");
    }

    #[test]
    fn test_agent_detection_case_insensitive() {
        let snapshot = sample();
        assert_eq!(snapshot.agent_pids(), &[610]);
    }

    #[test]
    fn test_agent_name_must_match_exactly() {
        let snapshot = ProcessSnapshot::from_processes(
            vec![ProcessInfo::new(10, 1, "claude-helper")],
            "claude",
        );
        assert!(snapshot.agent_pids().is_empty());
    }

    #[test]
    fn test_children_sorted() {
        let snapshot = ProcessSnapshot::from_processes(
            vec![
                ProcessInfo::new(30, 1, "c"),
                ProcessInfo::new(10, 1, "a"),
                ProcessInfo::new(20, 1, "b"),
            ],
            "claude",
        );
        assert_eq!(snapshot.children_of(1), &[10, 20, 30]);
        assert!(snapshot.children_of(99).is_empty());
    }

    #[test]
    fn test_find_child() {
        let snapshot = sample();
        let login = snapshot.find_child(500, |p| p.command.contains("login"));
        assert_eq!(login.map(|p| p.pid), Some(501));
        assert!(snapshot.find_child(500, |p| p.command.contains("nope")).is_none());
    }

    #[test]
    fn test_ancestry_walk_is_bounded() {
        // 20-deep chain: agent at the bottom, owner at the top
        let mut processes = vec![ProcessInfo::new(100, 1, "owner")];
        for pid in 101..=120 {
            processes.push(ProcessInfo::new(pid, pid - 1, "sh"));
        }
        processes.push(ProcessInfo::new(200, 120, "claude"));
        let snapshot = ProcessSnapshot::from_processes(processes, "claude");

        assert!(!snapshot.agent_ancestors(MAX_ANCESTRY_HOPS).contains(&100));
        assert!(snapshot.agent_ancestors(MAX_ANCESTRY_HOPS).contains(&120));
    }

    #[test]
    fn test_ancestry_stops_at_init() {
        let snapshot = sample();
        let ancestors = snapshot.agent_ancestors(MAX_ANCESTRY_HOPS);
        assert!(ancestors.contains(&500));
        assert!(ancestors.contains(&502));
        assert!(!ancestors.contains(&1));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ProcessSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
        assert!(snapshot.parent_of(1).is_none());
        assert!(snapshot.agent_ancestors(MAX_ANCESTRY_HOPS).is_empty());
    }
}
