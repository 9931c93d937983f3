//! One refresh cycle: permission check, capture, enumerate, enrich, evict.
//!
//! Everything here is synchronous and runs on the blocking pool. The
//! cycle never publishes itself; it hands the enriched window list back
//! to the tracker loop.

use std::collections::HashSet;
use std::sync::Arc;

use termwatch_core::{HookStore, TitleSigils, WindowRecord};
use tracing::{debug, info, warn};

use crate::attribution::{AttributionResolver, CwdResolver, LaunchRegistry, ProjectRegistry};
use crate::classifier::AgentStateClassifier;
use crate::permission::AccessCheck;
use crate::process::{capture, ProcessLister};
use crate::windows::{EnumerateError, WindowEnumerator};

/// Why a cycle published nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PermissionDenied,
    /// The process listing failed or came back empty.
    EmptyProcessSnapshot,
    EnumerationFailed,
}

/// Result of running one cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Publish(Vec<WindowRecord>),
    Skipped(SkipReason),
}

/// Everything a cycle reads from the outside world.
pub struct CycleSources {
    pub access: Box<dyn AccessCheck>,
    pub lister: Box<dyn ProcessLister>,
    pub enumerator: Box<dyn WindowEnumerator>,
    pub cwd_resolver: Box<dyn CwdResolver>,
    pub projects: Arc<dyn ProjectRegistry>,
    pub launches: Arc<dyn LaunchRegistry>,
    pub hooks: HookStore,
    pub sigils: TitleSigils,
    pub agent_process: String,
}

/// Refresh state carried between cycles (the caches).
pub struct RefreshCycle {
    access: Box<dyn AccessCheck>,
    lister: Box<dyn ProcessLister>,
    enumerator: Box<dyn WindowEnumerator>,
    resolver: AttributionResolver,
    projects: Arc<dyn ProjectRegistry>,
    launches: Arc<dyn LaunchRegistry>,
    hooks: HookStore,
    sigils: TitleSigils,
    agent_process: String,
    permission_warned: bool,
    unsupported_warned: bool,
}

impl RefreshCycle {
    pub fn new(sources: CycleSources) -> Self {
        Self {
            access: sources.access,
            lister: sources.lister,
            enumerator: sources.enumerator,
            resolver: AttributionResolver::new(sources.cwd_resolver),
            projects: sources.projects,
            launches: sources.launches,
            hooks: sources.hooks,
            sigils: sources.sigils,
            agent_process: sources.agent_process,
            permission_warned: false,
            unsupported_warned: false,
        }
    }

    pub fn run(&mut self) -> CycleOutcome {
        if !self.access.is_granted() {
            return self.permission_denied();
        }

        let snapshot = capture(self.lister.as_ref(), &self.agent_process);
        if snapshot.is_empty() {
            debug!("Empty process snapshot, skipping cycle");
            return CycleOutcome::Skipped(SkipReason::EmptyProcessSnapshot);
        }

        let mut windows = match self.enumerator.enumerate() {
            Ok(windows) => windows,
            Err(EnumerateError::PermissionDenied) => return self.permission_denied(),
            Err(EnumerateError::Unsupported) => {
                if !self.unsupported_warned {
                    warn!(backend = self.enumerator.name(), "Window enumeration unsupported on this host");
                    self.unsupported_warned = true;
                }
                return CycleOutcome::Skipped(SkipReason::EnumerationFailed);
            }
            Err(e) => {
                warn!(backend = self.enumerator.name(), error = %e, "Window enumeration failed");
                return CycleOutcome::Skipped(SkipReason::EnumerationFailed);
            }
        };
        self.permission_warned = false;

        let owners: HashSet<u32> = windows.iter().map(|w| w.owner_pid).collect();
        self.resolver.evict(&snapshot, &owners);
        self.resolver.sync_projects(&self.projects.projects());

        let hook_states = self.hooks.load();
        let classifier = AgentStateClassifier::new(&self.sigils, &hook_states, &snapshot);

        for window in &mut windows {
            if let Some(attribution) = self.resolver.resolve(window.owner_pid, &snapshot, self.launches.as_ref()) {
                window.cwd = Some(attribution.cwd);
                window.project = attribution.project;
            }

            let classification = classifier.classify(&window.title, window.owner_pid, window.cwd.as_deref());
            window.agent_state = classification.state;
            window.has_agent_process = classification.has_agent_process;
            window.hook_state = classification.hook_state;
        }

        debug!(
            windows = windows.len(),
            processes = snapshot.len(),
            cached_shells = self.resolver.shell_cache().len(),
            "Refresh cycle complete"
        );
        CycleOutcome::Publish(windows)
    }

    fn permission_denied(&mut self) -> CycleOutcome {
        if !self.permission_warned {
            info!("Accessibility permission not granted, window tracking paused");
            self.permission_warned = true;
        }
        CycleOutcome::Skipped(SkipReason::PermissionDenied)
    }

    pub fn resolver(&self) -> &AttributionResolver {
        &self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use termwatch_core::ProcessInfo;

    use crate::attribution::{CwdError, InMemoryLaunches, StaticProjects};
    use crate::permission::StaticAccess;
    use crate::process::SnapshotError;

    struct OneProcess;

    impl ProcessLister for OneProcess {
        fn list(&self) -> Result<Vec<ProcessInfo>, SnapshotError> {
            Ok(vec![ProcessInfo::new(500, 1, "ghostty")])
        }
    }

    struct NoWindowApi;

    impl WindowEnumerator for NoWindowApi {
        fn name(&self) -> &'static str {
            "none"
        }

        fn enumerate(&self) -> Result<Vec<WindowRecord>, EnumerateError> {
            Err(EnumerateError::Unsupported)
        }
    }

    struct NoCwd;

    impl CwdResolver for NoCwd {
        fn cwd(&self, pid: u32) -> Result<PathBuf, CwdError> {
            Err(CwdError::NotFound { pid })
        }
    }

    #[test]
    fn test_unsupported_enumeration_reported_once() {
        let hook_dir = tempfile::tempdir().unwrap();
        let mut cycle = RefreshCycle::new(CycleSources {
            access: Box::new(StaticAccess(true)),
            lister: Box::new(OneProcess),
            enumerator: Box::new(NoWindowApi),
            cwd_resolver: Box::new(NoCwd),
            projects: Arc::new(StaticProjects::default()),
            launches: Arc::new(InMemoryLaunches::new()),
            hooks: HookStore::new(hook_dir.path()),
            sigils: TitleSigils::default(),
            agent_process: "claude".to_string(),
        });

        assert!(!cycle.unsupported_warned);
        for _ in 0..3 {
            assert!(matches!(
                cycle.run(),
                CycleOutcome::Skipped(SkipReason::EnumerationFailed)
            ));
            assert!(cycle.unsupported_warned);
        }
    }
}
