//! Window to project attribution.
//!
//! A terminal window owns a `login` child which in turn owns the user's
//! interactive shell. The shell's working directory is the best available
//! signal for what the window is working on:
//!
//! ```text
//! 500 ghostty ── 501 login ── 502 -zsh   cwd = /Users/me/proj
//! ```
//!
//! Resolving a cwd costs an external command, so results are memoized per
//! shell pid ([`ShellCwdCache`]) and per owning pid ([`AttributionCache`]).
//! Both caches are pruned against the current cycle's data by
//! [`AttributionResolver::evict`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::RwLock;

use termwatch_core::{match_project, ProcessSnapshot, Project};
use thiserror::Error;
use tracing::{debug, trace, warn};

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while resolving a process's working directory.
#[derive(Debug, Error)]
pub enum CwdError {
    #[error("failed to run lsof for pid {pid}: {source}")]
    Spawn {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("no cwd reported for pid {pid}")]
    NotFound { pid: u32 },

    #[error("failed to read cwd of pid {pid}: {message}")]
    Read { pid: u32, message: String },
}

// ============================================================================
// Cwd resolution
// ============================================================================

/// Looks up the current working directory of a process.
pub trait CwdResolver: Send + Sync {
    fn cwd(&self, pid: u32) -> Result<PathBuf, CwdError>;
}

/// Resolves cwd with `lsof -a -p PID -d cwd -Fn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsofCwdResolver;

impl CwdResolver for LsofCwdResolver {
    fn cwd(&self, pid: u32) -> Result<PathBuf, CwdError> {
        let output = Command::new("lsof")
            .args(["-a", "-p", &pid.to_string(), "-d", "cwd", "-Fn"])
            .output()
            .map_err(|source| CwdError::Spawn { pid, source })?;

        // lsof exits non-zero when the pid is gone; stdout is empty then too
        parse_lsof_cwd(&String::from_utf8_lossy(&output.stdout)).ok_or(CwdError::NotFound { pid })
    }
}

/// Extracts the path from lsof's field output (the line starting with `n`).
pub fn parse_lsof_cwd(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix('n'))
        .map(str::trim)
        .filter(|path| path.starts_with('/'))
        .map(PathBuf::from)
}

/// Resolves cwd from `/proc/PID/cwd`.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsCwdResolver;

#[cfg(target_os = "linux")]
impl CwdResolver for ProcfsCwdResolver {
    fn cwd(&self, pid: u32) -> Result<PathBuf, CwdError> {
        let pid_i32 = i32::try_from(pid).map_err(|_| CwdError::NotFound { pid })?;
        procfs::process::Process::new(pid_i32)
            .and_then(|process| process.cwd())
            .map_err(|e| CwdError::Read {
                pid,
                message: e.to_string(),
            })
    }
}

/// The platform's preferred resolver.
pub fn default_cwd_resolver() -> Box<dyn CwdResolver> {
    #[cfg(target_os = "linux")]
    {
        Box::new(ProcfsCwdResolver)
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(LsofCwdResolver)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Source of configured projects.
pub trait ProjectRegistry: Send + Sync {
    fn projects(&self) -> Vec<Project>;
}

/// Project list fixed at startup (from the config file).
#[derive(Debug, Clone, Default)]
pub struct StaticProjects(Vec<Project>);

impl StaticProjects {
    pub fn new(projects: Vec<Project>) -> Self {
        Self(projects)
    }
}

impl ProjectRegistry for StaticProjects {
    fn projects(&self) -> Vec<Project> {
        self.0.clone()
    }
}

/// What is known about a window this system launched itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedWindow {
    pub project: String,
    pub cwd: PathBuf,
}

/// Owner pids of windows opened for a known project.
pub trait LaunchRegistry: Send + Sync {
    fn lookup(&self, owner_pid: u32) -> Option<LaunchedWindow>;
}

/// In-memory [`LaunchRegistry`]. Launchers record here; the tracker reads.
#[derive(Debug, Default)]
pub struct InMemoryLaunches {
    entries: RwLock<HashMap<u32, LaunchedWindow>>,
}

impl InMemoryLaunches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, owner_pid: u32, launched: LaunchedWindow) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(owner_pid, launched);
        }
    }

    pub fn forget(&self, owner_pid: u32) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&owner_pid);
        }
    }
}

impl LaunchRegistry for InMemoryLaunches {
    fn lookup(&self, owner_pid: u32) -> Option<LaunchedWindow> {
        self.entries.read().ok()?.get(&owner_pid).cloned()
    }
}

// ============================================================================
// Caches
// ============================================================================

/// Shell pid -> cwd. A shell's cwd is treated as fixed for the life of
/// the pid.
#[derive(Debug, Default)]
pub struct ShellCwdCache {
    entries: HashMap<u32, PathBuf>,
}

impl ShellCwdCache {
    pub fn get(&self, shell_pid: u32) -> Option<&PathBuf> {
        self.entries.get(&shell_pid)
    }

    pub fn insert(&mut self, shell_pid: u32, cwd: PathBuf) {
        self.entries.insert(shell_pid, cwd);
    }

    /// Drops shells that are no longer in the process table.
    pub fn retain_live(&mut self, snapshot: &ProcessSnapshot) {
        self.entries.retain(|pid, _| snapshot.contains(*pid));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of matching an owner's cwd against the project list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectMatch {
    Matched(String),
    NoMatch,
}

impl ProjectMatch {
    pub fn project(&self) -> Option<&str> {
        match self {
            Self::Matched(name) => Some(name),
            Self::NoMatch => None,
        }
    }
}

/// Owner pid -> project match, together with the cwd it was matched from.
/// Absent means not yet attempted.
#[derive(Debug, Default)]
pub struct AttributionCache {
    entries: HashMap<u32, (PathBuf, ProjectMatch)>,
}

impl AttributionCache {
    pub fn get(&self, owner_pid: u32) -> Option<&ProjectMatch> {
        self.entries.get(&owner_pid).map(|(_, outcome)| outcome)
    }

    /// The cached match, only if it was computed from `cwd`.
    pub fn lookup(&self, owner_pid: u32, cwd: &Path) -> Option<&ProjectMatch> {
        self.entries
            .get(&owner_pid)
            .filter(|(matched_cwd, _)| matched_cwd == cwd)
            .map(|(_, outcome)| outcome)
    }

    pub fn insert(&mut self, owner_pid: u32, cwd: PathBuf, outcome: ProjectMatch) {
        self.entries.insert(owner_pid, (cwd, outcome));
    }

    /// Drops owners that no longer have any window.
    pub fn retain_owners(&mut self, owners: &HashSet<u32>) {
        self.entries.retain(|pid, _| owners.contains(pid));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Where a window is working and which project that belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub cwd: PathBuf,
    pub project: Option<String>,
}

/// Resolves windows to working directories and projects, with caching.
pub struct AttributionResolver {
    cwd_resolver: Box<dyn CwdResolver>,
    shells: ShellCwdCache,
    matches: AttributionCache,
    /// Project list the attribution cache was built against.
    known_projects: Vec<Project>,
}

impl AttributionResolver {
    pub fn new(cwd_resolver: Box<dyn CwdResolver>) -> Self {
        Self {
            cwd_resolver,
            shells: ShellCwdCache::default(),
            matches: AttributionCache::default(),
            known_projects: Vec::new(),
        }
    }

    /// Clears cached matches if the project list changed since last cycle.
    pub fn sync_projects(&mut self, projects: &[Project]) {
        if self.known_projects.as_slice() != projects {
            if !self.matches.is_empty() {
                debug!(projects = projects.len(), "Project list changed, clearing attribution cache");
            }
            self.matches.clear();
            self.known_projects = projects.to_vec();
        }
    }

    /// Attributes the window owned by `owner_pid`.
    ///
    /// Returns `None` when no shell can be found or its cwd cannot be
    /// resolved. Nothing is cached in that case, so the next cycle retries.
    pub fn resolve(
        &mut self,
        owner_pid: u32,
        snapshot: &ProcessSnapshot,
        launches: &dyn LaunchRegistry,
    ) -> Option<Attribution> {
        if let Some(launched) = launches.lookup(owner_pid) {
            trace!(owner_pid, project = %launched.project, "Attributed from launch registry");
            return Some(Attribution {
                cwd: launched.cwd,
                project: Some(launched.project),
            });
        }

        let shell_pid = find_shell(owner_pid, snapshot)?;
        let cwd = self.shell_cwd(shell_pid)?;

        // A new shell under the same owner may sit in another directory
        let outcome = match self.matches.lookup(owner_pid, &cwd) {
            Some(cached) => cached.clone(),
            None => {
                let outcome = match match_project(&cwd, &self.known_projects) {
                    Some(project) => ProjectMatch::Matched(project.name.clone()),
                    None => ProjectMatch::NoMatch,
                };
                trace!(owner_pid, cwd = %cwd.display(), ?outcome, "Matched project");
                self.matches.insert(owner_pid, cwd.clone(), outcome.clone());
                outcome
            }
        };

        Some(Attribution {
            cwd,
            project: outcome.project().map(str::to_string),
        })
    }

    fn shell_cwd(&mut self, shell_pid: u32) -> Option<PathBuf> {
        if let Some(cwd) = self.shells.get(shell_pid) {
            return Some(cwd.clone());
        }

        match self.cwd_resolver.cwd(shell_pid) {
            Ok(cwd) => {
                debug!(shell_pid, cwd = %cwd.display(), "Resolved shell cwd");
                self.shells.insert(shell_pid, cwd.clone());
                Some(cwd)
            }
            Err(e) => {
                warn!(shell_pid, error = %e, "Failed to resolve shell cwd");
                None
            }
        }
    }

    /// Prunes both caches against this cycle's process table and windows.
    pub fn evict(&mut self, snapshot: &ProcessSnapshot, owners: &HashSet<u32>) {
        self.shells.retain_live(snapshot);
        self.matches.retain_owners(owners);
    }

    pub fn shell_cache(&self) -> &ShellCwdCache {
        &self.shells
    }

    pub fn attribution_cache(&self) -> &AttributionCache {
        &self.matches
    }
}

/// Finds the interactive shell under a window: the owner's `login` child,
/// then that child's lowest-pid child.
pub fn find_shell(owner_pid: u32, snapshot: &ProcessSnapshot) -> Option<u32> {
    let login = snapshot.find_child(owner_pid, |p| p.command.contains("login"))?;
    snapshot.children_of(login.pid).first().copied()
}
