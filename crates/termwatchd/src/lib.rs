//! termwatch Daemon - window tracker and local query service
//!
//! This crate provides the core infrastructure for the termwatch daemon:
//! - `tracker` - fixed-interval refresh loop publishing window snapshots
//! - `process`, `windows`, `attribution`, `classifier` - the cycle's stages
//! - `server` - loopback HTTP server answering queries and focus requests
//! - `config` - TOML configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       termwatchd                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │  QueryServer    │────▶│       TrackerHandle         │    │
//! │  │ (loopback TCP)  │     │ (SnapshotProvider, Focus)   │    │
//! │  └─────────────────┘     └──────────────┬──────────────┘    │
//! │                                         │ watch             │
//! │                                         ▼                   │
//! │                          ┌─────────────────────────────┐    │
//! │                          │   Tracker / RefreshCycle    │    │
//! │                          │ ps → windows → cwd → state  │    │
//! │                          └─────────────────────────────┘    │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - External command failures degrade to stale or absent data

pub mod attribution;
pub mod classifier;
pub mod config;
pub mod focus;
pub mod osascript;
pub mod permission;
pub mod process;
pub mod server;
pub mod tracker;
pub mod windows;

use std::sync::Arc;

use termwatch_core::HookStore;

use crate::attribution::{default_cwd_resolver, InMemoryLaunches, StaticProjects};
use crate::config::Config;
use crate::focus::SystemEventsFocuser;
use crate::permission::SystemAccessCheck;
use crate::process::lister_for;
use crate::tracker::{CycleSources, RefreshCycle, Tracker, TrackerHandle};
use crate::windows::CompositeEnumerator;

/// Builds a tracker wired to the host's real process table, windows and
/// focus mechanism.
pub fn system_tracker(config: &Config) -> (Tracker, TrackerHandle) {
    let cycle = RefreshCycle::new(CycleSources {
        access: Box::new(SystemAccessCheck),
        lister: lister_for(config.process_lister),
        enumerator: Box::new(CompositeEnumerator::detect(&config.app_name)),
        cwd_resolver: default_cwd_resolver(),
        projects: Arc::new(StaticProjects::new(config.projects.clone())),
        launches: Arc::new(InMemoryLaunches::new()),
        hooks: HookStore::new(&config.hook_state_dir),
        sigils: config.sigils.clone(),
        agent_process: config.agent_process.clone(),
    });
    Tracker::new(cycle, Arc::new(SystemEventsFocuser))
}
