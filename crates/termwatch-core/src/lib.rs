//! termwatch Core - Shared types for terminal window tracking
//!
//! This crate provides the domain types shared between the daemon
//! (termwatchd), the wire protocol, and the client CLI.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod agent;
pub mod error;
pub mod hook;
pub mod paths;
pub mod process;
pub mod project;
pub mod window;

// Re-exports for convenience
pub use agent::{AgentState, TitleSignal, TitleSigils};
pub use error::{DomainError, DomainResult};
pub use hook::{HookLabel, HookStateEntry, HookStates, HookStore};
pub use process::{ProcessInfo, ProcessSnapshot, MAX_ANCESTRY_HOPS};
pub use project::{match_project, paths_overlap, Project};
pub use window::{WindowId, WindowRecord, WindowSnapshot};
