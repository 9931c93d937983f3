//! termwatch client library
//!
//! Everything the `termwatch` command needs besides argument parsing:
//! - `client` - talks to the daemon's loopback HTTP API
//! - `hook` - records agent hook events into the shared hook directory
//! - `output` - renders window listings for the terminal
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, or `todo!()` outside of tests.

pub mod client;
pub mod error;
pub mod hook;
pub mod output;

// Re-export commonly used types
pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use hook::{HookAction, HookError, HookInput};
