//! Error types for the termwatch client.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Client Error Type
// ============================================================================

/// Errors talking to the daemon.
///
/// Connection errors carry the port that was tried so the message tells the
/// user which daemon instance was expected.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No `--port` given and the port file is missing or unreadable.
    ///
    /// Usually means the daemon is not running.
    #[error("No daemon port found in {path} (is termwatchd running?)")]
    NoPort { path: PathBuf },

    /// The TCP connection could not be established.
    #[error("Failed to connect to daemon on port {port}: {source}")]
    Connect {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Request to daemon timed out")]
    Timeout,

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The daemon's reply was not a well-formed HTTP response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The daemon answered with a non-success status.
    #[error("Daemon returned {status}: {message}")]
    Status { status: u16, message: String },

    /// JSON parse error passthrough.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ClientError {
    /// True for a 404 from the focus endpoint.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
