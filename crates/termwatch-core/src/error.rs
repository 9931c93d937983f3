//! Domain-specific error types following panic-free policy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// A window id did not have the `<pid>-<index>` shape
    #[error("Invalid window id: {value} (expected <pid>-<index>)")]
    InvalidWindowId { value: String },

    /// Parse error for incoming data
    #[error("Failed to parse {field}: {reason}")]
    ParseError { field: String, reason: String },

    /// Hook state file could not be read or written
    #[error("Hook state I/O failed at {path}: {source}")]
    HookIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
