//! Well-known file locations shared by the daemon, the hook and the client.

use std::fs;
use std::path::{Path, PathBuf};

/// Per-user data directory (`~/.termwatch`).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".termwatch")
}

/// File the query service writes its bound port to.
pub fn default_port_file() -> PathBuf {
    data_dir().join("port")
}

/// Directory the hook writes per-directory state files into.
pub fn default_hook_dir() -> PathBuf {
    data_dir().join("hooks")
}

/// Reads a port number from a port file written by the daemon.
pub fn read_port_file(path: &Path) -> Option<u16> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
