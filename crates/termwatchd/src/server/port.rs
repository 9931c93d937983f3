//! Port selection and the port discovery file.

use std::fs;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tracing::{debug, warn};

use super::ServerError;

/// Binds the first free loopback port in `base..base + attempts`.
pub async fn bind_first_available(base: u16, attempts: u16) -> Result<(TcpListener, u16), ServerError> {
    let attempts = attempts.max(1);
    let last = base.saturating_add(attempts - 1);

    for port in base..=last {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                let bound = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                return Ok((listener, bound));
            }
            Err(e) => {
                debug!(port, error = %e, "Port unavailable");
            }
        }
    }

    Err(ServerError::PortExhausted { first: base, last })
}

/// The plain-text file advertising the bound port.
#[derive(Debug, Clone)]
pub struct PortRegistration {
    path: PathBuf,
}

impl PortRegistration {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `port`, creating the parent directory if needed.
    pub fn write(&self, port: u16) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, port.to_string())
    }

    /// Removes the file. A missing file is not an error.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed port file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove port file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use termwatch_core::paths::read_port_file;

    #[test]
    fn test_write_and_remove() {
        let temp = TempDir::new().unwrap();
        let registration = PortRegistration::new(temp.path().join("nested").join("port"));

        registration.write(7683).unwrap();
        assert_eq!(read_port_file(registration.path()), Some(7683));

        registration.remove();
        assert!(!registration.path().exists());
        // second remove is a no-op
        registration.remove();
    }

    #[tokio::test]
    async fn test_skips_busy_port() {
        let (held, first) = bind_first_available(0, 1).await.unwrap();
        assert_ne!(first, 0);

        // `first` is taken; the next free one in range must be chosen
        let (_listener, port) = bind_first_available(first, 3).await.unwrap();
        assert!(port > first && port <= first.saturating_add(2));
        drop(held);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let (held, port) = bind_first_available(0, 1).await.unwrap();
        let err = bind_first_available(port, 1).await.unwrap_err();
        assert!(matches!(err, ServerError::PortExhausted { .. }));
        drop(held);
    }
}
