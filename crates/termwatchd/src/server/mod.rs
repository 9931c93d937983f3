//! Loopback HTTP query server.
//!
//! The server:
//! - Picks the first free port from a small range and advertises it in the
//!   port file
//! - Spawns one task per connection, each serving a single request
//! - Reads snapshots and forwards focus requests through injected traits
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   QueryServer   │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │handle_connection│────▶│ SnapshotProvider │
//! │ (per request)   │     │ FocusHandler     │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and the loop continues

mod connection;
mod port;

pub use connection::{handle_connection, respond, ConnectionContext, ConnectionError, READ_TIMEOUT};
pub use port::{bind_first_available, PortRegistration};

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::tracker::{FocusHandler, SnapshotProvider};

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_port: u16,
    pub port_attempts: u16,
    pub port_file: PathBuf,
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_port: config.base_port,
            port_attempts: config.port_attempts,
            port_file: config.port_file.clone(),
        }
    }
}

/// Bound query server, ready to [`run`](QueryServer::run).
pub struct QueryServer {
    listener: TcpListener,
    port: u16,
    registration: PortRegistration,
    ctx: ConnectionContext,
    cancel_token: CancellationToken,
    connection_counter: AtomicU64,
}

impl QueryServer {
    /// Binds a port and writes the port file.
    ///
    /// # Errors
    ///
    /// - `ServerError::PortExhausted` if every candidate port is taken
    /// - `ServerError::PortFile` if the port file cannot be written
    pub async fn bind(
        config: ServerConfig,
        snapshots: Arc<dyn SnapshotProvider>,
        focus: Option<Arc<dyn FocusHandler>>,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let (listener, port) = bind_first_available(config.base_port, config.port_attempts).await?;

        let registration = PortRegistration::new(config.port_file);
        registration.write(port).map_err(|e| ServerError::PortFile {
            path: registration.path().to_path_buf(),
            error: e.to_string(),
        })?;

        info!(
            port,
            port_file = %registration.path().display(),
            "Query server bound"
        );

        Ok(Self {
            listener,
            port,
            registration,
            ctx: ConnectionContext { snapshots, focus },
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accepts connections until the cancellation token fires, then removes
    /// the port file.
    pub async fn run(self) {
        info!(port = self.port, "Query server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            tokio::spawn(handle_connection(stream, self.ctx.clone(), conn_num));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        self.registration.remove();
        info!("Server cleanup complete");
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("No free port in {first}..={last}")]
    PortExhausted { first: u16, last: u16 },

    #[error("Failed to write port file {path}: {error}")]
    PortFile { path: PathBuf, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::PortExhausted { first: 7681, last: 7690 };
        assert!(err.to_string().contains("7681"));
        assert!(err.to_string().contains("7690"));

        let err = ServerError::PortFile {
            path: PathBuf::from("/tmp/port"),
            error: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("/tmp/port"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_server_config_from_config() {
        let config = Config::default();
        let server = ServerConfig::from(&config);
        assert_eq!(server.base_port, 7681);
        assert_eq!(server.port_attempts, 10);
        assert_eq!(server.port_file, config.port_file);
    }
}
