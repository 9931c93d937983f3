//! HTTP client for the daemon's query API.
//!
//! Each call opens a fresh loopback connection, sends one request and reads
//! until the daemon closes the socket, mirroring the server's
//! one-request-per-connection model.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use termwatch_core::paths::read_port_file;
use termwatch_core::WindowId;
use termwatch_protocol::{ErrorResponse, FocusResponse, HealthResponse, Response, WindowView, WindowsResponse};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Default upper bound on a single request, connect included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for one daemon instance.
#[derive(Debug, Clone)]
pub struct ApiClient {
    port: u16,
    timeout: Duration,
}

impl ApiClient {
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Uses `port_override` if given, else the port advertised in `port_file`.
    ///
    /// # Errors
    ///
    /// `ClientError::NoPort` if neither yields a port.
    pub fn discover(port_override: Option<u16>, port_file: &Path) -> Result<Self> {
        if let Some(port) = port_override {
            return Ok(Self::new(port));
        }
        read_port_file(port_file)
            .map(Self::new)
            .ok_or_else(|| ClientError::NoPort {
                path: port_file.to_path_buf(),
            })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `GET /api/health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let (status, body) = self.request("GET", "/api/health").await?;
        expect_ok(status, &body)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `GET /api/windows`.
    pub async fn windows(&self) -> Result<Vec<WindowView>> {
        let (status, body) = self.request("GET", "/api/windows").await?;
        expect_ok(status, &body)?;
        let response: WindowsResponse = serde_json::from_str(&body)?;
        Ok(response.windows)
    }

    /// `POST /api/windows/<id>/focus`.
    ///
    /// # Errors
    ///
    /// `ClientError::Status` carrying the daemon's message for any non-200
    /// answer; use [`ClientError::is_not_found`] to detect a stale id.
    pub async fn focus(&self, id: WindowId) -> Result<()> {
        let path = format!("/api/windows/{id}/focus");
        let (status, body) = self.request("POST", &path).await?;
        expect_ok(status, &body)?;

        let response: FocusResponse = serde_json::from_str(&body)?;
        if response.success {
            Ok(())
        } else {
            Err(ClientError::Status {
                status,
                message: response.error.unwrap_or_else(|| "Focus failed".to_string()),
            })
        }
    }

    async fn request(&self, method: &str, path: &str) -> Result<(u16, String)> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let raw = format!(
            "{method} {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            port = self.port
        );
        debug!(method, path, port = self.port, "Sending request");

        let exchange = async {
            let mut stream = TcpStream::connect(addr)
                .await
                .map_err(|source| ClientError::Connect {
                    port: self.port,
                    source,
                })?;
            stream.write_all(raw.as_bytes()).await?;
            stream.flush().await?;

            let mut out = String::new();
            stream.read_to_string(&mut out).await?;
            Ok::<_, ClientError>(out)
        };

        let out = timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout)??;
        Response::parse_raw(&out).map_err(|e| ClientError::Protocol(e.to_string()))
    }
}

/// Turns a non-200 answer into `ClientError::Status`, pulling the message
/// out of whichever error body the daemon sent.
fn expect_ok(status: u16, body: &str) -> Result<()> {
    if status == 200 {
        return Ok(());
    }
    Err(ClientError::Status {
        status,
        message: error_message(body).unwrap_or_else(|| body.trim().to_string()),
    })
}

fn error_message(body: &str) -> Option<String> {
    if let Some(message) = parse::<FocusResponse>(body).and_then(|r| r.error) {
        return Some(message);
    }
    parse::<ErrorResponse>(body).map(|r| r.error)
}

fn parse<T: DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_str(body).ok()
}
