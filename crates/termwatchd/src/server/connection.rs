//! One request per connection.
//!
//! Each accepted socket gets its own task that:
//! - reads the request head (bounded in size and time)
//! - drains any declared body
//! - routes and answers with a JSON response
//! - closes the connection
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Connection errors are logged and result in a dropped connection

use std::sync::Arc;
use std::time::Duration;

use termwatch_core::WindowId;
use termwatch_protocol::{
    ErrorResponse, FocusResponse, HealthResponse, ProtocolError, RequestHead, Response, Route,
    StatusCode, WindowsResponse, MAX_HEAD_BYTES,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::focus::FocusError;
use crate::tracker::{FocusHandler, SnapshotProvider};

/// Idle limit for reading the request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Write timeout.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest body drained before responding.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Errors that end a connection without a response.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Read timed out")]
    Timeout,

    #[error("Request head exceeds {max} bytes")]
    HeadTooLarge { max: usize },

    #[error("Connection closed before any request")]
    Empty,
}

/// Shared dependencies of every connection.
#[derive(Clone)]
pub struct ConnectionContext {
    pub snapshots: Arc<dyn SnapshotProvider>,
    pub focus: Option<Arc<dyn FocusHandler>>,
}

/// Serves a single request on `stream`, then closes it.
pub async fn handle_connection<S>(mut stream: S, ctx: ConnectionContext, connection_number: u64)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(Ok(head))) => {
            debug!(
                connection = connection_number,
                method = %head.method,
                path = %head.path,
                "Request"
            );
            respond(&head, &ctx).await
        }
        Ok(Ok(Err(e))) => {
            debug!(connection = connection_number, error = %e, "Bad request");
            Response::json(StatusCode::BadRequest, &ErrorResponse::new("Bad request"))
        }
        Ok(Err(e)) => {
            debug!(connection = connection_number, error = %e, "Dropping connection");
            return;
        }
        Err(_) => {
            debug!(connection = connection_number, "Request read timed out");
            return;
        }
    };

    let write = async {
        stream.write_all(response.to_http().as_bytes()).await?;
        stream.flush().await?;
        stream.shutdown().await
    };
    match timeout(WRITE_TIMEOUT, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(connection = connection_number, error = %e, "Failed to write response"),
        Err(_) => warn!(connection = connection_number, "Response write timed out"),
    }
}

/// Reads the head and drains the body.
///
/// The outer error drops the connection; the inner one is answered
/// with 400.
async fn read_request<S>(stream: &mut S) -> Result<Result<RequestHead, ProtocolError>, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break Some(pos);
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(ConnectionError::HeadTooLarge { max: MAX_HEAD_BYTES });
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break None;
        }
        buf.extend_from_slice(chunk.get(..n).unwrap_or_default());
    };

    let (head_bytes, body_start) = match head_end {
        Some((head_len, body_start)) => (buf.get(..head_len).unwrap_or_default(), body_start),
        None if buf.iter().all(u8::is_ascii_whitespace) => return Err(ConnectionError::Empty),
        None => (buf.as_slice(), buf.len()),
    };
    if head_bytes.len() > MAX_HEAD_BYTES {
        return Err(ConnectionError::HeadTooLarge { max: MAX_HEAD_BYTES });
    }

    let head = match std::str::from_utf8(head_bytes) {
        Ok(text) => RequestHead::parse(text),
        Err(_) => Err(ProtocolError::MalformedRequestLine(
            String::from_utf8_lossy(head_bytes).into_owned(),
        )),
    };

    if let Ok(head) = &head {
        let already = buf.len().saturating_sub(body_start);
        let mut remaining = head.content_length().min(MAX_BODY_BYTES).saturating_sub(already);
        while remaining > 0 {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            remaining = remaining.saturating_sub(n);
        }
    }

    Ok(head)
}

/// Returns (head length, body start) once `\r\n\r\n` or `\n\n` is seen.
fn find_head_end(buf: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some((pos, pos + 4));
    }
    buf.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, pos + 2))
}

/// Builds the response for a parsed request.
pub async fn respond(head: &RequestHead, ctx: &ConnectionContext) -> Response {
    match Route::resolve(&head.method, &head.path) {
        Route::Health => Response::json(StatusCode::Ok, &HealthResponse::ok()),
        Route::ListWindows => {
            let snapshot = ctx.snapshots.snapshot();
            Response::json(StatusCode::Ok, &WindowsResponse::from(snapshot.as_ref()))
        }
        Route::Focus(id) => focus(id, ctx).await,
        Route::InvalidWindowId(raw) => {
            debug!(id = %raw, "Invalid window id");
            Response::json(StatusCode::BadRequest, &ErrorResponse::new("Invalid window id"))
        }
        Route::Preflight => Response::empty(StatusCode::NoContent),
        Route::NotFound => Response::json(StatusCode::NotFound, &ErrorResponse::not_found()),
    }
}

async fn focus(id: WindowId, ctx: &ConnectionContext) -> Response {
    let Some(handler) = ctx.focus.clone() else {
        return Response::json(StatusCode::ServiceUnavailable, &ErrorResponse::new("Focus unavailable"));
    };

    let result = tokio::task::spawn_blocking(move || handler.focus(id)).await;
    match result {
        Ok(Ok(())) => Response::json(StatusCode::Ok, &FocusResponse::success()),
        Ok(Err(e @ FocusError::TargetNotFound(_))) => {
            Response::json(StatusCode::NotFound, &FocusResponse::failure(e.to_string()))
        }
        Ok(Err(e)) => Response::json(StatusCode::InternalServerError, &FocusResponse::failure(e.to_string())),
        Err(e) => {
            warn!(window = %id, error = %e, "Focus task failed");
            Response::json(StatusCode::InternalServerError, &FocusResponse::failure("Focus task failed"))
        }
    }
}
