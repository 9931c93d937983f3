//! termwatch Protocol - Wire protocol for the local query service
//!
//! The query service speaks a small subset of HTTP/1.1 over loopback TCP:
//! one request per connection, JSON bodies, permissive CORS. This crate
//! holds the request parsing, routing, response rendering, and the JSON
//! views shared by the daemon and the client.

pub mod http;
pub mod message;
pub mod route;
pub mod version;

pub use http::{Method, ProtocolError, RequestHead, Response, StatusCode, MAX_HEAD_BYTES};
pub use message::{ErrorResponse, FocusResponse, HealthResponse, WindowView, WindowsResponse};
pub use route::Route;
pub use version::ApiVersion;
