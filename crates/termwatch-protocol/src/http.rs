//! Minimal HTTP/1.1 request parsing and response rendering.
//!
//! Only what the query service needs: a request line, headers, an optional
//! `Content-Length` body (read and discarded), and JSON responses that
//! always close the connection.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Maximum size of a request head (request line + headers).
pub const MAX_HEAD_BYTES: usize = 8 * 1024;

/// Headers sent on every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while reading a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("Malformed header: {0:?}")]
    MalformedHeader(String),

    #[error("Request head exceeds {max} bytes")]
    HeadTooLarge { max: usize },

    #[error("Connection closed before request was complete")]
    Incomplete,
}

// ============================================================================
// Request
// ============================================================================

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Options,
    Other(String),
}

impl Method {
    fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Options => f.write_str("OPTIONS"),
            Self::Other(m) => f.write_str(m),
        }
    }
}

/// Request line and headers of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    /// Request target with any query string removed.
    pub path: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Parses a request line such as `GET /api/health HTTP/1.1`.
    pub fn parse_request_line(line: &str) -> Result<(Method, String), ProtocolError> {
        let malformed = || ProtocolError::MalformedRequestLine(line.to_string());
        let mut parts = line.split_whitespace();

        let method = parts.next().ok_or_else(malformed)?;
        let target = parts.next().ok_or_else(malformed)?;
        let version = parts.next().ok_or_else(malformed)?;

        if parts.next().is_some() || !version.starts_with("HTTP/1.") {
            return Err(malformed());
        }

        let path = target.split('?').next().unwrap_or(target).to_string();
        Ok((Method::parse(method), path))
    }

    /// Parses one `Name: value` header line.
    pub fn parse_header(line: &str) -> Result<(String, String), ProtocolError> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ProtocolError::MalformedHeader(line.to_string()));
        }
        Ok((name.to_ascii_lowercase(), value.trim().to_string()))
    }

    /// Parses a complete head: request line, headers, terminated by a blank
    /// line (or end of input).
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut lines = raw.split("\r\n").flat_map(|l| l.split('\n'));
        let request_line = lines.next().ok_or(ProtocolError::Incomplete)?;
        let (method, path) = Self::parse_request_line(request_line.trim_end_matches('\r'))?;

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }
            headers.push(Self::parse_header(line)?);
        }

        Ok(Self {
            method,
            path,
            headers,
        })
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Declared body length, zero if absent or unparseable.
    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

// ============================================================================
// Response
// ============================================================================

/// Status codes the query service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NoContent,
    BadRequest,
    NotFound,
    InternalServerError,
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// A complete JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

impl Response {
    /// Serializes `body` as the JSON payload.
    ///
    /// Serialization of the view types cannot fail in practice; if it
    /// does, the response degrades to a 500 with a fixed body.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self { status, body },
            Err(_) => Self {
                status: StatusCode::InternalServerError,
                body: r#"{"error":"Serialization failed"}"#.to_string(),
            },
        }
    }

    /// A response with no body (used for CORS preflight).
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    /// Renders status line, headers and body.
    pub fn to_http(&self) -> String {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.reason()
        );
        out.push_str("Content-Type: application/json\r\n");
        out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        out.push_str("Connection: close\r\n");
        for (name, value) in CORS_HEADERS {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out
    }

    /// Parses a rendered response back into status code and body.
    ///
    /// Used by the client; tolerant of header order and casing.
    pub fn parse_raw(raw: &str) -> Result<(u16, String), ProtocolError> {
        let (head, body) = raw
            .split_once("\r\n\r\n")
            .ok_or(ProtocolError::Incomplete)?;
        let status_line = head.lines().next().ok_or(ProtocolError::Incomplete)?;
        let code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| ProtocolError::MalformedRequestLine(status_line.to_string()))?;
        Ok((code, body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let (method, path) = RequestHead::parse_request_line("GET /api/health HTTP/1.1").unwrap();
        assert_eq!(method, Method::Get);
        assert_eq!(path, "/api/health");
    }

    #[test]
    fn test_parse_request_line_strips_query() {
        let (_, path) = RequestHead::parse_request_line("GET /api/windows?x=1 HTTP/1.1").unwrap();
        assert_eq!(path, "/api/windows");
    }

    #[test]
    fn test_parse_request_line_rejects_garbage() {
        for bad in ["", "GET", "GET /", "GET / FTP/1.0", "GET / HTTP/1.1 extra"] {
            assert!(
                RequestHead::parse_request_line(bad).is_err(),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_parse_head_with_headers() {
        let raw = "POST /api/windows/1-1/focus HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: 2\r\n\r\n";
        let head = RequestHead::parse(raw).unwrap();
        assert_eq!(head.method, Method::Post);
        assert_eq!(head.header("HOST"), Some("127.0.0.1"));
        assert_eq!(head.content_length(), 2);
    }

    #[test]
    fn test_parse_head_bare_newlines() {
        let head = RequestHead::parse("GET /api/health HTTP/1.0\nAccept: */*\n\n").unwrap();
        assert_eq!(head.path, "/api/health");
        assert_eq!(head.header("accept"), Some("*/*"));
    }

    #[test]
    fn test_parse_head_malformed_header() {
        let err = RequestHead::parse("GET / HTTP/1.1\r\nnocolon\r\n\r\n").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedHeader(_)));
    }

    #[test]
    fn test_unknown_method_preserved() {
        let (method, _) = RequestHead::parse_request_line("DELETE /x HTTP/1.1").unwrap();
        assert_eq!(method, Method::Other("DELETE".to_string()));
        assert_eq!(method.to_string(), "DELETE");
    }

    #[test]
    fn test_response_headers() {
        let rendered = Response::json(StatusCode::Ok, &serde_json::json!({"ok": true})).to_http();
        assert!(rendered.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(rendered.contains("Content-Type: application/json\r\n"));
        assert!(rendered.contains("Connection: close\r\n"));
        assert!(rendered.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(rendered.contains("Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n"));
        assert!(rendered.contains("Content-Length: 11\r\n"));
        assert!(rendered.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn test_empty_response() {
        let rendered = Response::empty(StatusCode::NoContent).to_http();
        assert!(rendered.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(rendered.contains("Content-Length: 0\r\n"));
        assert!(rendered.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_parse_raw_response() {
        let rendered = Response::json(StatusCode::NotFound, &serde_json::json!({"error": "Not found"}))
            .to_http();
        let (code, body) = Response::parse_raw(&rendered).unwrap();
        assert_eq!(code, 404);
        assert_eq!(body, r#"{"error":"Not found"}"#);
    }
}
