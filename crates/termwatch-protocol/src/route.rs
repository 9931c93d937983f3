//! Request routing for the query API.

use termwatch_core::WindowId;

use crate::http::Method;

/// A resolved API route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /api/health`
    Health,
    /// `GET /api/windows`
    ListWindows,
    /// `POST /api/windows/{pid}-{index}/focus`
    Focus(WindowId),
    /// Focus route whose id segment is not `<int>-<int>`
    InvalidWindowId(String),
    /// `OPTIONS` on any path
    Preflight,
    NotFound,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Self {
        if *method == Method::Options {
            return Self::Preflight;
        }

        let path = path.trim_end_matches('/');
        match (method, path) {
            (Method::Get, "/api/health") => Self::Health,
            (Method::Get, "/api/windows") => Self::ListWindows,
            (Method::Post, p) => match focus_target(p) {
                Some(raw) => match raw.parse::<WindowId>() {
                    Ok(id) => Self::Focus(id),
                    Err(_) => Self::InvalidWindowId(raw.to_string()),
                },
                None => Self::NotFound,
            },
            _ => Self::NotFound,
        }
    }
}

/// Extracts `{id}` from `/api/windows/{id}/focus`.
fn focus_target(path: &str) -> Option<&str> {
    let id = path.strip_prefix("/api/windows/")?.strip_suffix("/focus")?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_and_windows() {
        assert_eq!(Route::resolve(&Method::Get, "/api/health"), Route::Health);
        assert_eq!(Route::resolve(&Method::Get, "/api/windows"), Route::ListWindows);
        assert_eq!(Route::resolve(&Method::Get, "/api/windows/"), Route::ListWindows);
    }

    #[test]
    fn test_focus_route() {
        assert_eq!(
            Route::resolve(&Method::Post, "/api/windows/501-1/focus"),
            Route::Focus(WindowId::new(501, 1))
        );
    }

    #[test]
    fn test_focus_bad_id() {
        assert_eq!(
            Route::resolve(&Method::Post, "/api/windows/abc/focus"),
            Route::InvalidWindowId("abc".to_string())
        );
        assert_eq!(
            Route::resolve(&Method::Post, "/api/windows/1-2-3/focus"),
            Route::InvalidWindowId("1-2-3".to_string())
        );
    }

    #[test]
    fn test_wrong_method_is_not_found() {
        assert_eq!(Route::resolve(&Method::Post, "/api/health"), Route::NotFound);
        assert_eq!(
            Route::resolve(&Method::Get, "/api/windows/501-1/focus"),
            Route::NotFound
        );
        assert_eq!(
            Route::resolve(&Method::Other("DELETE".to_string()), "/api/windows"),
            Route::NotFound
        );
    }

    #[test]
    fn test_options_anywhere_is_preflight() {
        assert_eq!(Route::resolve(&Method::Options, "/anything"), Route::Preflight);
        assert_eq!(Route::resolve(&Method::Options, "*"), Route::Preflight);
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(Route::resolve(&Method::Get, "/"), Route::NotFound);
        assert_eq!(Route::resolve(&Method::Post, "/api/windows//focus"), Route::NotFound);
        assert_eq!(Route::resolve(&Method::Post, "/api/windows/1/2/focus"), Route::NotFound);
    }
}
