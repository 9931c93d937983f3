//! Window enumeration for the tracked terminal application.
//!
//! Two backends sit behind [`WindowEnumerator`]:
//!
//! - [`SystemEventsEnumerator`] lists windows per process through System
//!   Events, with subroles, so dialogs can be dropped and indices line up
//!   with what the focus operation addresses.
//! - [`CompositorEnumerator`] reads the compositor's flat window list. It
//!   knows nothing about subroles and is only a fallback.
//!
//! [`CompositeEnumerator`] consults the fallback only when the primary
//! fails or finds nothing. Results are never merged.

mod compositor;
mod system_events;

pub use compositor::{index_flat_windows, CompositorEnumerator, FlatWindow};
pub use system_events::{parse_window_listing, SystemEventsEnumerator, EXCLUDED_SUBROLES};

use termwatch_core::WindowRecord;
use thiserror::Error;
use tracing::{debug, warn};

use crate::osascript::ScriptError;

/// Errors that can occur while enumerating windows.
#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("window enumeration is not supported on this platform")]
    Unsupported,

    #[error("accessibility permission not granted")]
    PermissionDenied,

    #[error("window listing failed: {0}")]
    Script(#[source] ScriptError),

    #[error("compositor returned no window list")]
    NoWindowList,
}

impl From<ScriptError> for EnumerateError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Unsupported => Self::Unsupported,
            e if e.is_permission_denied() => Self::PermissionDenied,
            e => Self::Script(e),
        }
    }
}

/// Lists the target application's windows, unenriched.
pub trait WindowEnumerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn enumerate(&self) -> Result<Vec<WindowRecord>, EnumerateError>;
}

/// Primary backend with an optional fallback.
pub struct CompositeEnumerator {
    primary: Box<dyn WindowEnumerator>,
    fallback: Option<Box<dyn WindowEnumerator>>,
}

impl CompositeEnumerator {
    pub fn new(primary: Box<dyn WindowEnumerator>, fallback: Option<Box<dyn WindowEnumerator>>) -> Self {
        Self { primary, fallback }
    }

    /// Picks the backends available on this host.
    ///
    /// System Events needs `osascript`; the compositor fallback needs
    /// CoreGraphics. Both exist only on macOS, elsewhere enumeration
    /// reports `Unsupported` every cycle.
    pub fn detect(app_name: &str) -> Self {
        let primary = Box::new(SystemEventsEnumerator::new(app_name));
        let fallback: Option<Box<dyn WindowEnumerator>> = if CompositorEnumerator::is_available() {
            Some(Box::new(CompositorEnumerator::new(app_name)))
        } else {
            None
        };
        debug!(app = app_name, fallback = fallback.is_some(), "Window enumerator selected");
        Self::new(primary, fallback)
    }
}

impl WindowEnumerator for CompositeEnumerator {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn enumerate(&self) -> Result<Vec<WindowRecord>, EnumerateError> {
        let primary = self.primary.enumerate();
        let fallback = match &self.fallback {
            Some(fallback) => fallback,
            None => return primary,
        };

        match primary {
            Ok(windows) if !windows.is_empty() => Ok(windows),
            Ok(_) => {
                debug!(backend = fallback.name(), "Primary found no windows, trying fallback");
                fallback.enumerate()
            }
            Err(EnumerateError::PermissionDenied) => Err(EnumerateError::PermissionDenied),
            Err(e) => {
                warn!(
                    backend = self.primary.name(),
                    error = %e,
                    "Primary window enumeration failed, trying fallback"
                );
                fallback.enumerate()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        result: fn() -> Result<Vec<WindowRecord>, EnumerateError>,
        calls: Arc<AtomicUsize>,
    }

    impl WindowEnumerator for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn enumerate(&self) -> Result<Vec<WindowRecord>, EnumerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn composite(
        primary: fn() -> Result<Vec<WindowRecord>, EnumerateError>,
        fallback: fn() -> Result<Vec<WindowRecord>, EnumerateError>,
    ) -> (CompositeEnumerator, Arc<AtomicUsize>) {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let enumerator = CompositeEnumerator::new(
            Box::new(Fixed {
                result: primary,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            Some(Box::new(Fixed {
                result: fallback,
                calls: Arc::clone(&fallback_calls),
            })),
        );
        (enumerator, fallback_calls)
    }

    fn one_window() -> Result<Vec<WindowRecord>, EnumerateError> {
        Ok(vec![WindowRecord::new(500, 1, "primary")])
    }

    fn other_window() -> Result<Vec<WindowRecord>, EnumerateError> {
        Ok(vec![WindowRecord::new(600, 1, "fallback")])
    }

    fn nothing() -> Result<Vec<WindowRecord>, EnumerateError> {
        Ok(Vec::new())
    }

    fn broken() -> Result<Vec<WindowRecord>, EnumerateError> {
        Err(EnumerateError::NoWindowList)
    }

    #[test]
    fn test_primary_wins_without_fallback_call() {
        let (enumerator, fallback_calls) = composite(one_window, other_window);
        let windows = enumerator.enumerate().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].title, "primary");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_primary_uses_fallback() {
        let (enumerator, fallback_calls) = composite(nothing, other_window);
        let windows = enumerator.enumerate().unwrap();
        assert_eq!(windows[0].title, "fallback");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_primary_uses_fallback() {
        let (enumerator, _) = composite(broken, other_window);
        assert_eq!(enumerator.enumerate().unwrap()[0].title, "fallback");
    }

    #[test]
    fn test_no_fallback_passes_through() {
        let enumerator = CompositeEnumerator::new(
            Box::new(Fixed {
                result: broken,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            None,
        );
        assert!(matches!(enumerator.enumerate(), Err(EnumerateError::NoWindowList)));
    }

    #[test]
    fn test_script_error_mapping() {
        assert!(matches!(
            EnumerateError::from(ScriptError::Unsupported),
            EnumerateError::Unsupported
        ));
        let denied = ScriptError::Failed {
            code: 1,
            stderr: "not allowed assistive access (-1719)".to_string(),
        };
        assert!(matches!(EnumerateError::from(denied), EnumerateError::PermissionDenied));
    }
}
