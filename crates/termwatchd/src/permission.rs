//! Accessibility permission check.
//!
//! Window titles and focus both go through the Accessibility API, which
//! macOS gates behind a per-binary grant. Without it every cycle would fail,
//! so the tracker checks first and skips the cycle instead.

/// Reports whether the process may inspect other applications' windows.
pub trait AccessCheck: Send + Sync {
    fn is_granted(&self) -> bool;
}

/// Asks the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccessCheck;

#[cfg(target_os = "macos")]
mod ffi {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        pub fn AXIsProcessTrusted() -> bool;
    }
}

impl AccessCheck for SystemAccessCheck {
    #[cfg(target_os = "macos")]
    fn is_granted(&self) -> bool {
        // SAFETY: takes no arguments and only reads process state.
        unsafe { ffi::AXIsProcessTrusted() }
    }

    #[cfg(not(target_os = "macos"))]
    fn is_granted(&self) -> bool {
        true
    }
}

/// Fixed answer, for hosts or tests that bypass the OS check.
#[derive(Debug, Clone, Copy)]
pub struct StaticAccess(pub bool);

impl AccessCheck for StaticAccess {
    fn is_granted(&self) -> bool {
        self.0
    }
}
