//! Fallback listing from the compositor's flat window list.

use std::collections::HashMap;

use termwatch_core::WindowRecord;
use tracing::debug;

use super::{EnumerateError, WindowEnumerator};

/// One entry of the compositor's front-to-back window list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatWindow {
    pub owner_pid: u32,
    pub owner_name: String,
    pub layer: i32,
    pub title: String,
}

/// Keeps layer-0 windows owned by `app_name` and numbers them per owner
/// pid in first-seen order.
pub fn index_flat_windows(flat: &[FlatWindow], app_name: &str) -> Vec<WindowRecord> {
    let mut next_index: HashMap<u32, u32> = HashMap::new();
    flat.iter()
        .filter(|w| w.layer == 0 && w.owner_name == app_name)
        .map(|w| {
            let index = next_index.entry(w.owner_pid).or_insert(0);
            *index += 1;
            WindowRecord::new(w.owner_pid, *index, w.title.clone())
        })
        .collect()
}

/// Enumerates through CoreGraphics' window list.
#[derive(Debug, Clone)]
pub struct CompositorEnumerator {
    app_name: String,
}

impl CompositorEnumerator {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    pub fn is_available() -> bool {
        cfg!(target_os = "macos")
    }
}

impl WindowEnumerator for CompositorEnumerator {
    fn name(&self) -> &'static str {
        "compositor"
    }

    fn enumerate(&self) -> Result<Vec<WindowRecord>, EnumerateError> {
        let flat = platform::copy_window_list()?;
        let windows = index_flat_windows(&flat, &self.app_name);
        debug!(app = %self.app_name, flat = flat.len(), count = windows.len(), "Enumerated compositor windows");
        Ok(windows)
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::c_void;

    use core_foundation::array::CFArray;
    use core_foundation::base::TCFType;
    use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
    use core_foundation::number::{CFNumber, CFNumberRef};
    use core_foundation::string::{CFString, CFStringRef};
    use core_graphics::window::{
        kCGNullWindowID, kCGWindowListExcludeDesktopElements, kCGWindowListOptionOnScreenOnly,
        CGWindowListCopyWindowInfo,
    };

    use super::FlatWindow;
    use crate::windows::EnumerateError;

    pub fn copy_window_list() -> Result<Vec<FlatWindow>, EnumerateError> {
        // SAFETY: CGWindowListCopyWindowInfo returns an owned CFArrayRef or
        // null; ownership passes to the wrapper under the create rule.
        let list = unsafe {
            let raw = CGWindowListCopyWindowInfo(
                kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements,
                kCGNullWindowID,
            );
            if raw.is_null() {
                return Err(EnumerateError::NoWindowList);
            }
            CFArray::<*const c_void>::wrap_under_create_rule(raw)
        };

        let layer_key = CFString::from_static_string("kCGWindowLayer");
        let pid_key = CFString::from_static_string("kCGWindowOwnerPID");
        let owner_key = CFString::from_static_string("kCGWindowOwnerName");
        let name_key = CFString::from_static_string("kCGWindowName");

        let mut windows = Vec::new();
        for item in list.iter() {
            let raw: *const c_void = *item;
            if raw.is_null() {
                continue;
            }
            // SAFETY: every element of the window list is a CFDictionary.
            let dict: CFDictionary<*const c_void, *const c_void> =
                unsafe { CFDictionary::wrap_under_get_rule(raw as CFDictionaryRef) };

            let number = |key: &CFString| -> Option<i64> {
                let value = dict.find(key.as_CFTypeRef() as *const c_void)?;
                // SAFETY: layer and owner pid are CFNumbers.
                unsafe { CFNumber::wrap_under_get_rule(*value as CFNumberRef) }.to_i64()
            };
            let string = |key: &CFString| -> Option<String> {
                let value = dict.find(key.as_CFTypeRef() as *const c_void)?;
                // SAFETY: owner and window names are CFStrings.
                let s = unsafe { CFString::wrap_under_get_rule(*value as CFStringRef) };
                Some(s.to_string())
            };

            let (Some(layer), Some(pid), Some(owner)) =
                (number(&layer_key), number(&pid_key), string(&owner_key))
            else {
                continue;
            };
            let (Ok(layer), Ok(owner_pid)) = (i32::try_from(layer), u32::try_from(pid)) else {
                continue;
            };

            windows.push(FlatWindow {
                owner_pid,
                owner_name: owner,
                layer,
                title: string(&name_key).unwrap_or_default(),
            });
        }

        Ok(windows)
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use super::FlatWindow;
    use crate::windows::EnumerateError;

    pub fn copy_window_list() -> Result<Vec<FlatWindow>, EnumerateError> {
        Err(EnumerateError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pid: u32, owner: &str, layer: i32, title: &str) -> FlatWindow {
        FlatWindow {
            owner_pid: pid,
            owner_name: owner.to_string(),
            layer,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_index_per_owner_in_first_seen_order() {
        let list = vec![
            flat(600, "Ghostty", 0, "b1"),
            flat(500, "Ghostty", 0, "a1"),
            flat(600, "Ghostty", 0, "b2"),
            flat(700, "Finder", 0, "f"),
            flat(500, "Ghostty", 25, "menubar"),
            flat(500, "Ghostty", 0, "a2"),
        ];
        let windows = index_flat_windows(&list, "Ghostty");
        let got: Vec<(String, String)> = windows
            .iter()
            .map(|w| (w.id.to_string(), w.title.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("600-1".to_string(), "b1".to_string()),
                ("500-1".to_string(), "a1".to_string()),
                ("600-2".to_string(), "b2".to_string()),
                ("500-2".to_string(), "a2".to_string()),
            ]
        );
    }

    #[test]
    fn test_other_apps_ignored() {
        let list = vec![flat(1, "Terminal", 0, "x")];
        assert!(index_flat_windows(&list, "Ghostty").is_empty());
    }
}
