//! Window control infrastructure for the OverType application.
//!
//! Implements the [`WindowControl`] seam defined by the application layer:
//! foreground queries, focus restoration, and the no-activate treatment
//! that keeps the overlay from ever stealing keyboard focus.  On Windows
//! this is `WS_EX_NOACTIVATE` plus a `WM_MOUSEACTIVATE` subclass; other
//! platforms have no implementation and window control is reported as
//! unsupported.

use std::sync::Arc;

use crate::application::guard_focus::WindowControl;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Error type for window control setup.
#[derive(Debug, thiserror::Error)]
pub enum WindowControlError {
    #[error("window control is not supported on {0}")]
    UnsupportedPlatform(String),
}

/// Returns the window control backend for the current platform.
pub fn platform_control() -> Result<Arc<dyn WindowControl>, WindowControlError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsWindowControl::new()))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(WindowControlError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
