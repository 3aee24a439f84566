//! Text injection infrastructure for the OverType application.
//!
//! On Windows, characters are injected as `KEYEVENTF_UNICODE` keyboard
//! events via a single `SendInput` call, so the text lands independently
//! of keyboard layout and the OS marks every event as injected — which is
//! exactly what the keyboard hook's recursion guard keys on.
//!
//! The [`TextInjector`] trait itself lives in the application layer
//! (`application::dispatch_actions`); this module provides the platform
//! implementations.

use std::sync::Arc;

use crate::application::dispatch_actions::{InjectionError, TextInjector};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Returns the text injector for the current platform.
pub fn platform_injector() -> Result<Arc<dyn TextInjector>, InjectionError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsTextInjector::new()))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(InjectionError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
