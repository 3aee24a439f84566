//! Keyboard hook infrastructure for the OverType application.
//!
//! On Windows, this installs a low-level keyboard hook (WH_KEYBOARD_LL) on
//! a dedicated Win32 message loop thread.  The hook callback runs the
//! matching handler inline — it has to, because swallowing a keystroke is
//! only possible from inside the callback — and everything slower than a
//! table lookup is deferred to the controller thread via a channel.
//!
//! # Windows-Specific Implementation
//!
//! The hook callback must complete within ~300ms or Windows will silently
//! remove the hook.  The handler therefore never blocks: shared state is
//! taken with `try_lock`, and contention means the keystroke passes
//! through unmodified.
//!
//! # Testability
//!
//! The `KeyEventSource` trait allows unit tests to push synthetic events
//! through the full pipeline without OS hooks.

use std::time::Duration;

use overtype_core::{KeyEvent, ModifierSet, Verdict};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Callback invoked for every key event the hook sees.  The returned
/// verdict decides whether the OS delivers the keystroke onward.
pub type KeyEventHandler = Box<dyn FnMut(KeyEvent) -> Verdict + Send>;

/// Error type for keyboard hook operations.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("keyboard hook installation failed: {0}")]
    InstallFailed(String),
    #[error("keyboard hook is already running")]
    AlreadyRunning,
    #[error("keyboard hook thread did not report ready within {0:?}")]
    StartTimeout(Duration),
    #[error("global keyboard capture is not supported on {0}")]
    UnsupportedPlatform(String),
}

/// Trait abstracting the global key event stream.
///
/// The production implementation installs a Windows hook; tests use
/// [`mock::MockKeyEventSource`].
pub trait KeyEventSource: Send + Sync {
    /// Installs the hook and starts delivering events to `handler`.
    /// Returns once the hook is confirmed live, or with an error if the
    /// platform refused it — callers treat that as fatal at startup.
    fn start(&self, handler: KeyEventHandler) -> Result<(), HookError>;

    /// Tears the hook down and releases all OS resources.
    fn stop(&self);
}

/// Tracks which modifier keys are physically held, from the raw key
/// stream itself.  `WH_KEYBOARD_LL` reports one key per callback and no
/// modifier state, so the hook thread keeps its own.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    left_ctrl: bool,
    right_ctrl: bool,
    left_alt: bool,
    right_alt: bool,
    left_shift: bool,
    right_shift: bool,
    left_win: bool,
    right_win: bool,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transition of a modifier key; other keys are ignored.
    pub fn update(&mut self, vk_code: u8, is_down: bool) {
        match vk_code {
            0xA2 => self.left_ctrl = is_down,   // VK_LCONTROL
            0xA3 => self.right_ctrl = is_down,  // VK_RCONTROL
            0xA4 => self.left_alt = is_down,    // VK_LMENU
            0xA5 => self.right_alt = is_down,   // VK_RMENU
            0xA0 => self.left_shift = is_down,  // VK_LSHIFT
            0xA1 => self.right_shift = is_down, // VK_RSHIFT
            0x5B => self.left_win = is_down,    // VK_LWIN
            0x5C => self.right_win = is_down,   // VK_RWIN
            _ => {}
        }
    }

    /// The currently held modifiers, left and right sides folded together.
    pub fn snapshot(&self) -> ModifierSet {
        let mut set = ModifierSet::EMPTY;
        if self.left_ctrl || self.right_ctrl {
            set = set.with(ModifierSet::CTRL);
        }
        if self.left_alt || self.right_alt {
            set = set.with(ModifierSet::ALT);
        }
        if self.left_shift || self.right_shift {
            set = set.with(ModifierSet::SHIFT);
        }
        if self.left_win || self.right_win {
            set = set.with(ModifierSet::WIN);
        }
        set
    }

    /// Clears all held state, e.g. after the hook is reinstalled.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Returns the keyboard hook for the current platform.
pub fn platform_source() -> Result<std::sync::Arc<dyn KeyEventSource>, HookError> {
    #[cfg(target_os = "windows")]
    {
        Ok(std::sync::Arc::new(windows::WindowsKeyEventSource::new()))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(HookError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
