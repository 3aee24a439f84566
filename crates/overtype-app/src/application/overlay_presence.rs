//! Overlay presence: Hidden / Visible / Minimized phase machine.
//!
//! The overlay window itself is created by whatever UI shell embeds this
//! crate; this use case only decides when it should be on screen and with
//! which activation style.  The phase is tracked even before a window is
//! attached (headless operation), and the no-activate style is re-applied
//! on *every* transition into [`OverlayPhase::Visible`] so a style lost to
//! window recreation or a toolkit reset cannot let the overlay start
//! stealing focus.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::application::guard_focus::{WindowControl, WindowId};

/// Where the overlay currently stands with respect to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Not on screen; the hotkey engine is typically disabled.
    Hidden,
    /// On screen, click-through-activation-proof, possibly topmost.
    Visible,
    /// Deliberately tucked away while the engine keeps running.
    Minimized,
}

impl fmt::Display for OverlayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverlayPhase::Hidden => "hidden",
            OverlayPhase::Visible => "visible",
            OverlayPhase::Minimized => "minimized",
        };
        write!(f, "{label}")
    }
}

/// Drives the overlay window through its phases.  All methods take `&self`
/// so the presence handle can be shared between the controller loop and
/// the UI bridge.
pub struct OverlayPresence {
    control: Arc<dyn WindowControl>,
    window: Mutex<Option<WindowId>>,
    phase: Mutex<OverlayPhase>,
    topmost: AtomicBool,
}

impl OverlayPresence {
    pub fn new(control: Arc<dyn WindowControl>, topmost: bool) -> Self {
        Self {
            control,
            window: Mutex::new(None),
            phase: Mutex::new(OverlayPhase::Hidden),
            topmost: AtomicBool::new(topmost),
        }
    }

    /// Adopts a freshly created overlay window: applies the no-activate
    /// style immediately and brings the window in line with the current
    /// phase (the phase machine may have been running headless until now).
    pub fn attach_window(&self, id: WindowId) {
        *self.window.lock().expect("lock poisoned") = Some(id);
        self.control.apply_no_activate(id);
        match self.phase() {
            OverlayPhase::Visible => {
                self.control.show_no_activate(id, self.topmost.load(Ordering::Relaxed));
            }
            OverlayPhase::Hidden | OverlayPhase::Minimized => {
                self.control.hide_window(id);
            }
        }
    }

    /// The attached overlay window, if one has been adopted.
    pub fn window(&self) -> Option<WindowId> {
        *self.window.lock().expect("lock poisoned")
    }

    pub fn phase(&self) -> OverlayPhase {
        *self.phase.lock().expect("lock poisoned")
    }

    /// Puts the overlay on screen without ever activating it.  The
    /// no-activate style is reasserted on each call, not just the first.
    pub fn show(&self) {
        if let Some(id) = self.window() {
            self.control.apply_no_activate(id);
            self.control.show_no_activate(id, self.topmost.load(Ordering::Relaxed));
        }
        self.set_phase(OverlayPhase::Visible);
    }

    /// Takes the overlay off screen entirely.
    pub fn hide(&self) {
        if let Some(id) = self.window() {
            self.control.hide_window(id);
        }
        self.set_phase(OverlayPhase::Hidden);
    }

    /// Tucks the overlay away while the engine stays active.
    pub fn minimize(&self) {
        if let Some(id) = self.window() {
            self.control.hide_window(id);
        }
        self.set_phase(OverlayPhase::Minimized);
    }

    /// Brings a minimized overlay back.
    pub fn restore(&self) {
        self.show();
    }

    pub fn set_topmost(&self, topmost: bool) {
        self.topmost.store(topmost, Ordering::Relaxed);
    }

    fn set_phase(&self, next: OverlayPhase) {
        let mut phase = self.phase.lock().expect("lock poisoned");
        if *phase != next {
            debug!(from = %*phase, to = %next, "overlay phase changed");
        }
        *phase = next;
    }
}
