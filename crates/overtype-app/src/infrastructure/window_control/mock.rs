//! Scriptable window-system double for unit and integration testing.
//!
//! Models a tiny desktop: windows exist, are visible or minimized, and
//! one of them may be foreground.  Focus requests succeed (and update the
//! fake foreground) unless the refusal switch is set, letting tests walk
//! the focus-guardian paths without a real window manager.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::guard_focus::{WindowControl, WindowId};

/// A mock implementation of [`WindowControl`] backed by in-memory sets.
pub struct FakeWindowControl {
    foreground: Mutex<Option<WindowId>>,
    alive: Mutex<HashSet<WindowId>>,
    visible: Mutex<HashSet<WindowId>>,
    minimized: Mutex<HashSet<WindowId>>,
    refuse_focus: AtomicBool,
    focus_calls: Mutex<Vec<WindowId>>,
    styled: Mutex<Vec<WindowId>>,
    shown: Mutex<Vec<(WindowId, bool)>>,
    hidden: Mutex<Vec<WindowId>>,
}

impl FakeWindowControl {
    /// Creates an empty fake desktop.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            foreground: Mutex::new(None),
            alive: Mutex::new(HashSet::new()),
            visible: Mutex::new(HashSet::new()),
            minimized: Mutex::new(HashSet::new()),
            refuse_focus: AtomicBool::new(false),
            focus_calls: Mutex::new(Vec::new()),
            styled: Mutex::new(Vec::new()),
            shown: Mutex::new(Vec::new()),
            hidden: Mutex::new(Vec::new()),
        })
    }

    /// Adds a live, visible window to the fake desktop.
    pub fn add_window(&self, id: WindowId) {
        self.alive.lock().expect("lock poisoned").insert(id);
        self.visible.lock().expect("lock poisoned").insert(id);
    }

    pub fn set_foreground(&self, id: Option<WindowId>) {
        *self.foreground.lock().expect("lock poisoned") = id;
    }

    pub fn set_minimized(&self, id: WindowId) {
        self.minimized.lock().expect("lock poisoned").insert(id);
    }

    /// Removes a window entirely, as if its process exited.
    pub fn remove_window(&self, id: WindowId) {
        self.alive.lock().expect("lock poisoned").remove(&id);
        self.visible.lock().expect("lock poisoned").remove(&id);
        let mut foreground = self.foreground.lock().expect("lock poisoned");
        if *foreground == Some(id) {
            *foreground = None;
        }
    }

    /// When set, focus requests are refused like the Windows
    /// foreground-lock would.
    pub fn set_refuse_focus(&self, refuse: bool) {
        self.refuse_focus.store(refuse, Ordering::SeqCst);
    }

    /// Every focus request received, in order.
    pub fn focus_calls(&self) -> Vec<WindowId> {
        self.focus_calls.lock().expect("lock poisoned").clone()
    }

    /// Windows that received the no-activate treatment (with repeats).
    pub fn styled(&self) -> Vec<WindowId> {
        self.styled.lock().expect("lock poisoned").clone()
    }

    /// `(window, topmost)` pairs from show calls, in order.
    pub fn shown(&self) -> Vec<(WindowId, bool)> {
        self.shown.lock().expect("lock poisoned").clone()
    }

    /// Windows hidden, in order (with repeats).
    pub fn hidden(&self) -> Vec<WindowId> {
        self.hidden.lock().expect("lock poisoned").clone()
    }
}

impl WindowControl for FakeWindowControl {
    fn foreground_window(&self) -> Option<WindowId> {
        *self.foreground.lock().expect("lock poisoned")
    }

    fn is_window_alive(&self, id: WindowId) -> bool {
        self.alive.lock().expect("lock poisoned").contains(&id)
    }

    fn is_window_visible(&self, id: WindowId) -> bool {
        self.visible.lock().expect("lock poisoned").contains(&id)
    }

    fn is_window_minimized(&self, id: WindowId) -> bool {
        self.minimized.lock().expect("lock poisoned").contains(&id)
    }

    fn focus_window(&self, id: WindowId) -> bool {
        self.focus_calls.lock().expect("lock poisoned").push(id);
        if self.refuse_focus.load(Ordering::SeqCst) {
            return false;
        }
        self.set_foreground(Some(id));
        true
    }

    fn apply_no_activate(&self, id: WindowId) -> bool {
        self.styled.lock().expect("lock poisoned").push(id);
        true
    }

    fn show_no_activate(&self, id: WindowId, topmost: bool) -> bool {
        self.shown.lock().expect("lock poisoned").push((id, topmost));
        self.visible.lock().expect("lock poisoned").insert(id);
        self.minimized.lock().expect("lock poisoned").remove(&id);
        true
    }

    fn hide_window(&self, id: WindowId) -> bool {
        self.hidden.lock().expect("lock poisoned").push(id);
        self.visible.lock().expect("lock poisoned").remove(&id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: WindowId = WindowId(0x1000);

    #[test]
    fn test_fake_desktop_tracks_window_lifecycle() {
        // Arrange
        let control = FakeWindowControl::new();

        // Act
        control.add_window(WINDOW);
        control.set_foreground(Some(WINDOW));

        // Assert
        assert!(control.is_window_alive(WINDOW));
        assert!(control.is_window_visible(WINDOW));
        assert_eq!(control.foreground_window(), Some(WINDOW));

        // Removing it clears foreground too.
        control.remove_window(WINDOW);
        assert!(!control.is_window_alive(WINDOW));
        assert_eq!(control.foreground_window(), None);
    }

    #[test]
    fn test_focus_refusal_leaves_foreground_untouched() {
        // Arrange
        let control = FakeWindowControl::new();
        control.add_window(WINDOW);
        control.set_refuse_focus(true);

        // Act
        let granted = control.focus_window(WINDOW);

        // Assert
        assert!(!granted);
        assert_eq!(control.foreground_window(), None);
        assert_eq!(control.focus_calls(), vec![WINDOW]);
    }

    #[test]
    fn test_show_and_hide_update_visibility() {
        let control = FakeWindowControl::new();
        control.add_window(WINDOW);

        control.hide_window(WINDOW);
        assert!(!control.is_window_visible(WINDOW));

        control.show_no_activate(WINDOW, true);
        assert!(control.is_window_visible(WINDOW));
        assert_eq!(control.shown(), vec![(WINDOW, true)]);
    }
}
