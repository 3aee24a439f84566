//! Focus guardian: tracks the injection target and vetoes blind injection.
//!
//! Injected text lands in whatever window has keyboard focus at the moment
//! the OS processes the synthetic events.  This use case makes sure that
//! window is the one the user expects: it remembers the last foreground
//! window that was not one of our own, and immediately before an injection
//! it re-validates that target and confirms it is actually foreground —
//! restoring focus once, best-effort, if something (usually our overlay)
//! stole it.  When confirmation fails the injection is skipped entirely;
//! injecting into an unknown window is worse than injecting nothing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

/// Opaque OS window handle, carried as a plain integer so it can cross
/// threads and live in shared state without platform types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

/// Seam to the OS window system, implemented by the infrastructure layer.
///
/// All methods are best-effort: they return booleans rather than errors
/// because the caller's only recourse is to skip the current action.
pub trait WindowControl: Send + Sync {
    /// The window that currently has foreground status, if any.
    fn foreground_window(&self) -> Option<WindowId>;

    /// True if the handle still refers to a live window.
    fn is_window_alive(&self, id: WindowId) -> bool;

    /// True if the window is visible on screen.
    fn is_window_visible(&self, id: WindowId) -> bool;

    /// True if the window is minimized (iconic).
    fn is_window_minimized(&self, id: WindowId) -> bool;

    /// Makes `id` the foreground window and reports whether the OS
    /// *verifiably* agreed.  Implementations may escalate (e.g. attach to
    /// the foreground thread's input queue) but must re-check afterwards.
    fn focus_window(&self, id: WindowId) -> bool;

    /// Applies the "never activate on click" style and message handling to
    /// one of our own windows.
    fn apply_no_activate(&self, id: WindowId) -> bool;

    /// Shows one of our own windows without activating it, optionally
    /// keeping it above other windows.
    fn show_no_activate(&self, id: WindowId, topmost: bool) -> bool;

    /// Hides one of our own windows.
    fn hide_window(&self, id: WindowId) -> bool;
}

/// Tracks the last non-overlay foreground window and confirms injection
/// targets.  Owned by the controller thread; never touched by the hook.
pub struct FocusGuard {
    control: Arc<dyn WindowControl>,
    /// Handles registered as overlay-owned.  Shared with the UI bridge,
    /// which adds windows as the UI creates them.
    own_windows: Arc<Mutex<HashSet<WindowId>>>,
    last_target: Option<WindowId>,
}

impl FocusGuard {
    pub fn new(control: Arc<dyn WindowControl>, own_windows: Arc<Mutex<HashSet<WindowId>>>) -> Self {
        Self {
            control,
            own_windows,
            last_target: None,
        }
    }

    fn is_own(&self, id: WindowId) -> bool {
        self.own_windows.lock().expect("lock poisoned").contains(&id)
    }

    /// Records the current foreground window as the injection target,
    /// unless it is one of ours or not visible.  Runs on the controller's
    /// polling cadence, not per key event.
    pub fn poll(&mut self) {
        let Some(foreground) = self.control.foreground_window() else {
            return;
        };
        if self.is_own(foreground) || !self.control.is_window_visible(foreground) {
            return;
        }
        if self.last_target != Some(foreground) {
            debug!(target = foreground.0, "injection target updated");
        }
        self.last_target = Some(foreground);
    }

    /// Returns the window injection may proceed into, or `None` to skip.
    ///
    /// The candidate is the current foreground window, unless that is one
    /// of ours (or there is none), in which case the last recorded target
    /// stands in.  The candidate must be alive, visible, and not minimized,
    /// and must end up *confirmed foreground* — after at most one
    /// best-effort focus restore.  Unconfirmed means skip, not retry.
    pub fn confirm_target(&mut self) -> Option<WindowId> {
        let foreground = self.control.foreground_window();

        let candidate = match foreground {
            Some(fg) if !self.is_own(fg) => Some(fg),
            _ => self.last_target,
        }?;

        if !self.control.is_window_alive(candidate)
            || !self.control.is_window_visible(candidate)
            || self.control.is_window_minimized(candidate)
        {
            warn!(target = candidate.0, "injection target gone or hidden; skipping");
            return None;
        }

        if foreground == Some(candidate) {
            return Some(candidate);
        }

        if self.control.focus_window(candidate) {
            Some(candidate)
        } else {
            warn!(target = candidate.0, "could not confirm focus on target; skipping injection");
            None
        }
    }

    /// The last recorded target, if any (primarily for diagnostics).
    pub fn last_target(&self) -> Option<WindowId> {
        self.last_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Scriptable window-system double.  Focus requests succeed (and update
    /// the fake foreground) unless `refuse_focus` is set.
    struct ScriptedControl {
        foreground: Mutex<Option<WindowId>>,
        alive: Mutex<HashSet<WindowId>>,
        visible: Mutex<HashSet<WindowId>>,
        minimized: Mutex<HashSet<WindowId>>,
        refuse_focus: AtomicBool,
        focus_calls: Mutex<Vec<WindowId>>,
    }

    impl ScriptedControl {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                foreground: Mutex::new(None),
                alive: Mutex::new(HashSet::new()),
                visible: Mutex::new(HashSet::new()),
                minimized: Mutex::new(HashSet::new()),
                refuse_focus: AtomicBool::new(false),
                focus_calls: Mutex::new(Vec::new()),
            })
        }

        fn add_window(&self, id: WindowId) {
            self.alive.lock().unwrap().insert(id);
            self.visible.lock().unwrap().insert(id);
        }

        fn set_foreground(&self, id: Option<WindowId>) {
            *self.foreground.lock().unwrap() = id;
        }

        fn set_minimized(&self, id: WindowId) {
            self.minimized.lock().unwrap().insert(id);
        }

        fn close_window(&self, id: WindowId) {
            self.alive.lock().unwrap().remove(&id);
            self.visible.lock().unwrap().remove(&id);
        }

        fn focus_call_count(&self) -> usize {
            self.focus_calls.lock().unwrap().len()
        }
    }

    impl WindowControl for ScriptedControl {
        fn foreground_window(&self) -> Option<WindowId> {
            *self.foreground.lock().unwrap()
        }
        fn is_window_alive(&self, id: WindowId) -> bool {
            self.alive.lock().unwrap().contains(&id)
        }
        fn is_window_visible(&self, id: WindowId) -> bool {
            self.visible.lock().unwrap().contains(&id)
        }
        fn is_window_minimized(&self, id: WindowId) -> bool {
            self.minimized.lock().unwrap().contains(&id)
        }
        fn focus_window(&self, id: WindowId) -> bool {
            self.focus_calls.lock().unwrap().push(id);
            if self.refuse_focus.load(Ordering::SeqCst) {
                return false;
            }
            self.set_foreground(Some(id));
            true
        }
        fn apply_no_activate(&self, _id: WindowId) -> bool {
            true
        }
        fn show_no_activate(&self, _id: WindowId, _topmost: bool) -> bool {
            true
        }
        fn hide_window(&self, _id: WindowId) -> bool {
            true
        }
    }

    fn make_guard(control: Arc<ScriptedControl>) -> (FocusGuard, Arc<Mutex<HashSet<WindowId>>>) {
        let own = Arc::new(Mutex::new(HashSet::new()));
        let guard = FocusGuard::new(control, Arc::clone(&own));
        (guard, own)
    }

    const TARGET: WindowId = WindowId(0x1000);
    const OVERLAY: WindowId = WindowId(0x2000);

    #[test]
    fn test_poll_records_foreign_foreground_window() {
        // Arrange
        let control = ScriptedControl::new();
        control.add_window(TARGET);
        control.set_foreground(Some(TARGET));
        let (mut guard, _own) = make_guard(Arc::clone(&control));

        // Act
        guard.poll();

        // Assert
        assert_eq!(guard.last_target(), Some(TARGET));
    }

    #[test]
    fn test_poll_ignores_own_windows() {
        // Arrange
        let control = ScriptedControl::new();
        control.add_window(OVERLAY);
        control.set_foreground(Some(OVERLAY));
        let (mut guard, own) = make_guard(Arc::clone(&control));
        own.lock().unwrap().insert(OVERLAY);

        // Act
        guard.poll();

        // Assert: our overlay must never become the injection target.
        assert_eq!(guard.last_target(), None);
    }

    #[test]
    fn test_poll_ignores_invisible_windows() {
        let control = ScriptedControl::new();
        control.alive.lock().unwrap().insert(TARGET); // alive but never visible
        control.set_foreground(Some(TARGET));
        let (mut guard, _own) = make_guard(Arc::clone(&control));

        guard.poll();

        assert_eq!(guard.last_target(), None);
    }

    #[test]
    fn test_confirm_returns_foreground_target_without_refocusing() {
        // Arrange: the target is already foreground.
        let control = ScriptedControl::new();
        control.add_window(TARGET);
        control.set_foreground(Some(TARGET));
        let (mut guard, _own) = make_guard(Arc::clone(&control));
        guard.poll();

        // Act
        let confirmed = guard.confirm_target();

        // Assert: no focus restore needed.
        assert_eq!(confirmed, Some(TARGET));
        assert_eq!(control.focus_call_count(), 0);
    }

    #[test]
    fn test_confirm_restores_focus_when_overlay_holds_foreground() {
        // Arrange: target was recorded, then our overlay became foreground.
        let control = ScriptedControl::new();
        control.add_window(TARGET);
        control.add_window(OVERLAY);
        control.set_foreground(Some(TARGET));
        let (mut guard, own) = make_guard(Arc::clone(&control));
        own.lock().unwrap().insert(OVERLAY);
        guard.poll();
        control.set_foreground(Some(OVERLAY));

        // Act
        let confirmed = guard.confirm_target();

        // Assert: one restore attempt, verified by the fake foreground flip.
        assert_eq!(confirmed, Some(TARGET));
        assert_eq!(control.focus_call_count(), 1);
        assert_eq!(control.foreground_window(), Some(TARGET));
    }

    #[test]
    fn test_confirm_skips_when_focus_restore_fails() {
        // Arrange
        let control = ScriptedControl::new();
        control.add_window(TARGET);
        control.add_window(OVERLAY);
        control.set_foreground(Some(TARGET));
        let (mut guard, own) = make_guard(Arc::clone(&control));
        own.lock().unwrap().insert(OVERLAY);
        guard.poll();
        control.set_foreground(Some(OVERLAY));
        control.refuse_focus.store(true, Ordering::SeqCst);

        // Act
        let confirmed = guard.confirm_target();

        // Assert: unconfirmed focus means skip, never inject blindly.
        assert_eq!(confirmed, None);
    }

    #[test]
    fn test_confirm_skips_dead_target() {
        // Arrange: target recorded, then closed; overlay holds foreground.
        let control = ScriptedControl::new();
        control.add_window(TARGET);
        control.set_foreground(Some(TARGET));
        let (mut guard, own) = make_guard(Arc::clone(&control));
        guard.poll();
        control.close_window(TARGET);
        own.lock().unwrap().insert(OVERLAY);
        control.set_foreground(Some(OVERLAY));

        // Act / Assert
        assert_eq!(guard.confirm_target(), None);
        assert_eq!(control.focus_call_count(), 0);
    }

    #[test]
    fn test_confirm_skips_minimized_target() {
        let control = ScriptedControl::new();
        control.add_window(TARGET);
        control.set_foreground(Some(TARGET));
        let (mut guard, _own) = make_guard(Arc::clone(&control));
        guard.poll();
        control.set_minimized(TARGET);

        assert_eq!(guard.confirm_target(), None);
    }

    #[test]
    fn test_confirm_with_no_target_at_all_skips() {
        // No foreground, nothing ever recorded.
        let control = ScriptedControl::new();
        let (mut guard, _own) = make_guard(Arc::clone(&control));

        assert_eq!(guard.confirm_target(), None);
    }

    #[test]
    fn test_fresh_foreground_window_is_preferred_over_stale_target() {
        // Arrange: a new foreign window took foreground after the last poll.
        let control = ScriptedControl::new();
        let newer = WindowId(0x3000);
        control.add_window(TARGET);
        control.add_window(newer);
        control.set_foreground(Some(TARGET));
        let (mut guard, _own) = make_guard(Arc::clone(&control));
        guard.poll();
        control.set_foreground(Some(newer));

        // Act
        let confirmed = guard.confirm_target();

        // Assert: the live foreground wins over the recorded target.
        assert_eq!(confirmed, Some(newer));
        assert_eq!(control.focus_call_count(), 0);
    }
}
