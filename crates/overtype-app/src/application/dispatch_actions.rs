//! Controller-side action dispatch: drains the queue the hook fills.
//!
//! Everything that may take time or touch the OS beyond a single atomic —
//! text injection, focus confirmation, overlay transitions, state
//! persistence — happens here on the controller thread, never on the hook
//! thread.  Actions are applied strictly in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use overtype_core::Action;

use crate::application::guard_focus::FocusGuard;
use crate::application::overlay_presence::{OverlayPhase, OverlayPresence};

/// Errors surfaced by a text injection backend.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The OS accepted fewer input events than we handed it, usually
    /// because a higher-integrity window has focus.
    #[error("injection inserted {sent}/{expected} events (os error {code})")]
    Rejected { sent: u32, expected: u32, code: u32 },
    #[error("text injection is not supported on {0}")]
    UnsupportedPlatform(String),
}

/// Seam to the platform text injector, implemented by the infrastructure
/// layer.  Injection is fire-and-forget: a failed call is logged and the
/// text dropped, never retried.
pub trait TextInjector: Send + Sync {
    /// Injects `text` as synthetic keystrokes into the focused window.
    fn inject_text(&self, text: &str) -> Result<(), InjectionError>;

    /// Injects a single character.
    fn inject_char(&self, ch: char) -> Result<(), InjectionError> {
        let mut buf = [0u8; 4];
        self.inject_text(ch.encode_utf8(&mut buf))
    }
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("could not persist runtime state: {0}")]
    Persist(String),
}

/// Seam to runtime-state persistence (enabled flag, minimized flag), so
/// the engine comes back in the same shape it was left in.
pub trait StateStore: Send + Sync {
    fn save(&self, enabled: bool, minimized: bool) -> Result<(), StateStoreError>;
}

/// What the controller loop should do after a drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    Exit,
}

/// Consumes matched actions and carries them out against the platform
/// services.  Owned exclusively by the controller loop.
pub struct DispatchActionsUseCase {
    actions: Receiver<Action>,
    enabled: Arc<AtomicBool>,
    guard: FocusGuard,
    presence: Arc<OverlayPresence>,
    injector: Arc<dyn TextInjector>,
    state_store: Arc<dyn StateStore>,
}

impl DispatchActionsUseCase {
    pub fn new(
        actions: Receiver<Action>,
        enabled: Arc<AtomicBool>,
        guard: FocusGuard,
        presence: Arc<OverlayPresence>,
        injector: Arc<dyn TextInjector>,
        state_store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            actions,
            enabled,
            guard,
            presence,
            injector,
            state_store,
        }
    }

    /// Applies every queued action in FIFO order.  Returns
    /// [`DispatchOutcome::Exit`] as soon as an exit action is seen.
    pub fn drain(&mut self) -> DispatchOutcome {
        while let Ok(action) = self.actions.try_recv() {
            if self.apply(action) == DispatchOutcome::Exit {
                return DispatchOutcome::Exit;
            }
        }
        DispatchOutcome::Continue
    }

    /// Lets the focus guard refresh its notion of the injection target.
    /// Called on the controller's polling cadence.
    pub fn poll_foreground(&mut self) {
        self.guard.poll();
    }

    fn apply(&mut self, action: Action) -> DispatchOutcome {
        match action {
            Action::EmitChar { ch } => self.emit_char(ch),
            Action::ToggleEnabled => self.toggle_enabled(),
            Action::ToggleMinimized => self.toggle_minimized(),
            Action::Exit => {
                info!("exit requested via hotkey");
                return DispatchOutcome::Exit;
            }
        }
        DispatchOutcome::Continue
    }

    fn toggle_enabled(&mut self) {
        // A toggle while tucked away means the user is reaching for the
        // panel: restore it instead of silently disabling the engine.
        if self.presence.phase() == OverlayPhase::Minimized {
            self.presence.restore();
            self.persist_state();
            return;
        }

        let was_enabled = self.enabled.fetch_xor(true, Ordering::Relaxed);
        if was_enabled {
            self.presence.hide();
            info!("hotkeys disabled");
        } else {
            self.presence.show();
            info!("hotkeys enabled");
        }
        self.persist_state();
    }

    fn toggle_minimized(&mut self) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        if self.presence.phase() == OverlayPhase::Minimized {
            self.presence.restore();
        } else {
            self.presence.minimize();
        }
        self.persist_state();
    }

    fn emit_char(&mut self, ch: char) {
        // The flag may have flipped since the hook matched this action; a
        // queued disable wins over a queued character.
        if !self.enabled.load(Ordering::Relaxed) {
            debug!("engine disabled after match; dropping {ch:?}");
            return;
        }

        let Some(target) = self.guard.confirm_target() else {
            warn!("no confirmed injection target; dropping {ch:?}");
            return;
        };

        match self.injector.inject_char(ch) {
            Ok(()) => debug!(target = target.0, "injected {ch:?}"),
            Err(e) => warn!("injection failed, dropping {ch:?}: {e}"),
        }
    }

    fn persist_state(&self) {
        let enabled = self.enabled.load(Ordering::Relaxed);
        let minimized = self.presence.phase() == OverlayPhase::Minimized;
        if let Err(e) = self.state_store.save(enabled, minimized) {
            warn!("state not persisted: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc::{self, Sender};
    use std::sync::Mutex;

    use crate::application::guard_focus::{WindowControl, WindowId};
    use crate::infrastructure::text_injection::mock::RecordingInjector;
    use crate::infrastructure::window_control::mock::FakeWindowControl;

    struct RecordingStateStore {
        saves: Mutex<Vec<(bool, bool)>>,
        should_fail: AtomicBool,
    }

    impl RecordingStateStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                saves: Mutex::new(Vec::new()),
                should_fail: AtomicBool::new(false),
            })
        }

        fn saves(&self) -> Vec<(bool, bool)> {
            self.saves.lock().unwrap().clone()
        }
    }

    impl StateStore for RecordingStateStore {
        fn save(&self, enabled: bool, minimized: bool) -> Result<(), StateStoreError> {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(StateStoreError::Persist("disk full".into()));
            }
            self.saves.lock().unwrap().push((enabled, minimized));
            Ok(())
        }
    }

    struct Harness {
        tx: Sender<Action>,
        dispatcher: DispatchActionsUseCase,
        control: Arc<FakeWindowControl>,
        injector: Arc<RecordingInjector>,
        store: Arc<RecordingStateStore>,
        presence: Arc<OverlayPresence>,
        enabled: Arc<AtomicBool>,
    }

    const TARGET: WindowId = WindowId(0x1000);

    fn make_harness(enabled: bool) -> Harness {
        let control = FakeWindowControl::new();
        control.add_window(TARGET);
        control.set_foreground(Some(TARGET));

        let presence = Arc::new(OverlayPresence::new(
            Arc::clone(&control) as Arc<dyn WindowControl>,
            true,
        ));
        let own_windows = Arc::new(Mutex::new(HashSet::new()));
        let guard = FocusGuard::new(
            Arc::clone(&control) as Arc<dyn WindowControl>,
            own_windows,
        );
        let enabled = Arc::new(AtomicBool::new(enabled));
        let injector = Arc::new(RecordingInjector::new());
        let store = RecordingStateStore::new();
        let (tx, rx) = mpsc::channel();

        let dispatcher = DispatchActionsUseCase::new(
            rx,
            Arc::clone(&enabled),
            guard,
            Arc::clone(&presence),
            Arc::clone(&injector) as Arc<dyn TextInjector>,
            Arc::clone(&store) as Arc<dyn StateStore>,
        );

        Harness {
            tx,
            dispatcher,
            control,
            injector,
            store,
            presence,
            enabled,
        }
    }

    #[test]
    fn test_emit_char_injects_into_confirmed_target() {
        // Arrange
        let mut h = make_harness(true);
        h.tx.send(Action::EmitChar { ch: 'r' }).unwrap();

        // Act
        let outcome = h.dispatcher.drain();

        // Assert
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(h.injector.texts(), vec!["r".to_string()]);
    }

    #[test]
    fn test_actions_apply_in_fifo_order() {
        let mut h = make_harness(true);
        h.tx.send(Action::EmitChar { ch: 'r' }).unwrap();
        h.tx.send(Action::EmitChar { ch: 'x' }).unwrap();

        h.dispatcher.drain();

        assert_eq!(h.injector.texts(), vec!["r".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_queued_char_is_dropped_after_disable() {
        // A disable processed earlier in the queue wins over the char.
        let mut h = make_harness(false);
        h.tx.send(Action::EmitChar { ch: 'r' }).unwrap();

        h.dispatcher.drain();

        assert!(h.injector.texts().is_empty());
    }

    #[test]
    fn test_unconfirmed_target_skips_injection_once() {
        // Arrange: no foreground window and nothing recorded yet.
        let mut h = make_harness(true);
        h.control.set_foreground(None);
        h.tx.send(Action::EmitChar { ch: 'r' }).unwrap();

        // Act
        h.dispatcher.drain();

        // Assert: skipped, no injection attempt at all.
        assert_eq!(h.injector.attempt_count(), 0);

        // A target coming back makes the next action work normally.
        h.control.set_foreground(Some(TARGET));
        h.tx.send(Action::EmitChar { ch: 'x' }).unwrap();
        h.dispatcher.drain();
        assert_eq!(h.injector.texts(), vec!["x".to_string()]);
    }

    #[test]
    fn test_injection_failure_drops_without_retry() {
        // Arrange
        let mut h = make_harness(true);
        h.injector.set_should_fail(true);
        h.tx.send(Action::EmitChar { ch: 'r' }).unwrap();

        // Act
        let outcome = h.dispatcher.drain();

        // Assert: exactly one attempt, nothing recorded, loop continues.
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(h.injector.attempt_count(), 1);
        assert!(h.injector.texts().is_empty());

        // Recovery on the next action.
        h.injector.set_should_fail(false);
        h.tx.send(Action::EmitChar { ch: 'x' }).unwrap();
        h.dispatcher.drain();
        assert_eq!(h.injector.texts(), vec!["x".to_string()]);
    }

    #[test]
    fn test_toggle_enabled_flips_flag_and_overlay() {
        // Arrange: running enabled with the overlay visible.
        let mut h = make_harness(true);
        h.presence.show();

        // Act: disable.
        h.tx.send(Action::ToggleEnabled).unwrap();
        h.dispatcher.drain();

        // Assert
        assert!(!h.enabled.load(Ordering::Relaxed));
        assert_eq!(h.presence.phase(), OverlayPhase::Hidden);
        assert_eq!(h.store.saves(), vec![(false, false)]);

        // Act: re-enable.
        h.tx.send(Action::ToggleEnabled).unwrap();
        h.dispatcher.drain();

        // Assert
        assert!(h.enabled.load(Ordering::Relaxed));
        assert_eq!(h.presence.phase(), OverlayPhase::Visible);
        assert_eq!(h.store.saves(), vec![(false, false), (true, false)]);
    }

    #[test]
    fn test_toggle_enabled_while_minimized_restores_instead() {
        // Arrange
        let mut h = make_harness(true);
        h.presence.minimize();

        // Act
        h.tx.send(Action::ToggleEnabled).unwrap();
        h.dispatcher.drain();

        // Assert: panel restored, engine still enabled.
        assert!(h.enabled.load(Ordering::Relaxed));
        assert_eq!(h.presence.phase(), OverlayPhase::Visible);
        assert_eq!(h.store.saves(), vec![(true, false)]);
    }

    #[test]
    fn test_toggle_minimized_round_trip() {
        let mut h = make_harness(true);
        h.presence.show();

        h.tx.send(Action::ToggleMinimized).unwrap();
        h.dispatcher.drain();
        assert_eq!(h.presence.phase(), OverlayPhase::Minimized);

        h.tx.send(Action::ToggleMinimized).unwrap();
        h.dispatcher.drain();
        assert_eq!(h.presence.phase(), OverlayPhase::Visible);

        assert_eq!(h.store.saves(), vec![(true, true), (true, false)]);
    }

    #[test]
    fn test_toggle_minimized_inert_while_disabled() {
        let mut h = make_harness(false);

        h.tx.send(Action::ToggleMinimized).unwrap();
        h.dispatcher.drain();

        assert_eq!(h.presence.phase(), OverlayPhase::Hidden);
        assert!(h.store.saves().is_empty());
    }

    #[test]
    fn test_exit_action_stops_the_drain() {
        // Arrange: exit sits between two characters.
        let mut h = make_harness(true);
        h.tx.send(Action::EmitChar { ch: 'r' }).unwrap();
        h.tx.send(Action::Exit).unwrap();
        h.tx.send(Action::EmitChar { ch: 'x' }).unwrap();

        // Act
        let outcome = h.dispatcher.drain();

        // Assert: drained up to the exit, then stopped.
        assert_eq!(outcome, DispatchOutcome::Exit);
        assert_eq!(h.injector.texts(), vec!["r".to_string()]);
    }

    #[test]
    fn test_persist_failure_is_not_fatal() {
        // Arrange
        let mut h = make_harness(true);
        h.store.should_fail.store(true, Ordering::SeqCst);

        // Act
        h.tx.send(Action::ToggleEnabled).unwrap();
        let outcome = h.dispatcher.drain();

        // Assert: the toggle still happened.
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert!(!h.enabled.load(Ordering::Relaxed));
    }
}
