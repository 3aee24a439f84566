//! Hook-side hotkey matching: key event in, pass/swallow verdict out.
//!
//! This use case runs on the hook thread, inside the per-keystroke budget
//! the OS enforces, so it must never block: the binding table is read with
//! `try_read` (a reload in flight just means this keystroke sees the old
//! table) and matched actions are handed off through an unbounded channel
//! for the controller thread to execute later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};

use tracing::debug;

use overtype_core::{Action, BindingTable, HotkeyMatcher, KeyEvent, Verdict};

/// Matches low-level key events against the binding table and enqueues the
/// resulting actions.  One instance exists per hook; it is moved onto the
/// hook thread via [`MatchHotkeysUseCase::into_handler`].
pub struct MatchHotkeysUseCase {
    matcher: HotkeyMatcher,
    bindings: Arc<RwLock<BindingTable>>,
    enabled: Arc<AtomicBool>,
    actions: Sender<Action>,
}

impl MatchHotkeysUseCase {
    pub fn new(
        bindings: Arc<RwLock<BindingTable>>,
        enabled: Arc<AtomicBool>,
        actions: Sender<Action>,
    ) -> Self {
        Self {
            matcher: HotkeyMatcher::new(),
            bindings,
            enabled,
            actions,
        }
    }

    /// Processes one key event.  Returns the verdict the hook must report
    /// to the OS; any matched action has already been enqueued.
    pub fn handle(&mut self, event: KeyEvent) -> Verdict {
        // A writer (config reload) holding the lock must not stall the
        // hook thread; letting one keystroke see the old table is fine.
        let Ok(table) = self.bindings.try_read() else {
            return Verdict::PassThrough;
        };

        let enabled = self.enabled.load(Ordering::Relaxed);
        let outcome = self.matcher.on_event(&event, &table, enabled);

        if let Some(action) = outcome.action {
            if self.actions.send(action).is_err() {
                // Controller gone (shutdown in progress): drop quietly.
                debug!("action channel closed; dropping {action}");
            }
        }
        outcome.verdict
    }

    /// Wraps this use case into the boxed callback shape the keyboard hook
    /// expects, consuming `self` so the matcher state lives on the hook.
    pub fn into_handler(mut self) -> Box<dyn FnMut(KeyEvent) -> Verdict + Send> {
        Box::new(move |event| self.handle(event))
    }
}
