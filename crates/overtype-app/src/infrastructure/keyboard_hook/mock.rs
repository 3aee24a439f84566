//! Mock key event source for unit testing.
//!
//! Allows tests to push synthetic [`KeyEvent`]s through the installed
//! handler without a running Win32 message loop or OS hooks.

use std::sync::Mutex;

use overtype_core::{KeyEvent, Verdict};

use super::{HookError, KeyEventHandler, KeyEventSource};

/// A mock implementation of [`KeyEventSource`] that delivers events
/// synchronously on the calling thread.
pub struct MockKeyEventSource {
    handler: Mutex<Option<KeyEventHandler>>,
}

impl MockKeyEventSource {
    /// Creates a new mock key event source.
    pub fn new() -> Self {
        Self {
            handler: Mutex::new(None),
        }
    }

    /// Delivers a synthetic event to the installed handler, returning the
    /// verdict it produced, or `None` if the source is stopped.
    pub fn deliver(&self, event: KeyEvent) -> Option<Verdict> {
        let mut guard = self.handler.lock().expect("lock poisoned");
        guard.as_mut().map(|handler| handler(event))
    }

    /// Whether `start()` has been called without a matching `stop()`.
    pub fn is_started(&self) -> bool {
        self.handler.lock().expect("lock poisoned").is_some()
    }
}

impl Default for MockKeyEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventSource for MockKeyEventSource {
    fn start(&self, handler: KeyEventHandler) -> Result<(), HookError> {
        let mut guard = self.handler.lock().expect("lock poisoned");
        if guard.is_some() {
            return Err(HookError::AlreadyRunning);
        }
        *guard = Some(handler);
        Ok(())
    }

    fn stop(&self) {
        // Drop the handler; matcher state held in the closure goes with it.
        *self.handler.lock().expect("lock poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overtype_core::{scancode, ModifierSet};

    #[test]
    fn test_mock_source_delivers_to_installed_handler() {
        // Arrange
        let source = MockKeyEventSource::new();
        source
            .start(Box::new(|_event| Verdict::Swallow))
            .expect("start should succeed");

        // Act
        let verdict = source.deliver(KeyEvent::down(scancode::R, ModifierSet::EMPTY));

        // Assert
        assert_eq!(verdict, Some(Verdict::Swallow));
    }

    #[test]
    fn test_mock_source_rejects_double_start() {
        let source = MockKeyEventSource::new();
        source
            .start(Box::new(|_event| Verdict::PassThrough))
            .expect("first start should succeed");

        let second = source.start(Box::new(|_event| Verdict::PassThrough));

        assert!(matches!(second, Err(HookError::AlreadyRunning)));
    }

    #[test]
    fn test_mock_source_stop_drops_the_handler() {
        // Arrange
        let source = MockKeyEventSource::new();
        source
            .start(Box::new(|_event| Verdict::Swallow))
            .expect("start should succeed");

        // Act
        source.stop();

        // Assert
        assert!(!source.is_started());
        assert_eq!(
            source.deliver(KeyEvent::down(scancode::R, ModifierSet::EMPTY)),
            None
        );
    }

    #[test]
    fn test_mock_source_can_restart_after_stop() {
        let source = MockKeyEventSource::new();
        source
            .start(Box::new(|_event| Verdict::PassThrough))
            .expect("start should succeed");
        source.stop();

        source
            .start(Box::new(|_event| Verdict::Swallow))
            .expect("restart should succeed");

        assert_eq!(
            source.deliver(KeyEvent::up(scancode::R)),
            Some(Verdict::Swallow)
        );
    }
}
