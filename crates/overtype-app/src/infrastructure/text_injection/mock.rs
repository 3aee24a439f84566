//! Recording text injector for unit testing.
//!
//! Captures injected strings instead of touching the OS, and can be
//! switched into a failure mode to exercise the drop-on-error path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::dispatch_actions::{InjectionError, TextInjector};

/// A mock implementation of [`TextInjector`] that records every call.
pub struct RecordingInjector {
    injected: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    should_fail: AtomicBool,
}

impl RecordingInjector {
    /// Creates a new recording injector.
    pub fn new() -> Self {
        Self {
            injected: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Every string successfully injected so far, in order.
    pub fn texts(&self) -> Vec<String> {
        self.injected.lock().expect("lock poisoned").clone()
    }

    /// Total number of injection attempts, failed ones included.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// When set, every injection call fails with a rejected error.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

impl Default for RecordingInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextInjector for RecordingInjector {
    fn inject_text(&self, text: &str) -> Result<(), InjectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(InjectionError::Rejected {
                sent: 0,
                expected: text.encode_utf16().count() as u32 * 2,
                code: 5, // ERROR_ACCESS_DENIED
            });
        }
        self.injected
            .lock()
            .expect("lock poisoned")
            .push(text.to_string());
        Ok(())
    }
}
