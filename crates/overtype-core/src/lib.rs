//! # overtype-core
//!
//! Shared domain library for OverType: key events, modifier sets, the hotkey
//! matcher, and text-to-pulse planning.
//!
//! This crate has zero dependencies on OS APIs or UI frameworks — everything
//! here runs identically on any platform, which is what keeps the matching
//! and injection-ordering rules unit-testable without a real keyboard hook.
//!
//! # Architecture overview (for beginners)
//!
//! OverType is a system-wide hotkey tool: it watches every keyboard event at
//! the OS level, and when a configured physical key combination is pressed it
//! "types" a replacement character into whatever application currently has
//! focus — while its own overlay window never steals that focus.
//!
//! This crate is the platform-free foundation.  It defines:
//!
//! - **`domain::event`** – The value types that cross the hook-thread
//!   boundary: [`KeyEvent`], [`ModifierSet`], [`Action`], [`Verdict`].  All
//!   are small and `Copy`, because they are handed between threads as plain
//!   values rather than as references into thread-local state.
//!
//! - **`domain::matcher`** – The hotkey rules: exact-modifier-set matching,
//!   one action per physical press (debounce), and the recursion guard that
//!   keeps self-injected events from ever looking like hotkeys.
//!
//! - **`text`** – Planning of Unicode text into ordered down/up key pulses,
//!   the layout-independent unit the platform injector submits to the OS.

pub mod domain;
pub mod text;

// Re-export the most-used types at the crate root so callers can write
// `overtype_core::HotkeyMatcher` instead of the full module path.
pub use domain::event::{
    scancode, Action, KeyEvent, KeyTransition, ModifierSet, UnknownModifier, Verdict,
};
pub use domain::matcher::{Binding, BindingTable, HotkeyMatcher, MatchOutcome};
pub use text::{char_pulses, utf16_pulses, KeyPulse};
