//! Application layer use cases for OverType.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure matching rules in `overtype-core`) and the infrastructure (OS hook,
//! SendInput, window styling, storage).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "when a
//!   hotkey fires, confirm the focus target and inject the bound text").
//! - **Depend on abstractions** (traits) rather than concrete
//!   implementations, so the OS adapters can be swapped for test doubles.
//! - **Contain no OS calls, no blocking I/O, no file system access.**
//!
//! # Sub-modules
//!
//! - **`match_hotkeys`** – Runs inside the hook callback, once per keyboard
//!   event.  This is the most latency-critical code in the process: it must
//!   never block, because a stalled hook is silently removed by the OS.
//!
//! - **`dispatch_actions`** – Drains the action queue on the controller
//!   thread and carries out each action: toggling, minimizing, injecting
//!   text, exiting.  Owns the [`dispatch_actions::TextInjector`] and
//!   [`dispatch_actions::StateStore`] seams.
//!
//! - **`guard_focus`** – Tracks the last real foreground window and vetoes
//!   any injection whose target cannot be confirmed.  Owns the
//!   [`guard_focus::WindowControl`] seam.
//!
//! - **`overlay_presence`** – The overlay's activation-phase state machine
//!   (hidden / visible-non-activating / minimized), including reasserting
//!   the no-activate window style on every entry to the visible phase.

pub mod dispatch_actions;
pub mod guard_focus;
pub mod match_hotkeys;
pub mod overlay_presence;
