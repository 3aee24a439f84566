//! Infrastructure layer for the OverType application.
//!
//! Contains OS-facing adapters: the low-level keyboard hook, text
//! injection, window control for the overlay, file-system storage, and the
//! UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `overtype_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod keyboard_hook;
pub mod storage;
pub mod text_injection;
pub mod ui_bridge;
pub mod window_control;
