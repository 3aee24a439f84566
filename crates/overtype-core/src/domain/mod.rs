//! Domain rules for OverType.
//!
//! Pure business logic with no infrastructure dependencies: these modules
//! compile and test on any platform.  The hook, injection, and window layers
//! in `overtype-app` depend on this crate; nothing here depends on them.

/// Key events, modifier sets, and actions — the values that cross threads.
pub mod event;
/// Binding table and the exact-match, debounced hotkey matcher.
pub mod matcher;
