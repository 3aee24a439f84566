//! Key events, modifier sets, and the action vocabulary.
//!
//! Everything in this module crosses the hook-thread boundary by value:
//! events flow from the hook callback into the matcher, and matched actions
//! flow through a channel to the controller thread.  All types here are
//! therefore small, `Copy`, and free of references or OS handles — an
//! enqueued [`Action`] must stay valid no matter when the other thread gets
//! around to draining it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a key transition as reported by the low-level hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTransition {
    /// The key went down (the OS also reports auto-repeat as repeated downs).
    Down,
    /// The key was released.
    Up,
}

/// Error for a configuration that names a modifier this crate does not know.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown modifier name {0:?} (expected ctrl, alt, shift, or win)")]
pub struct UnknownModifier(pub String);

/// Set of modifier keys held at a point in time.
///
/// Stored as a bitset so snapshots are `Copy` and comparison is one integer
/// equality — binding matching compares whole sets, never individual flags.
/// Serialized as a list of lowercase names (`["ctrl", "alt"]`) so the
/// configuration file stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ModifierSet(u8);

impl ModifierSet {
    /// The empty set: no modifiers held.
    pub const EMPTY: Self = Self(0);
    /// Either Ctrl key.
    pub const CTRL: Self = Self(1);
    /// Either Alt key.
    pub const ALT: Self = Self(1 << 1);
    /// Either Shift key.
    pub const SHIFT: Self = Self(1 << 2);
    /// Either Windows (meta) key.
    pub const WIN: Self = Self(1 << 3);

    /// Returns the union of `self` and `other`.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if every modifier in `other` is also in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no modifier is held.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowercase names of the modifiers in this set, in canonical order.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::CTRL) {
            names.push("ctrl");
        }
        if self.contains(Self::ALT) {
            names.push("alt");
        }
        if self.contains(Self::SHIFT) {
            names.push("shift");
        }
        if self.contains(Self::WIN) {
            names.push("win");
        }
        names
    }

    fn from_name(name: &str) -> Result<Self, UnknownModifier> {
        match name.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Ok(Self::CTRL),
            "alt" => Ok(Self::ALT),
            "shift" => Ok(Self::SHIFT),
            "win" | "meta" | "super" => Ok(Self::WIN),
            _ => Err(UnknownModifier(name.to_string())),
        }
    }
}

impl TryFrom<Vec<String>> for ModifierSet {
    type Error = UnknownModifier;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        let mut set = Self::EMPTY;
        for name in &names {
            set = set.with(Self::from_name(name)?);
        }
        Ok(set)
    }
}

impl From<ModifierSet> for Vec<String> {
    fn from(set: ModifierSet) -> Self {
        set.names().into_iter().map(String::from).collect()
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.names().join("+"))
        }
    }
}

/// One keyboard transition as observed by the low-level hook.
///
/// `modifiers` is a snapshot of the live modifier state at the moment the
/// event was observed.  It comes from the hook's own tracker rather than
/// from per-event flags, so it is layout-independent and consistent with
/// the strict ordering of events on the hook thread.  `injected` marks
/// events synthesized by this process's own injector; the matcher passes
/// those through untouched to prevent feedback loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Hardware scan code of the physical key (layout-independent).
    pub scan_code: u16,
    /// Whether the key went down or up.
    pub transition: KeyTransition,
    /// Modifiers held when the event was observed.
    pub modifiers: ModifierSet,
    /// True if this event originated from our own injector.
    pub injected: bool,
}

impl KeyEvent {
    /// A hardware key-down event with the given modifiers held.
    pub fn down(scan_code: u16, modifiers: ModifierSet) -> Self {
        Self {
            scan_code,
            transition: KeyTransition::Down,
            modifiers,
            injected: false,
        }
    }

    /// A hardware key-up event.
    pub fn up(scan_code: u16) -> Self {
        Self {
            scan_code,
            transition: KeyTransition::Up,
            modifiers: ModifierSet::EMPTY,
            injected: false,
        }
    }

    /// The same event, marked as self-injected.
    #[must_use]
    pub fn as_injected(self) -> Self {
        Self {
            injected: true,
            ..self
        }
    }
}

/// Everything a hotkey can do.
///
/// Actions cross the thread boundary as plain values, so the enum is closed,
/// `Copy`, and payload-free apart from the single literal character of
/// [`Action::EmitChar`].  Serialized with an internal `action` tag so each
/// binding in the configuration file reads as one flat table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Inject one literal character into the focused window.
    EmitChar {
        /// The character to inject, independent of keyboard layout.
        ch: char,
    },
    /// Flip the global enabled flag (the only binding live while disabled).
    ToggleEnabled,
    /// Collapse the overlay to its minimized form, or restore it.
    ToggleMinimized,
    /// Shut the application down cleanly.
    Exit,
}

impl Action {
    /// True for the enable/disable toggle, which stays armed while disabled.
    pub fn is_toggle_enabled(&self) -> bool {
        matches!(self, Self::ToggleEnabled)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmitChar { ch } => write!(f, "emit_char({ch:?})"),
            Self::ToggleEnabled => write!(f, "toggle_enabled"),
            Self::ToggleMinimized => write!(f, "toggle_minimized"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

/// What the hook should tell the OS to do with an event after matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the event continue to the rest of the system.
    PassThrough,
    /// Suppress the event; it fired a hotkey and must not reach other apps.
    Swallow,
}

/// Scan codes (set 1 make codes) for the keys used by the default bindings.
pub mod scancode {
    /// Left Shift.
    pub const LEFT_SHIFT: u16 = 42;
    /// Grave / backtick, left of the digit row on ANSI layouts.
    pub const GRAVE: u16 = 41;
    /// The physical key that types 'r' on QWERTY.
    pub const R: u16 = 19;
    /// The physical key that types 'x' on QWERTY.
    pub const X: u16 = 45;
}
