//! Hotkey matching: exact-modifier bindings with held-key debounce.
//!
//! The matcher runs on the hook thread, once per hardware key transition.
//! It exclusively owns the pressed-key set and decides, per event, whether
//! an action fires and whether the event is swallowed or passed on to the
//! rest of the system.  At most one action ever fires per physical press:
//! OS auto-repeat delivers extra "down" events for a held key, and those
//! are filtered out here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::event::{Action, KeyEvent, KeyTransition, ModifierSet, Verdict};

/// One configured hotkey: physical key + exact modifier set → action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Hardware scan code of the bound physical key.
    #[serde(rename = "scancode")]
    pub scan_code: u16,
    /// Modifiers that must be held — exactly these, no more, no fewer.
    #[serde(default)]
    pub mods: ModifierSet,
    /// What the binding does when it fires.
    #[serde(flatten)]
    pub action: Action,
}

/// Table of bindings for one configuration epoch.
///
/// Immutable during matching: a reload builds a fresh table and swaps it in
/// at the sharing boundary, so lookups never observe a half-edited table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    /// Builds a table from configured bindings.  Order is preserved; the
    /// first matching binding wins if duplicates exist.
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Finds the binding whose scan code and *entire* modifier set match.
    ///
    /// Equality, not subset: a binding for bare `R` must not fire while
    /// Ctrl is held, and a `Ctrl+R` binding must not fire on a bare press.
    pub fn lookup(&self, scan_code: u16, modifiers: ModifierSet) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.scan_code == scan_code && b.mods == modifiers)
    }

    /// Number of bindings in the table.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if the table holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates the bindings in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }
}

/// The matcher's decision for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    /// The action to enqueue, if the event fired a binding.
    pub action: Option<Action>,
    /// Whether the hook should suppress the event or let it continue.
    pub verdict: Verdict,
}

impl MatchOutcome {
    fn pass() -> Self {
        Self {
            action: None,
            verdict: Verdict::PassThrough,
        }
    }

    fn fire(action: Action) -> Self {
        Self {
            action: Some(action),
            verdict: Verdict::Swallow,
        }
    }
}

/// Stateful matcher owning the pressed-key set.
///
/// Single-threaded by design: it lives on the hook thread and is the only
/// writer of its own state.  Debounce works on scan codes — auto-repeat
/// arrives as another "down" without an intervening "up" and must not
/// re-fire the binding.
#[derive(Debug, Default)]
pub struct HotkeyMatcher {
    pressed: HashSet<u16>,
}

impl HotkeyMatcher {
    /// Creates a matcher with no keys held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one key event against `bindings`.
    ///
    /// Injected events pass through without touching any state — text we
    /// synthesize ourselves must never be re-read as a hotkey.  While
    /// `enabled` is false only the enable toggle stays armed; every other
    /// binding is ignored and its event continues to the system unswallowed.
    /// Only the single event that fires an action is swallowed.
    pub fn on_event(
        &mut self,
        event: &KeyEvent,
        bindings: &BindingTable,
        enabled: bool,
    ) -> MatchOutcome {
        if event.injected {
            return MatchOutcome::pass();
        }

        match event.transition {
            KeyTransition::Up => {
                self.pressed.remove(&event.scan_code);
                MatchOutcome::pass()
            }
            KeyTransition::Down => {
                if !self.pressed.insert(event.scan_code) {
                    // Auto-repeat while held: this press already had its chance.
                    return MatchOutcome::pass();
                }
                let Some(binding) = bindings.lookup(event.scan_code, event.modifiers) else {
                    return MatchOutcome::pass();
                };
                if !enabled && !binding.action.is_toggle_enabled() {
                    return MatchOutcome::pass();
                }
                debug!(
                    scan_code = event.scan_code,
                    modifiers = %event.modifiers,
                    action = %binding.action,
                    "hotkey fired"
                );
                MatchOutcome::fire(binding.action)
            }
        }
    }

    /// True while the matcher considers the key held.
    pub fn is_pressed(&self, scan_code: u16) -> bool {
        self.pressed.contains(&scan_code)
    }

    /// Forgets all held keys (used when the hook restarts).
    pub fn reset(&mut self) {
        self.pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::scancode;

    fn emit_r_table() -> BindingTable {
        BindingTable::new(vec![Binding {
            scan_code: scancode::R,
            mods: ModifierSet::EMPTY,
            action: Action::EmitChar { ch: 'r' },
        }])
    }

    fn full_table() -> BindingTable {
        BindingTable::new(vec![
            Binding {
                scan_code: scancode::LEFT_SHIFT,
                mods: ModifierSet::CTRL.with(ModifierSet::ALT),
                action: Action::ToggleEnabled,
            },
            Binding {
                scan_code: scancode::GRAVE,
                mods: ModifierSet::CTRL.with(ModifierSet::ALT),
                action: Action::Exit,
            },
            Binding {
                scan_code: scancode::R,
                mods: ModifierSet::EMPTY,
                action: Action::EmitChar { ch: 'r' },
            },
            Binding {
                scan_code: scancode::X,
                mods: ModifierSet::EMPTY,
                action: Action::EmitChar { ch: 'x' },
            },
        ])
    }

    #[test]
    fn test_press_fires_action_and_swallows_event() {
        // Arrange
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();

        // Act
        let outcome = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);

        // Assert
        assert_eq!(outcome.action, Some(Action::EmitChar { ch: 'r' }));
        assert_eq!(outcome.verdict, Verdict::Swallow);
    }

    #[test]
    fn test_superset_of_required_modifiers_does_not_match() {
        // A binding for bare R must not fire when Ctrl is also held.
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();

        let outcome = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::CTRL), &table, true);

        assert_eq!(outcome.action, None);
        assert_eq!(outcome.verdict, Verdict::PassThrough);
    }

    #[test]
    fn test_subset_of_required_modifiers_does_not_match() {
        // A Ctrl+Alt binding must not fire when only Ctrl is held.
        let mut matcher = HotkeyMatcher::new();
        let table = full_table();

        let outcome = matcher.on_event(
            &KeyEvent::down(scancode::LEFT_SHIFT, ModifierSet::CTRL),
            &table,
            true,
        );

        assert_eq!(outcome.action, None);
        assert_eq!(outcome.verdict, Verdict::PassThrough);
    }

    #[test]
    fn test_exact_modifier_match_fires() {
        let mut matcher = HotkeyMatcher::new();
        let table = full_table();

        let outcome = matcher.on_event(
            &KeyEvent::down(scancode::LEFT_SHIFT, ModifierSet::CTRL.with(ModifierSet::ALT)),
            &table,
            true,
        );

        assert_eq!(outcome.action, Some(Action::ToggleEnabled));
    }

    #[test]
    fn test_held_key_fires_at_most_once() {
        // Arrange
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();
        let down = KeyEvent::down(scancode::R, ModifierSet::EMPTY);

        // Act: one press followed by four auto-repeat downs.
        let first = matcher.on_event(&down, &table, true);
        let repeats: Vec<_> = (0..4).map(|_| matcher.on_event(&down, &table, true)).collect();

        // Assert
        assert_eq!(first.action, Some(Action::EmitChar { ch: 'r' }));
        for repeat in repeats {
            assert_eq!(repeat.action, None);
            assert_eq!(repeat.verdict, Verdict::PassThrough);
        }
    }

    #[test]
    fn test_release_rearms_the_binding() {
        // Arrange
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();
        let down = KeyEvent::down(scancode::R, ModifierSet::EMPTY);

        // Act
        let first = matcher.on_event(&down, &table, true);
        let up = matcher.on_event(&KeyEvent::up(scancode::R), &table, true);
        let second = matcher.on_event(&down, &table, true);

        // Assert: release passes through, next press fires again.
        assert_eq!(first.action, Some(Action::EmitChar { ch: 'r' }));
        assert_eq!(up.action, None);
        assert_eq!(up.verdict, Verdict::PassThrough);
        assert_eq!(second.action, Some(Action::EmitChar { ch: 'r' }));
    }

    #[test]
    fn test_release_of_bound_key_is_not_swallowed() {
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();

        matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);
        let up = matcher.on_event(&KeyEvent::up(scancode::R), &table, true);

        assert_eq!(up.verdict, Verdict::PassThrough);
    }

    #[test]
    fn test_injected_events_never_match_and_are_not_tracked() {
        // Arrange
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();
        let injected_down = KeyEvent::down(scancode::R, ModifierSet::EMPTY).as_injected();

        // Act
        let outcome = matcher.on_event(&injected_down, &table, true);

        // Assert: passed through, and the pressed set was not touched, so a
        // real press right after still fires.
        assert_eq!(outcome.action, None);
        assert_eq!(outcome.verdict, Verdict::PassThrough);
        assert!(!matcher.is_pressed(scancode::R));

        let real = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);
        assert_eq!(real.action, Some(Action::EmitChar { ch: 'r' }));
    }

    #[test]
    fn test_injected_release_does_not_clear_real_press() {
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();

        matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);
        matcher.on_event(&KeyEvent::up(scancode::R).as_injected(), &table, true);

        // The real key is still held; a repeat down must stay debounced.
        let repeat = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);
        assert_eq!(repeat.action, None);
    }

    #[test]
    fn test_disabled_ignores_every_binding_except_toggle_enabled() {
        // Arrange
        let mut matcher = HotkeyMatcher::new();
        let table = full_table();
        let ctrl_alt = ModifierSet::CTRL.with(ModifierSet::ALT);

        // Act: while disabled, emit and exit bindings pass through...
        let emit = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, false);
        let exit = matcher.on_event(&KeyEvent::down(scancode::GRAVE, ctrl_alt), &table, false);
        // ...but the enable toggle still fires.
        let toggle = matcher.on_event(&KeyEvent::down(scancode::LEFT_SHIFT, ctrl_alt), &table, false);

        // Assert
        assert_eq!(emit.action, None);
        assert_eq!(emit.verdict, Verdict::PassThrough);
        assert_eq!(exit.action, None);
        assert_eq!(exit.verdict, Verdict::PassThrough);
        assert_eq!(toggle.action, Some(Action::ToggleEnabled));
        assert_eq!(toggle.verdict, Verdict::Swallow);
    }

    #[test]
    fn test_unmatched_key_passes_through() {
        let mut matcher = HotkeyMatcher::new();
        let table = full_table();

        let outcome = matcher.on_event(&KeyEvent::down(30, ModifierSet::EMPTY), &table, true);

        assert_eq!(outcome.action, None);
        assert_eq!(outcome.verdict, Verdict::PassThrough);
    }

    #[test]
    fn test_first_duplicate_binding_wins() {
        // Arrange: two bindings on the same chord.
        let table = BindingTable::new(vec![
            Binding {
                scan_code: scancode::R,
                mods: ModifierSet::EMPTY,
                action: Action::EmitChar { ch: 'a' },
            },
            Binding {
                scan_code: scancode::R,
                mods: ModifierSet::EMPTY,
                action: Action::EmitChar { ch: 'b' },
            },
        ]);
        let mut matcher = HotkeyMatcher::new();

        // Act
        let outcome = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);

        // Assert
        assert_eq!(outcome.action, Some(Action::EmitChar { ch: 'a' }));
    }

    #[test]
    fn test_reset_forgets_held_keys() {
        let mut matcher = HotkeyMatcher::new();
        let table = emit_r_table();

        matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);
        assert!(matcher.is_pressed(scancode::R));

        matcher.reset();

        assert!(!matcher.is_pressed(scancode::R));
        let again = matcher.on_event(&KeyEvent::down(scancode::R, ModifierSet::EMPTY), &table, true);
        assert_eq!(again.action, Some(Action::EmitChar { ch: 'r' }));
    }

    #[test]
    fn test_binding_table_lookup_and_len() {
        let table = full_table();

        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
        assert!(table.lookup(scancode::R, ModifierSet::EMPTY).is_some());
        assert!(table.lookup(scancode::R, ModifierSet::SHIFT).is_none());
        assert!(BindingTable::default().is_empty());
    }

    // ── Serialization ────────────────────────────────────────────────────────

    #[test]
    fn test_binding_deserializes_from_flat_toml_table() {
        // Arrange
        let toml_src = r#"
            scancode = 19
            mods = ["ctrl", "alt"]
            action = "emit_char"
            ch = "r"
        "#;

        // Act
        let binding: Binding = toml::from_str(toml_src).unwrap();

        // Assert
        assert_eq!(binding.scan_code, 19);
        assert_eq!(binding.mods, ModifierSet::CTRL.with(ModifierSet::ALT));
        assert_eq!(binding.action, Action::EmitChar { ch: 'r' });
    }

    #[test]
    fn test_binding_mods_default_to_empty() {
        let toml_src = r#"
            scancode = 45
            action = "emit_char"
            ch = "x"
        "#;

        let binding: Binding = toml::from_str(toml_src).unwrap();

        assert_eq!(binding.mods, ModifierSet::EMPTY);
    }

    #[test]
    fn test_binding_with_unit_action_needs_no_payload() {
        let toml_src = r#"
            scancode = 41
            mods = ["ctrl", "alt"]
            action = "exit"
        "#;

        let binding: Binding = toml::from_str(toml_src).unwrap();

        assert_eq!(binding.action, Action::Exit);
    }

    #[test]
    fn test_binding_rejects_unknown_modifier_name() {
        let toml_src = r#"
            scancode = 19
            mods = ["hyper"]
            action = "exit"
        "#;

        assert!(toml::from_str::<Binding>(toml_src).is_err());
    }

    #[test]
    fn test_binding_serializes_back_to_flat_table() {
        // Arrange
        let binding = Binding {
            scan_code: scancode::GRAVE,
            mods: ModifierSet::CTRL.with(ModifierSet::ALT),
            action: Action::Exit,
        };

        // Act
        let rendered = toml::to_string(&binding).unwrap();
        let reparsed: Binding = toml::from_str(&rendered).unwrap();

        // Assert
        assert!(rendered.contains("scancode = 41"));
        assert!(rendered.contains("action = \"exit\""));
        assert_eq!(reparsed, binding);
    }
}
