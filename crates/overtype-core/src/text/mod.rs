//! Pulse planning for Unicode text injection.
//!
//! Injection works in UTF-16 code units — the unit the OS Unicode injection
//! path consumes — and each unit becomes a key-down pulse followed by a
//! key-up pulse.  Planning is pure so the ordering properties are testable
//! without any OS: the platform layer only converts pulses into its native
//! input records and submits them in one call.

use crate::domain::event::KeyTransition;

/// One synthetic key transition carrying a UTF-16 code unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPulse {
    /// The UTF-16 code unit to inject (a surrogate half for astral chars).
    pub code_unit: u16,
    /// Down or up.
    pub transition: KeyTransition,
}

impl KeyPulse {
    fn down(code_unit: u16) -> Self {
        Self {
            code_unit,
            transition: KeyTransition::Down,
        }
    }

    fn up(code_unit: u16) -> Self {
        Self {
            code_unit,
            transition: KeyTransition::Up,
        }
    }
}

/// Expands `text` into the ordered pulse sequence that types it.
///
/// Every code unit yields down-then-up before the next unit starts, and
/// units stay in string order.  Surrogate pairs keep their high/low order:
/// the receiving application reassembles the character only if both halves
/// arrive in sequence.
pub fn utf16_pulses(text: &str) -> Vec<KeyPulse> {
    let mut pulses = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        pulses.push(KeyPulse::down(unit));
        pulses.push(KeyPulse::up(unit));
    }
    pulses
}

/// Pulse plan for a single character, the common hotkey payload.
pub fn char_pulses(ch: char) -> Vec<KeyPulse> {
    let mut buf = [0u16; 2];
    ch.encode_utf16(&mut buf)
        .iter()
        .flat_map(|&unit| [KeyPulse::down(unit), KeyPulse::up(unit)])
        .collect()
}
