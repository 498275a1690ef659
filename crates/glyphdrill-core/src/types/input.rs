//! Keyboard input decoding.
//!
//! Only the hold modifier and the sixteen hex-digit keys matter. Physical key
//! codes follow the DOM `KeyboardEvent.code` naming (`Digit7`, `KeyB`,
//! `AltLeft`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static HEX_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Digit([0-9])|Key([A-Fa-f])|Numpad([0-9]))$").expect("valid hex key regex")
});

static MODIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Alt(?:Left|Right)?|AltGraph)$").expect("valid modifier regex"));

/// One hex digit, `0..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexDigit(u8);

impl HexDigit {
    pub fn new(value: u8) -> Option<Self> {
        (value < 16).then_some(Self(value))
    }

    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(16).map(|v| Self(v as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Canonical uppercase character.
    pub fn as_char(self) -> char {
        char::from_digit(u32::from(self.0), 16)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }
}

impl fmt::Display for HexDigit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A decoded key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    /// Hold modifier pressed.
    ModifierDown,
    /// Hold modifier released.
    ModifierUp,
    /// Hex-digit key pressed.
    Hex(HexDigit),
    /// Anything else; ignored by the scheduler.
    Other,
}

impl KeyEvent {
    /// Decode a key-down event from its physical key code.
    pub fn key_down(code: &str) -> Self {
        if MODIFIER_PATTERN.is_match(code) {
            return Self::ModifierDown;
        }
        match HEX_KEY_PATTERN.captures(code) {
            Some(caps) => caps
                .iter()
                .skip(1)
                .flatten()
                .find_map(|m| m.as_str().chars().next())
                .and_then(HexDigit::from_char)
                .map(Self::Hex)
                .unwrap_or(Self::Other),
            None => Self::Other,
        }
    }

    /// Decode a key-up event; only the modifier release is meaningful.
    pub fn key_up(code: &str) -> Self {
        if MODIFIER_PATTERN.is_match(code) {
            Self::ModifierUp
        } else {
            Self::Other
        }
    }

    /// Build the modifier-held key sequence for a full code, e.g. `"03B1"`.
    pub fn sequence_for(code: &str) -> Vec<KeyEvent> {
        code.chars()
            .filter_map(HexDigit::from_char)
            .map(KeyEvent::Hex)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_digits_and_letters() {
        assert_eq!(KeyEvent::key_down("Digit7"), KeyEvent::Hex(HexDigit::new(7).unwrap()));
        assert_eq!(KeyEvent::key_down("KeyB"), KeyEvent::Hex(HexDigit::new(11).unwrap()));
        assert_eq!(KeyEvent::key_down("Numpad0"), KeyEvent::Hex(HexDigit::new(0).unwrap()));
    }

    #[test]
    fn test_decode_non_hex_keys() {
        assert_eq!(KeyEvent::key_down("KeyG"), KeyEvent::Other);
        assert_eq!(KeyEvent::key_down("Space"), KeyEvent::Other);
        assert_eq!(KeyEvent::key_down("ShiftLeft"), KeyEvent::Other);
    }

    #[test]
    fn test_decode_modifier() {
        assert_eq!(KeyEvent::key_down("AltLeft"), KeyEvent::ModifierDown);
        assert_eq!(KeyEvent::key_up("AltRight"), KeyEvent::ModifierUp);
        assert_eq!(KeyEvent::key_up("Digit1"), KeyEvent::Other);
    }

    #[test]
    fn test_hex_digit_chars() {
        assert_eq!(HexDigit::from_char('b').unwrap().as_char(), 'B');
        assert!(HexDigit::new(16).is_none());
        assert_eq!(KeyEvent::sequence_for("03B1").len(), 4);
    }
}
