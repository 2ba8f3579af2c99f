use std::fmt;

use serde::{Deserialize, Serialize};

/// A keyboard key as seen by the session.
///
/// Serialized as a short name: a single character, `"enter"` or `"escape"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Char(char),
    Enter,
    Escape,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => f.write_str("enter"),
            Key::Escape => f.write_str("escape"),
        }
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_ascii_lowercase().as_str() {
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Key::Char(c)),
                    _ => Err(format!("unknown key {s:?}")),
                }
            }
        }
    }
}

/// Input gathered by a display sink while a frame is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    PointerMove { x: i32, y: i32 },
    PointerDown { x: i32, y: i32 },
    Key(Key),
}

/// Session key bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub manual_calibration: Key,
    pub checkerboard_calibration: Key,
    pub confirm: Key,
    pub quit: Key,
    pub cancel: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            manual_calibration: Key::Char('c'),
            checkerboard_calibration: Key::Char('b'),
            confirm: Key::Enter,
            quit: Key::Char('q'),
            cancel: Key::Escape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_from_short_names() {
        assert_eq!(Ok(Key::Char('c')), Key::try_from("c".to_string()));
        assert_eq!(Ok(Key::Enter), Key::try_from("Enter".to_string()));
        assert_eq!(Ok(Key::Escape), Key::try_from("esc".to_string()));
        assert!(Key::try_from("ctrl".to_string()).is_err());
        assert_eq!("escape", String::from(Key::Escape));
    }
}
