//! Hotkey string parsing for the global toggle and debug hotkeys

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum HotkeyError {
    #[error("empty hotkey")]
    Empty,
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("hotkey '{0}' has no main key")]
    MissingKey(String),
    #[error("hotkey '{0}' has more than one main key")]
    TooManyKeys(String),
}

/// Parse strings like `F2`, `ctrl+shift+f9` or `Alt + Q` into a [`HotKey`]
pub fn parse_hotkey(text: &str) -> Result<HotKey, HotkeyError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(HotkeyError::Empty);
    }

    let mut modifiers = Modifiers::empty();
    let mut code = None;

    for part in trimmed.split('+').map(str::trim) {
        if let Some(modifier) = string_to_modifier(part) {
            modifiers |= modifier;
            continue;
        }
        let key = string_to_code(part).ok_or_else(|| HotkeyError::UnknownKey(part.to_string()))?;
        if code.replace(key).is_some() {
            return Err(HotkeyError::TooManyKeys(trimmed.to_string()));
        }
    }

    let code = code.ok_or_else(|| HotkeyError::MissingKey(trimmed.to_string()))?;
    let modifiers = if modifiers.is_empty() {
        None
    } else {
        Some(modifiers)
    };
    Ok(HotKey::new(modifiers, code))
}

fn string_to_modifier(part: &str) -> Option<Modifiers> {
    match part.to_uppercase().as_str() {
        "CTRL" | "CONTROL" => Some(Modifiers::CONTROL),
        "ALT" => Some(Modifiers::ALT),
        "SHIFT" => Some(Modifiers::SHIFT),
        "WIN" | "CMD" | "SUPER" | "META" => Some(Modifiers::SUPER),
        _ => None,
    }
}

/// Convert key string to global_hotkey Code
pub fn string_to_code(key: &str) -> Option<Code> {
    let key_upper = key.to_uppercase();
    match key_upper.as_str() {
        "A" => Some(Code::KeyA),
        "B" => Some(Code::KeyB),
        "C" => Some(Code::KeyC),
        "D" => Some(Code::KeyD),
        "E" => Some(Code::KeyE),
        "F" => Some(Code::KeyF),
        "G" => Some(Code::KeyG),
        "H" => Some(Code::KeyH),
        "I" => Some(Code::KeyI),
        "J" => Some(Code::KeyJ),
        "K" => Some(Code::KeyK),
        "L" => Some(Code::KeyL),
        "M" => Some(Code::KeyM),
        "N" => Some(Code::KeyN),
        "O" => Some(Code::KeyO),
        "P" => Some(Code::KeyP),
        "Q" => Some(Code::KeyQ),
        "R" => Some(Code::KeyR),
        "S" => Some(Code::KeyS),
        "T" => Some(Code::KeyT),
        "U" => Some(Code::KeyU),
        "V" => Some(Code::KeyV),
        "W" => Some(Code::KeyW),
        "X" => Some(Code::KeyX),
        "Y" => Some(Code::KeyY),
        "Z" => Some(Code::KeyZ),
        "0" => Some(Code::Digit0),
        "1" => Some(Code::Digit1),
        "2" => Some(Code::Digit2),
        "3" => Some(Code::Digit3),
        "4" => Some(Code::Digit4),
        "5" => Some(Code::Digit5),
        "6" => Some(Code::Digit6),
        "7" => Some(Code::Digit7),
        "8" => Some(Code::Digit8),
        "9" => Some(Code::Digit9),
        "F1" => Some(Code::F1),
        "F2" => Some(Code::F2),
        "F3" => Some(Code::F3),
        "F4" => Some(Code::F4),
        "F5" => Some(Code::F5),
        "F6" => Some(Code::F6),
        "F7" => Some(Code::F7),
        "F8" => Some(Code::F8),
        "F9" => Some(Code::F9),
        "F10" => Some(Code::F10),
        "F11" => Some(Code::F11),
        "F12" => Some(Code::F12),
        "ESC" | "ESCAPE" => Some(Code::Escape),
        "ENTER" | "RETURN" => Some(Code::Enter),
        "SPACE" => Some(Code::Space),
        "TAB" => Some(Code::Tab),
        "BACKSPACE" => Some(Code::Backspace),
        "DELETE" => Some(Code::Delete),
        "INSERT" => Some(Code::Insert),
        "HOME" => Some(Code::Home),
        "END" => Some(Code::End),
        "PGUP" | "PAGEUP" => Some(Code::PageUp),
        "PGDN" | "PAGEDOWN" => Some(Code::PageDown),
        "UP" => Some(Code::ArrowUp),
        "DOWN" => Some(Code::ArrowDown),
        "LEFT" => Some(Code::ArrowLeft),
        "RIGHT" => Some(Code::ArrowRight),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_key() {
        assert_eq!(parse_hotkey("F2").unwrap(), HotKey::new(None, Code::F2));
        assert_eq!(parse_hotkey(" f10 ").unwrap(), HotKey::new(None, Code::F10));
    }

    #[test]
    fn test_parse_with_modifiers() {
        let hotkey = parse_hotkey("ctrl + Shift + q").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyQ)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_hotkey(""), Err(HotkeyError::Empty));
        assert_eq!(
            parse_hotkey("ctrl+banana"),
            Err(HotkeyError::UnknownKey("banana".to_string()))
        );
        assert_eq!(
            parse_hotkey("ctrl+alt"),
            Err(HotkeyError::MissingKey("ctrl+alt".to_string()))
        );
        assert_eq!(
            parse_hotkey("a+b"),
            Err(HotkeyError::TooManyKeys("a+b".to_string()))
        );
    }
}
