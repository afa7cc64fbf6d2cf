//! Scan-code names for keyboard binds.
//!
//! The interception driver reports US keyboard Set 1 make codes with the
//! extended (E0) prefix carried separately, so a bind is identified by the
//! 8-bit code alone.
//! Reference: https://www.win.tue.nl/~aeb/linux/kbd/scancodes-1.html
//!
//! # Supported Names
//!
//! ## Letters
//! `a-z` (case-insensitive)
//!
//! ## Numbers
//! `0-9` (top row)
//!
//! ## Function Keys
//! `f1` through `f12`
//!
//! ## Modifiers
//! - `shift`/`leftshift`/`lshift`, `rightshift`/`rshift`
//! - `ctrl`/`control`/`leftctrl`/`lctrl`
//! - `alt`/`leftalt`/`lalt`
//!
//! ## Numpad
//! `numpad0-9`/`kp0-9`, `numpadmultiply`/`kp*`, `numpadadd`/`kp+`,
//! `numpadsubtract`/`kp-`, `numpaddecimal`/`kp.`
//!
//! ## Special Keys
//! `escape`/`esc`, `tab`, `capslock`/`caps`, `enter`/`return`,
//! `backspace`/`back`, `space`/`spacebar`
//!
//! ## Punctuation
//! `-`, `=`, `[`, `]`, `;`, `'`, `` ` ``/`grave`/`tilde`, `\`, `,`, `.`, `/`
//!
//! Any other key can be bound by its raw code written as hex (`0x56`).
//! Extended keys (arrows, right ctrl/alt, insert block) share their low byte
//! with the numpad keys and are bound that way.

use super::types::KeyCode;

/// Name -> code table. The first name listed for a code is its canonical name.
const KEY_NAMES: &[(&str, u8)] = &[
    // Letters A-Z (QWERTY layout positions)
    ("a", 0x1E), ("b", 0x30), ("c", 0x2E), ("d", 0x20), ("e", 0x12),
    ("f", 0x21), ("g", 0x22), ("h", 0x23), ("i", 0x17), ("j", 0x24),
    ("k", 0x25), ("l", 0x26), ("m", 0x32), ("n", 0x31), ("o", 0x18),
    ("p", 0x19), ("q", 0x10), ("r", 0x13), ("s", 0x1F), ("t", 0x14),
    ("u", 0x16), ("v", 0x2F), ("w", 0x11), ("x", 0x2D), ("y", 0x15),
    ("z", 0x2C),

    // Numbers 0-9 (top row)
    ("1", 0x02), ("2", 0x03), ("3", 0x04), ("4", 0x05), ("5", 0x06),
    ("6", 0x07), ("7", 0x08), ("8", 0x09), ("9", 0x0A), ("0", 0x0B),

    // Function keys F1-F12
    ("f1", 0x3B), ("f2", 0x3C), ("f3", 0x3D), ("f4", 0x3E),
    ("f5", 0x3F), ("f6", 0x40), ("f7", 0x41), ("f8", 0x42),
    ("f9", 0x43), ("f10", 0x44), ("f11", 0x57), ("f12", 0x58),

    // Modifiers
    ("leftshift", 0x2A), ("shift", 0x2A), ("lshift", 0x2A),
    ("rightshift", 0x36), ("rshift", 0x36),
    ("leftctrl", 0x1D), ("ctrl", 0x1D), ("control", 0x1D), ("lctrl", 0x1D),
    ("leftalt", 0x38), ("alt", 0x38), ("lalt", 0x38),

    // Numpad
    ("numpad7", 0x47), ("kp7", 0x47),
    ("numpad8", 0x48), ("kp8", 0x48),
    ("numpad9", 0x49), ("kp9", 0x49),
    ("numpadsubtract", 0x4A), ("kp-", 0x4A),
    ("numpad4", 0x4B), ("kp4", 0x4B),
    ("numpad5", 0x4C), ("kp5", 0x4C),
    ("numpad6", 0x4D), ("kp6", 0x4D),
    ("numpadadd", 0x4E), ("kp+", 0x4E),
    ("numpad1", 0x4F), ("kp1", 0x4F),
    ("numpad2", 0x50), ("kp2", 0x50),
    ("numpad3", 0x51), ("kp3", 0x51),
    ("numpad0", 0x52), ("kp0", 0x52),
    ("numpaddecimal", 0x53), ("kp.", 0x53),
    ("numpadmultiply", 0x37), ("kp*", 0x37),

    // Special keys
    ("escape", 0x01), ("esc", 0x01),
    ("tab", 0x0F),
    ("capslock", 0x3A), ("caps", 0x3A),
    ("enter", 0x1C), ("return", 0x1C),
    ("backspace", 0x0E), ("back", 0x0E),
    ("space", 0x39), ("spacebar", 0x39),

    // Punctuation and symbols
    ("minus", 0x0C), ("-", 0x0C),
    ("equals", 0x0D), ("=", 0x0D),
    ("leftbracket", 0x1A), ("[", 0x1A),
    ("rightbracket", 0x1B), ("]", 0x1B),
    ("semicolon", 0x27), (";", 0x27),
    ("apostrophe", 0x28), ("'", 0x28),
    ("grave", 0x29), ("`", 0x29), ("tilde", 0x29),
    ("backslash", 0x2B), ("\\", 0x2B),
    ("comma", 0x33), (",", 0x33),
    ("period", 0x34), (".", 0x34),
    ("slash", 0x35), ("/", 0x35),
];

/// Parse a key name (case-insensitive) or a raw hex code into a scan code.
pub fn parse_key_name(name: &str) -> Result<KeyCode, String> {
    let n = name.trim().to_ascii_lowercase();

    if let Some(hex) = n.strip_prefix("0x") {
        let code = u8::from_str_radix(hex, 16)
            .map_err(|_| format!("scan code '{}' is outside the 8-bit range", name))?;
        if code == 0 {
            return Err("scan code 0x00 is reserved".to_string());
        }
        return Ok(KeyCode(code));
    }

    KEY_NAMES
        .iter()
        .find(|(key, _)| *key == n)
        .map(|(_, code)| KeyCode(*code))
        .ok_or_else(|| format!("Unsupported key: {}", name))
}

/// Canonical name for a scan code, if it has one.
pub fn key_name(code: KeyCode) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, c)| *c == code.0)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_letters() {
        assert_eq!(parse_key_name("a").unwrap(), KeyCode(0x1E));
        assert_eq!(parse_key_name("W").unwrap(), KeyCode(0x11));
        assert_eq!(parse_key_name(" z ").unwrap(), KeyCode(0x2C));
    }

    #[test]
    fn parse_numbers_and_function_keys() {
        assert_eq!(parse_key_name("0").unwrap(), KeyCode(0x0B));
        assert_eq!(parse_key_name("1").unwrap(), KeyCode(0x02));
        assert_eq!(parse_key_name("f1").unwrap(), KeyCode(0x3B));
        assert_eq!(parse_key_name("F12").unwrap(), KeyCode(0x58));
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(parse_key_name("shift").unwrap(), parse_key_name("lshift").unwrap());
        assert_eq!(parse_key_name("esc").unwrap(), KeyCode(0x01));
        assert_eq!(parse_key_name("`").unwrap(), parse_key_name("grave").unwrap());
        assert_eq!(parse_key_name("kp+").unwrap(), KeyCode(0x4E));
    }

    #[test]
    fn parse_raw_hex() {
        assert_eq!(parse_key_name("0x56").unwrap(), KeyCode(0x56));
        assert_eq!(parse_key_name("0xFF").unwrap(), KeyCode(0xFF));
        assert!(parse_key_name("0x100").is_err());
        assert!(parse_key_name("0x00").is_err());
        assert!(parse_key_name("0xzz").is_err());
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_key_name("invalid_key").is_err());
        assert!(parse_key_name("").is_err());
        assert!(parse_key_name("up").is_err());
    }

    #[test]
    fn canonical_names() {
        assert_eq!(key_name(KeyCode(0x2A)), Some("leftshift"));
        assert_eq!(key_name(KeyCode(0x29)), Some("grave"));
        assert_eq!(key_name(KeyCode(0x56)), None);
        assert_eq!(KeyCode(0x11).to_string(), "w");
        assert_eq!(KeyCode(0x56).to_string(), "0x56");
    }
}
