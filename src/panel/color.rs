//! RGBA colors as sent by the controller (`#RRGGBB`, `RRGGBBAA`, names)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::rgb(0x00, 0x00, 0x00)),
    ("white", Color::rgb(0xFF, 0xFF, 0xFF)),
    ("red", Color::rgb(0xFF, 0x00, 0x00)),
    ("green", Color::rgb(0x00, 0xFF, 0x00)),
    ("blue", Color::rgb(0x00, 0x00, 0xFF)),
    ("yellow", Color::rgb(0xFF, 0xFF, 0x00)),
    ("cyan", Color::rgb(0x00, 0xFF, 0xFF)),
    ("magenta", Color::rgb(0xFF, 0x00, 0xFF)),
    ("orange", Color::rgb(0xFF, 0x80, 0x00)),
    ("purple", Color::rgb(0x80, 0x00, 0x80)),
    ("grey", Color::rgb(0x80, 0x80, 0x80)),
    ("gray", Color::rgb(0x80, 0x80, 0x80)),
    ("transparent", Color::TRANSPARENT),
];

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Parse `#RRGGBB`, `RRGGBB`, `#RRGGBBAA` or a color name
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(named) = NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(text))
        {
            return Some(named.1);
        }

        let digits = text.strip_prefix('#').unwrap_or(text);
        if !(digits.len() == 6 || digits.len() == 8) {
            return None;
        }
        let bytes = hex::decode(digits).ok()?;
        Some(Self {
            r: bytes[0],
            g: bytes[1],
            b: bytes[2],
            a: bytes.get(3).copied().unwrap_or(0xFF),
        })
    }

    /// Hex form without `#`; alpha is appended only when not opaque
    pub fn to_hex(&self) -> String {
        if self.a == 0xFF {
            format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::TRANSPARENT
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s).ok_or_else(|| format!("invalid color '{}'", s))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse("FF0000"), Some(Color::rgb(0xFF, 0, 0)));
        assert_eq!(Color::parse("#00ff00"), Some(Color::rgb(0, 0xFF, 0)));
        assert_eq!(
            Color::parse("#0000FF80"),
            Some(Color { r: 0, g: 0, b: 0xFF, a: 0x80 })
        );
        assert_eq!(Color::parse("Red"), Some(Color::rgb(0xFF, 0, 0)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("zzzzzz"), None);
    }

    #[test]
    fn test_hex_output_keeps_controller_form() {
        assert_eq!(Color::parse("FF0000").unwrap().to_hex(), "FF0000");
        assert_eq!(Color::parse("#11223344").unwrap().to_hex(), "11223344");
    }
}
