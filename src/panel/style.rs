//! Button and popup style vocabulary: types, feedback, justification,
//! border styles, text effects, show/hide effects and draw order

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of button, as declared in the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ButtonType {
    #[default]
    General,
    MultiStateGeneral,
    Bargraph,
    MultiStateBargraph,
    Joystick,
    TextInput,
    ComputerControl,
    TakeNote,
    SubPageView,
    ListView,
}

impl ButtonType {
    /// Buttons driven by LEVEL events
    pub fn is_level_driven(&self) -> bool {
        matches!(
            self,
            ButtonType::Bargraph | ButtonType::MultiStateBargraph | ButtonType::Joystick
        )
    }
}

/// Feedback type (`^BFB`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Feedback {
    None,
    #[default]
    Channel,
    #[strum(serialize = "Invert", serialize = "inverted_channel")]
    #[serde(alias = "invert")]
    InvertedChannel,
    On,
    Momentary,
    Blink,
}

/// Keypad-style placement of text, bitmap or icon
///
/// Codes 1-9 follow a numeric keypad read top-left to bottom-right; code 0
/// is an absolute position relative to the button origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Justification {
    Absolute { x: i32, y: i32 },
    TopLeft,
    TopMiddle,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

impl Justification {
    pub fn from_code(code: u8, x: i32, y: i32) -> Option<Self> {
        Some(match code {
            0 => Justification::Absolute { x, y },
            1 => Justification::TopLeft,
            2 => Justification::TopMiddle,
            3 => Justification::TopRight,
            4 => Justification::CenterLeft,
            5 => Justification::Center,
            6 => Justification::CenterRight,
            7 => Justification::BottomLeft,
            8 => Justification::BottomMiddle,
            9 => Justification::BottomRight,
            _ => return None,
        })
    }

    pub fn code(&self) -> u8 {
        match self {
            Justification::Absolute { .. } => 0,
            Justification::TopLeft => 1,
            Justification::TopMiddle => 2,
            Justification::TopRight => 3,
            Justification::CenterLeft => 4,
            Justification::Center => 5,
            Justification::CenterRight => 6,
            Justification::BottomLeft => 7,
            Justification::BottomMiddle => 8,
            Justification::BottomRight => 9,
        }
    }

    /// Absolute offsets, zero for keypad positions
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Justification::Absolute { x, y } => (*x, *y),
            _ => (0, 0),
        }
    }
}

/// Border style names addressable by number (`^BOR`)
const BORDER_STYLES: &[&str] = &[
    "None",
    "None",
    "Single Line",
    "Double Line",
    "Quad Line",
    "Circle 15",
    "Circle 25",
    "Single Line",
    "Double Line",
    "Quad Line",
    "Picture Frame",
    "Picture Frame",
    "Double Line",
    "Bevel-S",
    "Bevel-M",
    "Circle 15",
    "Circle 25",
    "Neon Inactive-S",
    "Neon Active-S",
    "Diamond 55",
    "Diamond 56",
];

/// Resolve a border style given either its number or its name
pub fn border_style(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<usize>() {
        Ok(number) => BORDER_STYLES.get(number).map(|s| s.to_string()),
        Err(_) => Some(value.to_string()),
    }
}

/// Text effect names addressable by index (`^TEF`)
const TEXT_EFFECTS: &[&str] = &[
    "None",
    "Outline-S",
    "Outline-M",
    "Outline-L",
    "Outline-X",
    "Glow-S",
    "Glow-M",
    "Glow-L",
    "Glow-X",
    "Soft Drop Shadow 1",
    "Soft Drop Shadow 2",
    "Soft Drop Shadow 3",
    "Medium Drop Shadow 1",
    "Medium Drop Shadow 2",
    "Hard Drop Shadow 1",
    "Hard Drop Shadow 2",
];

/// Resolve a text effect given either its index or its name
pub fn text_effect(value: &str) -> Option<String> {
    let value = value.trim();
    match value.parse::<usize>() {
        Ok(index) => TEXT_EFFECTS.get(index).map(|s| s.to_string()),
        Err(_) if !value.is_empty() => TEXT_EFFECTS
            .iter()
            .find(|name| name.eq_ignore_ascii_case(value))
            .map(|s| s.to_string())
            .or_else(|| Some(value.to_string())),
        Err(_) => None,
    }
}

/// Popup show/hide animation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ShowEffect {
    #[default]
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "fade")]
    Fade,
    #[strum(serialize = "slide from left")]
    SlideLeft,
    #[strum(serialize = "slide from right")]
    SlideRight,
    #[strum(serialize = "slide from top")]
    SlideTop,
    #[strum(serialize = "slide from bottom")]
    SlideBottom,
    #[strum(serialize = "slide from left fade")]
    SlideLeftFade,
    #[strum(serialize = "slide from right fade")]
    SlideRightFade,
    #[strum(serialize = "slide from top fade")]
    SlideTopFade,
    #[strum(serialize = "slide from bottom fade")]
    SlideBottomFade,
}

/// Show or hide effect of a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Effect {
    #[serde(default)]
    pub kind: ShowEffect,
    /// Duration in tenths of a second
    #[serde(default)]
    pub time: u16,
    /// End position of the animation
    #[serde(default)]
    pub position: Option<(i32, i32)>,
}

/// Layers drawn for a button, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Fill,
    Bitmap,
    Icon,
    Text,
    Border,
}

/// Button draw order (`^BDO`), encoded as five two-digit layer numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOrder(pub [Layer; 5]);

impl Default for DrawOrder {
    fn default() -> Self {
        DrawOrder([Layer::Fill, Layer::Bitmap, Layer::Icon, Layer::Text, Layer::Border])
    }
}

impl DrawOrder {
    /// Parse `0102030405`; every layer must appear exactly once
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.len() != 10 || !code.is_ascii() {
            return None;
        }
        let mut layers = [Layer::Fill; 5];
        let mut seen = [false; 5];
        for (slot, chunk) in code.as_bytes().chunks(2).enumerate() {
            let number: usize = std::str::from_utf8(chunk).ok()?.parse().ok()?;
            if !(1..=5).contains(&number) || seen[number - 1] {
                return None;
            }
            seen[number - 1] = true;
            layers[slot] = match number {
                1 => Layer::Fill,
                2 => Layer::Bitmap,
                3 => Layer::Icon,
                4 => Layer::Text,
                _ => Layer::Border,
            };
        }
        Some(DrawOrder(layers))
    }

    pub fn code(&self) -> String {
        self.0
            .iter()
            .map(|layer| match layer {
                Layer::Fill => "01",
                Layer::Bitmap => "02",
                Layer::Icon => "03",
                Layer::Text => "04",
                Layer::Border => "05",
            })
            .collect()
    }
}

/// Action bound to a button and performed on release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum FlipAction {
    #[strum(serialize = "Stan")]
    Standard,
    #[strum(serialize = "Prev")]
    Previous,
    #[strum(serialize = "Show")]
    Show,
    #[strum(serialize = "Hide")]
    Hide,
    #[strum(serialize = "Togg")]
    Toggle,
    #[strum(serialize = "ClearG")]
    ClearGroup,
    #[strum(serialize = "ClearP")]
    ClearPage,
    #[strum(serialize = "ClearA")]
    ClearAll,
}

/// One page-flip action of a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFlip {
    pub action: FlipAction,
    #[serde(default)]
    pub target: String,
    /// Password level 1-4 (`@PWD`) guarding the flip, 0 for none
    #[serde(default)]
    pub password: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_justification_codes() {
        for code in 1..=9u8 {
            assert_eq!(Justification::from_code(code, 0, 0).unwrap().code(), code);
        }
        let abs = Justification::from_code(0, 12, -4).unwrap();
        assert_eq!(abs.offset(), (12, -4));
        assert!(Justification::from_code(10, 0, 0).is_none());
    }

    #[test]
    fn test_draw_order() {
        let order = DrawOrder::parse("0504030201").unwrap();
        assert_eq!(order.0[0], Layer::Border);
        assert_eq!(order.code(), "0504030201");
        assert!(DrawOrder::parse("0101030405").is_none());
        assert!(DrawOrder::parse("01020304").is_none());
        assert_eq!(DrawOrder::default().code(), "0102030405");
    }

    #[test]
    fn test_named_lookups() {
        assert_eq!(border_style("3").as_deref(), Some("Double Line"));
        assert_eq!(border_style("Bevel-M").as_deref(), Some("Bevel-M"));
        assert_eq!(border_style("99"), None);
        assert_eq!(text_effect("1").as_deref(), Some("Outline-S"));
        assert_eq!(text_effect("glow-s").as_deref(), Some("Glow-S"));
        assert_eq!(Feedback::from_str("invert").unwrap(), Feedback::InvertedChannel);
        assert_eq!(Feedback::from_str("MOMENTARY").unwrap(), Feedback::Momentary);
        assert_eq!(
            ShowEffect::from_str("Slide from Left Fade").unwrap(),
            ShowEffect::SlideLeftFade
        );
        assert_eq!(FlipAction::from_str("togg").unwrap(), FlipAction::Toggle);
    }
}
