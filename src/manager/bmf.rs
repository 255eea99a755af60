//! `^BMF` modify mini-language and the attribute vocabulary shared with `^BMC`
//!
//! `^BMF` data is a sequence of `%<code><value>` sub-commands, for example
//! `%T Hello%CF#FF0000%OP128`. A literal `%` inside a value is written `%%`.
//! Two letter codes are tried before one letter codes, so `%CF...` is always
//! a fill color and never a text starting with `F`.

use super::text::decode_unicode_hex;
use crate::panel::{
    text_effect, Button, ButtonInstance, Color, DrawOrder, Justification, Rect, StateSelection,
};
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing::{trace, warn};

/// Button attribute addressed by a two or one letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum AttrCode {
    #[strum(serialize = "T")]
    Text,
    #[strum(serialize = "B")]
    Bitmap,
    #[strum(serialize = "I")]
    Icon,
    #[strum(serialize = "J")]
    TextJustify,
    #[strum(serialize = "JB")]
    BitmapJustify,
    #[strum(serialize = "JI")]
    IconJustify,
    #[strum(serialize = "CB")]
    BorderColor,
    #[strum(serialize = "CF")]
    FillColor,
    #[strum(serialize = "CT")]
    TextColor,
    #[strum(serialize = "EC")]
    TextEffectColor,
    #[strum(serialize = "E")]
    TextEffect,
    #[strum(serialize = "F")]
    Font,
    #[strum(serialize = "OP")]
    Opacity,
    #[strum(serialize = "W")]
    WordWrap,
    #[strum(serialize = "R")]
    Rect,
    #[strum(serialize = "SO")]
    Sound,
    #[strum(serialize = "UN")]
    Unicode,
    #[strum(serialize = "UT")]
    Utf8,
    #[strum(serialize = "DO")]
    DrawOrder,
    #[strum(serialize = "GH")]
    LevelHigh,
    #[strum(serialize = "GL")]
    LevelLow,
    #[strum(serialize = "GN")]
    SliderName,
    #[strum(serialize = "GC")]
    SliderColor,
    #[strum(serialize = "LN")]
    BorderStyle,
    #[strum(serialize = "SF")]
    Focus,
    #[strum(serialize = "MK")]
    InputMask,
    #[strum(serialize = "ML")]
    MaxLength,
    #[strum(serialize = "EN")]
    Enable,
    #[strum(serialize = "SH")]
    Show,
}

impl AttrCode {
    /// Split the code off the front of a sub-command
    fn split(segment: &str) -> Option<(AttrCode, &str)> {
        if let (Some(code), Some(rest)) = (segment.get(..2), segment.get(2..)) {
            if let Ok(attr) = AttrCode::from_str(code) {
                return Some((attr, rest));
            }
        }
        let code = segment.get(..1)?;
        AttrCode::from_str(code).ok().map(|attr| (attr, &segment[1..]))
    }

    /// Code as used by `^BMC`, which also accepts its own legacy names
    pub fn from_copy_code(code: &str) -> Option<AttrCode> {
        let code = code.trim().to_ascii_uppercase();
        let attr = match code.as_str() {
            "BM" => AttrCode::Bitmap,
            "BR" | "LN" => AttrCode::BorderStyle,
            "EF" => AttrCode::TextEffect,
            "FT" => AttrCode::Font,
            "IC" => AttrCode::Icon,
            "JT" => AttrCode::TextJustify,
            "TX" => AttrCode::Text,
            "WW" => AttrCode::WordWrap,
            other => AttrCode::from_str(other).ok()?,
        };
        Some(attr)
    }

    /// Copy this attribute between two button states
    pub fn copy(&self, from: &ButtonInstance, to: &mut ButtonInstance) {
        match self {
            AttrCode::Text | AttrCode::Unicode | AttrCode::Utf8 => to.text = from.text.clone(),
            AttrCode::Bitmap => to.bitmap = from.bitmap.clone(),
            AttrCode::Icon => to.icon = from.icon,
            AttrCode::TextJustify => to.text_justification = from.text_justification,
            AttrCode::BitmapJustify => to.bitmap_justification = from.bitmap_justification,
            AttrCode::IconJustify => to.icon_justification = from.icon_justification,
            AttrCode::BorderColor => to.border_color = from.border_color,
            AttrCode::FillColor => to.fill_color = from.fill_color,
            AttrCode::TextColor => to.text_color = from.text_color,
            AttrCode::TextEffectColor => to.text_effect_color = from.text_effect_color,
            AttrCode::TextEffect => to.text_effect = from.text_effect.clone(),
            AttrCode::Font => to.font = from.font,
            AttrCode::Opacity => to.opacity = from.opacity,
            AttrCode::WordWrap => to.word_wrap = from.word_wrap,
            AttrCode::Sound => to.sound = from.sound.clone(),
            AttrCode::DrawOrder => to.draw_order = from.draw_order,
            AttrCode::BorderStyle => to.border_style = from.border_style.clone(),
            // button wide attributes are not per state
            _ => trace!("Attribute {} is not copied between states", self),
        }
    }
}

/// Which justification a `%J`, `%JB` or `%JI` sub-command sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyTarget {
    Text,
    Bitmap,
    Icon,
}

/// One parsed `^BMF` sub-command
#[derive(Debug, Clone, PartialEq)]
pub enum ModifyOp {
    Text(String),
    Bitmap(String),
    Icon(i32),
    Justify(JustifyTarget, Justification),
    BorderColor(Color),
    FillColor(Color),
    TextColor(Color),
    TextEffectColor(Color),
    TextEffect(String),
    Font(i32),
    Opacity(u8),
    WordWrap(bool),
    Rect(Rect),
    Sound(String),
    DrawOrder(DrawOrder),
    LevelHigh(i32),
    LevelLow(i32),
    SliderName(String),
    SliderColor(Color),
    BorderStyle(String),
    Focus(bool),
    InputMask(String),
    MaxLength(u16),
    Enable(bool),
    Show(bool),
}

/// Split `^BMF` data into raw sub-commands, resolving `%%`
fn segments(data: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Option<String> = None;
    let mut chars = data.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            if chars.peek() == Some(&'%') {
                chars.next();
                if let Some(segment) = current.as_mut() {
                    segment.push('%');
                }
                continue;
            }
            if let Some(segment) = current.take() {
                segments.push(segment);
            }
            current = Some(String::new());
        } else if let Some(segment) = current.as_mut() {
            segment.push(c);
        }
    }
    segments.extend(current);
    segments
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

fn parse_justify(value: &str) -> Option<Justification> {
    let mut fields = value.split(',').map(str::trim);
    let code: u8 = fields.next()?.parse().ok()?;
    let x = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let y = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    Justification::from_code(code, x, y)
}

fn parse_rect(value: &str) -> Option<Rect> {
    let edges: Vec<i32> = value
        .split(',')
        .map(|v| v.trim().parse().ok())
        .collect::<Option<_>>()?;
    match edges.as_slice() {
        [left, top, right, bottom] => Rect::from_edges(*left, *top, *right, *bottom),
        _ => None,
    }
}

impl ModifyOp {
    fn from_parts(code: AttrCode, value: &str) -> Option<ModifyOp> {
        let number = || value.trim().parse::<i32>().ok();
        let color = || Color::parse(value);
        Some(match code {
            AttrCode::Text | AttrCode::Utf8 => ModifyOp::Text(value.to_string()),
            AttrCode::Unicode => ModifyOp::Text(decode_unicode_hex(value)?),
            AttrCode::Bitmap => ModifyOp::Bitmap(value.to_string()),
            AttrCode::Icon => ModifyOp::Icon(number()?),
            AttrCode::TextJustify => ModifyOp::Justify(JustifyTarget::Text, parse_justify(value)?),
            AttrCode::BitmapJustify => {
                ModifyOp::Justify(JustifyTarget::Bitmap, parse_justify(value)?)
            }
            AttrCode::IconJustify => ModifyOp::Justify(JustifyTarget::Icon, parse_justify(value)?),
            AttrCode::BorderColor => ModifyOp::BorderColor(color()?),
            AttrCode::FillColor => ModifyOp::FillColor(color()?),
            AttrCode::TextColor => ModifyOp::TextColor(color()?),
            AttrCode::TextEffectColor => ModifyOp::TextEffectColor(color()?),
            AttrCode::TextEffect => ModifyOp::TextEffect(text_effect(value)?),
            AttrCode::Font => ModifyOp::Font(number()?),
            AttrCode::Opacity => ModifyOp::Opacity(value.trim().parse().ok()?),
            AttrCode::WordWrap => ModifyOp::WordWrap(parse_flag(value)?),
            AttrCode::Rect => ModifyOp::Rect(parse_rect(value)?),
            AttrCode::Sound => ModifyOp::Sound(value.to_string()),
            AttrCode::DrawOrder => ModifyOp::DrawOrder(DrawOrder::parse(value)?),
            AttrCode::LevelHigh => ModifyOp::LevelHigh(number()?),
            AttrCode::LevelLow => ModifyOp::LevelLow(number()?),
            AttrCode::SliderName => ModifyOp::SliderName(value.to_string()),
            AttrCode::SliderColor => ModifyOp::SliderColor(color()?),
            AttrCode::BorderStyle => {
                ModifyOp::BorderStyle(crate::panel::border_style(value)?)
            }
            AttrCode::Focus => ModifyOp::Focus(parse_flag(value)?),
            AttrCode::InputMask => ModifyOp::InputMask(value.to_string()),
            AttrCode::MaxLength => ModifyOp::MaxLength(value.trim().parse().ok()?),
            AttrCode::Enable => ModifyOp::Enable(parse_flag(value)?),
            AttrCode::Show => ModifyOp::Show(parse_flag(value)?),
        })
    }

    /// Parse `^BMF` data; unknown codes and bad values are logged and skipped
    pub fn parse(data: &str) -> Vec<ModifyOp> {
        let mut ops = Vec::new();
        for segment in segments(data) {
            let Some((code, value)) = AttrCode::split(&segment) else {
                warn!("⚠️ ^BMF: unknown code in '%{}', skipped", segment);
                continue;
            };
            match ModifyOp::from_parts(code, value) {
                Some(op) => ops.push(op),
                None => warn!("⚠️ ^BMF: invalid value '{}' for %{}, skipped", value, code),
            }
        }
        ops
    }

    /// Apply to the selected states of a button
    pub fn apply(&self, button: &mut Button, selection: &StateSelection) {
        match self {
            ModifyOp::Rect(rect) => button.rect = *rect,
            ModifyOp::LevelHigh(high) => button.range.high = *high,
            ModifyOp::LevelLow(low) => button.range.low = *low,
            ModifyOp::SliderName(name) => button.slider_name = name.clone(),
            ModifyOp::SliderColor(color) => button.slider_color = *color,
            ModifyOp::Focus(focused) => button.focused = *focused,
            ModifyOp::InputMask(mask) => button.input_mask = mask.clone(),
            ModifyOp::MaxLength(length) => button.max_length = *length,
            ModifyOp::Enable(enabled) => button.enabled = *enabled,
            ModifyOp::Show(visible) => button.visible = *visible,
            _ => {
                for instance in button.instances_mut(selection) {
                    self.apply_instance(instance);
                }
            }
        }
    }

    fn apply_instance(&self, instance: &mut ButtonInstance) {
        match self {
            ModifyOp::Text(text) => instance.text = text.clone(),
            ModifyOp::Bitmap(bitmap) => instance.bitmap = bitmap.clone(),
            ModifyOp::Icon(icon) => instance.icon = *icon,
            ModifyOp::Justify(JustifyTarget::Text, j) => instance.text_justification = *j,
            ModifyOp::Justify(JustifyTarget::Bitmap, j) => instance.bitmap_justification = *j,
            ModifyOp::Justify(JustifyTarget::Icon, j) => instance.icon_justification = *j,
            ModifyOp::BorderColor(color) => instance.border_color = *color,
            ModifyOp::FillColor(color) => instance.fill_color = *color,
            ModifyOp::TextColor(color) => instance.text_color = *color,
            ModifyOp::TextEffectColor(color) => instance.text_effect_color = *color,
            ModifyOp::TextEffect(effect) => instance.text_effect = effect.clone(),
            ModifyOp::Font(font) => instance.font = *font,
            ModifyOp::Opacity(opacity) => instance.opacity = *opacity,
            ModifyOp::WordWrap(wrap) => instance.word_wrap = *wrap,
            ModifyOp::Sound(sound) => instance.sound = sound.clone(),
            ModifyOp::DrawOrder(order) => instance.draw_order = *order,
            ModifyOp::BorderStyle(style) => instance.border_style = style.clone(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ButtonDef;

    #[test]
    fn test_parse_sequence() {
        let ops = ModifyOp::parse("%T100%% sure%CF#FF0000%OP128%J0,4,5");
        assert_eq!(
            ops,
            vec![
                ModifyOp::Text("100% sure".into()),
                ModifyOp::FillColor(Color::rgb(0xFF, 0, 0)),
                ModifyOp::Opacity(128),
                ModifyOp::Justify(JustifyTarget::Text, Justification::Absolute { x: 4, y: 5 }),
            ]
        );
    }

    #[test]
    fn test_two_letter_codes_win() {
        assert_eq!(AttrCode::split("JB5"), Some((AttrCode::BitmapJustify, "5")));
        assert_eq!(AttrCode::split("J5"), Some((AttrCode::TextJustify, "5")));
        assert_eq!(AttrCode::split("Thello"), Some((AttrCode::Text, "hello")));
        assert_eq!(AttrCode::split("XY1"), None);
    }

    #[test]
    fn test_unknown_and_bad_values_skipped() {
        let ops = ModifyOp::parse("%QQ1%OPnope%F3");
        assert_eq!(ops, vec![ModifyOp::Font(3)]);
        // text before the first % is not a sub-command
        assert_eq!(ModifyOp::parse("junk%W1"), vec![ModifyOp::WordWrap(true)]);
    }

    #[test]
    fn test_unicode_and_rect() {
        let ops = ModifyOp::parse("%UN00480069%R10,20,110,70");
        assert_eq!(ops[0], ModifyOp::Text("Hi".into()));
        assert_eq!(ops[1], ModifyOp::Rect(Rect::new(10, 20, 100, 50)));
    }

    #[test]
    fn test_apply_to_selected_states() {
        let mut button = Button::from_def(1, &ButtonDef { index: 1, ..ButtonDef::default() });
        let only_second = StateSelection::parse("2").unwrap();
        for op in ModifyOp::parse("%TOn%EN0") {
            op.apply(&mut button, &only_second);
        }
        assert_eq!(button.instances[0].text, "");
        assert_eq!(button.instances[1].text, "On");
        assert!(!button.enabled);
    }

    #[test]
    fn test_copy_codes() {
        assert_eq!(AttrCode::from_copy_code("tx"), Some(AttrCode::Text));
        assert_eq!(AttrCode::from_copy_code("CF"), Some(AttrCode::FillColor));
        assert_eq!(AttrCode::from_copy_code("ZZ"), None);
    }
}
