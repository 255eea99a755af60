//! Get commands (`?TXT`, `?BCF`, ...), answered with custom events

use super::appearance::states;
use super::PageManager;
use crate::error::CommandResult;
use crate::panel::{ButtonInstance, Color, Justification};
use crate::protocol::{CommandArgs, CustomEvent, Message, OutboundCommand};
use tracing::trace;

pub const EVENT_TEXT: u16 = 1001;
pub const EVENT_BITMAP: u16 = 1002;
pub const EVENT_ICON: u16 = 1003;
pub const EVENT_TEXT_JUSTIFY: u16 = 1004;
pub const EVENT_BITMAP_JUSTIFY: u16 = 1005;
pub const EVENT_ICON_JUSTIFY: u16 = 1006;
pub const EVENT_FONT: u16 = 1007;
pub const EVENT_TEXT_EFFECT: u16 = 1008;
pub const EVENT_TEXT_EFFECT_COLOR: u16 = 1009;
pub const EVENT_WORD_WRAP: u16 = 1010;
pub const EVENT_BORDER_COLOR: u16 = 1011;
pub const EVENT_FILL_COLOR: u16 = 1012;
pub const EVENT_TEXT_COLOR: u16 = 1013;
pub const EVENT_BORDER_STYLE: u16 = 1014;
pub const EVENT_OPACITY: u16 = 1015;

/// Payload of a reply before the instance and type are filled in
#[derive(Default)]
struct Reply {
    value1: i32,
    value2: i32,
    value3: i32,
    text: String,
}

impl Reply {
    fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    fn number(value: i32) -> Self {
        Self {
            value2: value,
            ..Self::default()
        }
    }

    fn color(color: Color) -> Self {
        Self::text(&color.to_hex())
    }

    fn justification(justification: Justification) -> Self {
        let (x, y) = justification.offset();
        Self {
            value1: y,
            value2: justification.code() as i32,
            value3: x,
            text: String::new(),
        }
    }
}

/// Send one reply per (button, selected state)
fn reply<F>(pm: &mut PageManager, args: &CommandArgs, event_type: u16, read: F) -> CommandResult
where
    F: Fn(&ButtonInstance) -> Reply,
{
    args.require(1)?;
    let selection = states(args, 0)?;
    let handles = pm.resolve_args(args)?;

    let mut replies = Vec::new();
    for handle in handles {
        let Some(button) = pm.button(handle) else {
            continue;
        };
        let (port, channel) = button
            .address
            .map(|a| (a.port, a.code))
            .unwrap_or((args.port, handle.index()));
        for index in button.selected(&selection) {
            let instance = &button.instances[index];
            let payload = read(instance);
            let event = CustomEvent {
                instance: instance.number,
                value1: payload.value1,
                value2: payload.value2,
                value3: payload.value3,
                text: payload.text,
                event_type,
            };
            replies.push(OutboundCommand::new(port, channel, Message::Custom(event)));
        }
    }

    trace!("{} sends {} replies", args.mnemonic, replies.len());
    for command in replies {
        pm.send(command);
    }
    Ok(())
}

pub(super) fn text(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_TEXT, |i| Reply {
        value1: i.text.chars().count() as i32,
        ..Reply::text(&i.text)
    })
}

pub(super) fn bitmap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_BITMAP, |i| Reply::text(&i.bitmap))
}

pub(super) fn icon(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_ICON, |i| Reply::number(i.icon))
}

pub(super) fn justify_text(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_TEXT_JUSTIFY, |i| Reply::justification(i.text_justification))
}

pub(super) fn justify_bitmap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_BITMAP_JUSTIFY, |i| Reply::justification(i.bitmap_justification))
}

pub(super) fn justify_icon(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_ICON_JUSTIFY, |i| Reply::justification(i.icon_justification))
}

pub(super) fn font(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_FONT, |i| Reply::number(i.font))
}

pub(super) fn text_effect(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_TEXT_EFFECT, |i| Reply::text(&i.text_effect))
}

pub(super) fn text_effect_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_TEXT_EFFECT_COLOR, |i| Reply::color(i.text_effect_color))
}

pub(super) fn word_wrap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_WORD_WRAP, |i| Reply::number(i.word_wrap as i32))
}

pub(super) fn border_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_BORDER_COLOR, |i| Reply::color(i.border_color))
}

pub(super) fn fill_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_FILL_COLOR, |i| Reply::color(i.fill_color))
}

pub(super) fn text_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_TEXT_COLOR, |i| Reply::color(i.text_color))
}

pub(super) fn border_style(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_BORDER_STYLE, |i| Reply::text(&i.border_style))
}

pub(super) fn opacity(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    reply(pm, args, EVENT_OPACITY, |i| Reply::number(i.opacity as i32))
}
