//! Button appearance and behavior commands
//!
//! All handlers here are addressed: the first field is the address range
//! list, most take a state range list as their first parameter.

use super::{PageManager, TimerRequest};
use crate::error::{CommandError, CommandResult};
use crate::panel::{
    border_style, text_effect as effect_name, Animation, Button, ButtonHandle, ButtonInstance,
    Color, DrawOrder, Feedback, FlipAction, Justification, PageFlip, Rect, StateSelection,
};
use crate::protocol::{CommandArgs, Message, OutboundCommand};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, trace};

// ============================================================================
// Parameter helpers
// ============================================================================

/// State range list at parameter `index`
pub(super) fn states(args: &CommandArgs, index: usize) -> CommandResult<StateSelection> {
    let raw = args.text(index);
    StateSelection::parse(raw)
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, raw, "state range list"))
}

/// `0`/`1` flag at parameter `index`
pub(super) fn flag(args: &CommandArgs, index: usize) -> CommandResult<bool> {
    let value: u8 = args.number(index)?;
    Ok(value != 0)
}

fn color(args: &CommandArgs, index: usize) -> CommandResult<Color> {
    let raw = args.text(index);
    Color::parse(raw).ok_or_else(|| CommandError::invalid(&args.mnemonic, raw, "color"))
}

fn justification(args: &CommandArgs, index: usize) -> CommandResult<Justification> {
    let code: u8 = args.number(index)?;
    let x: i32 = args.number_or(index + 1, 0)?;
    let y: i32 = args.number_or(index + 2, 0)?;
    Justification::from_code(code, x, y)
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, args.text(index), "justification 0-9"))
}

/// Apply `edit` to the selected states of every addressed button
fn edit_states<F>(pm: &mut PageManager, args: &CommandArgs, edit: F) -> CommandResult
where
    F: Fn(&mut ButtonInstance),
{
    let selection = states(args, 0)?;
    let handles = pm.resolve_args(args)?;
    pm.update_buttons(&handles, |button| {
        button.instances_mut(&selection).for_each(|instance| edit(instance));
        Ok(())
    })
}

/// Apply `edit` to every addressed button
fn edit_buttons<F>(pm: &mut PageManager, args: &CommandArgs, edit: F) -> CommandResult
where
    F: Fn(&mut Button),
{
    let handles = pm.resolve_args(args)?;
    pm.update_buttons(&handles, |button| {
        edit(button);
        Ok(())
    })
}

// ============================================================================
// Colors and styles
// ============================================================================

pub(super) fn border_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = color(args, 1)?;
    edit_states(pm, args, |i| i.border_color = value)
}

pub(super) fn fill_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = color(args, 1)?;
    edit_states(pm, args, |i| i.fill_color = value)
}

pub(super) fn text_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = color(args, 1)?;
    edit_states(pm, args, |i| i.text_color = value)
}

pub(super) fn text_effect_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = color(args, 1)?;
    edit_states(pm, args, |i| i.text_effect_color = value)
}

/// `^BOR-<addr>,<style>` sets every state
pub(super) fn border_style_all(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let style = border_style(args.text(0))
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, args.text(0), "border style"))?;
    edit_buttons(pm, args, |button| {
        for instance in button.instances.iter_mut() {
            instance.border_style = style.clone();
        }
    })
}

pub(super) fn border_style_states(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let style = border_style(args.text(1))
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, args.text(1), "border style"))?;
    edit_states(pm, args, |i| i.border_style = style.clone())
}

pub(super) fn font(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let font: i32 = args.number(1)?;
    edit_states(pm, args, |i| i.font = font)
}

pub(super) fn icon(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let icon: i32 = args.number(1)?;
    edit_states(pm, args, |i| i.icon = icon)
}

/// `^BMP-<addr>,<states>,<bitmap>[,<justification>,<x>,<y>]`
pub(super) fn bitmap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let name = args.text(1).to_string();
    let justify = match args.param(2).filter(|p| !p.trim().is_empty()) {
        Some(_) => Some(justification(args, 2)?),
        None => None,
    };
    edit_states(pm, args, |i| {
        i.bitmap = name.clone();
        if let Some(justify) = justify {
            i.bitmap_justification = justify;
        }
    })
}

/// `^BBR-<addr>,<states>,<resource>` shows a dynamic resource as bitmap
pub(super) fn resource_bitmap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let name = args.text(1).to_string();
    if !pm.resources.contains_key(&name) {
        debug!("^BBR: resource '{}' is not registered yet", name);
    }
    edit_states(pm, args, |i| i.bitmap = name.clone())
}

pub(super) fn opacity(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let opacity: u8 = args.number(1)?;
    edit_states(pm, args, |i| i.opacity = opacity)
}

pub(super) fn word_wrap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let wrap = flag(args, 1)?;
    edit_states(pm, args, |i| i.word_wrap = wrap)
}

pub(super) fn text_effect(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let effect = effect_name(args.text(1))
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, args.text(1), "text effect"))?;
    edit_states(pm, args, |i| i.text_effect = effect.clone())
}

pub(super) fn justify_text(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = justification(args, 1)?;
    edit_states(pm, args, |i| i.text_justification = value)
}

pub(super) fn justify_bitmap(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = justification(args, 1)?;
    edit_states(pm, args, |i| i.bitmap_justification = value)
}

pub(super) fn justify_icon(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = justification(args, 1)?;
    edit_states(pm, args, |i| i.icon_justification = value)
}

/// `^BDO-<addr>,<states>,<1-5 as five two digit numbers>`
pub(super) fn draw_order(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let order = DrawOrder::parse(args.text(1))
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, args.text(1), "draw order"))?;
    edit_states(pm, args, |i| i.draw_order = order)
}

pub(super) fn sound(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let file = args.text(1).to_string();
    edit_states(pm, args, |i| i.sound = file.clone())
}

pub(super) fn marquee_speed(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let speed: u8 = args.number(0)?;
    edit_buttons(pm, args, |button| {
        button.instances.iter_mut().for_each(|i| i.marquee_speed = speed.min(10));
    })
}

// ============================================================================
// Behavior
// ============================================================================

/// `^BFB-<addr>,<None|Channel|Invert|On|Momentary|Blink>`
pub(super) fn feedback(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let raw = args.text(0).trim();
    let value = Feedback::from_str(raw)
        .map_err(|_| CommandError::invalid(&args.mnemonic, raw, "feedback type"))?;
    edit_buttons(pm, args, |button| button.feedback = value)
}

pub(super) fn input_mask(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let mask = args.text(0).to_string();
    edit_buttons(pm, args, |button| button.input_mask = mask.clone())
}

pub(super) fn max_length(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let length: u16 = args.number(0)?;
    edit_buttons(pm, args, |button| button.max_length = length)
}

/// `^BSP-<addr>,<left>,<top>,<right>,<bottom>`
pub(super) fn size_position(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(4)?;
    let rect = Rect::from_edges(args.number(0)?, args.number(1)?, args.number(2)?, args.number(3)?)
        .ok_or_else(|| {
            CommandError::invalid(&args.mnemonic, args.text(2), "right/bottom before left/top")
        })?;
    edit_buttons(pm, args, |button| button.rect = rect)
}

pub(super) fn volume(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let volume: u8 = args.number(0)?;
    edit_buttons(pm, args, |button| button.volume = volume.min(100))
}

pub(super) fn enable(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let enabled = flag(args, 0)?;
    edit_buttons(pm, args, |button| button.enabled = enabled)
}

pub(super) fn show(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let visible = flag(args, 0)?;
    let handles = pm.resolve_args(args)?;
    pm.update_buttons(&handles, |button| {
        button.visible = visible;
        Ok(())
    })?;
    for handle in handles {
        if pm.is_displayed(handle) {
            pm.surface.set_visible(handle, visible);
        }
    }
    Ok(())
}

pub(super) fn video(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let video = flag(args, 1)?;
    edit_buttons(pm, args, |button| button.video = video)
}

pub(super) fn focus(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let focused = flag(args, 0)?;
    edit_buttons(pm, args, |button| button.focused = focused)
}

/// `^BSM-<addr>` sends the text of each button back to the controller
pub(super) fn submit_text(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let handles = pm.resolve_args(args)?;
    for handle in handles {
        let Some(button) = pm.button(handle) else {
            continue;
        };
        let (port, channel) = button
            .address
            .map(|a| (a.port, a.code))
            .unwrap_or((args.port, handle.index()));
        let text = button.current().text.clone();
        pm.send(OutboundCommand::new(port, channel, Message::String(text)));
    }
    Ok(())
}

/// `^ANI-<addr>,<start state>,<end state>,<time>`
pub(super) fn animate(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(3)?;
    let from: u16 = args.number(0)?;
    let to: u16 = args.number(1)?;
    let time: u16 = args.number(2)?;
    if from == 0 || to == 0 {
        return Err(CommandError::invalid(&args.mnemonic, args.text(0), "states start at 1"));
    }

    let handles = pm.resolve_args(args)?;
    for handle in handles {
        pm.animation_generation += 1;
        let generation = pm.animation_generation;
        let animation = Animation { from, to, time, current: from, generation };
        if let Some(button) = pm.button_mut(handle) {
            button.animation = Some(animation);
            button.set_active(from as usize - 1);
        }
        pm.display(handle);
        if from != to {
            pm.schedule(TimerRequest::Animation {
                handle,
                generation,
                delay: Duration::from_millis(animation.step_interval_ms()),
            });
        }
    }
    Ok(())
}

impl PageManager {
    /// One animation step; stale generations are ignored
    pub(crate) fn step_animation(&mut self, handle: ButtonHandle, generation: u64) {
        let Some(button) = self.button_mut(handle) else {
            return;
        };
        let Some(mut animation) = button.animation.filter(|a| a.generation == generation) else {
            return;
        };
        if animation.advance() {
            button.set_active(animation.current as usize - 1);
        }
        let finished = animation.current == animation.to;
        button.animation = (!finished).then_some(animation);
        trace!("{} animation at state {}", handle, animation.current);
        self.display(handle);

        if !finished {
            self.schedule(TimerRequest::Animation {
                handle,
                generation,
                delay: Duration::from_millis(animation.step_interval_ms()),
            });
        }
    }
}

// ============================================================================
// Page flips
// ============================================================================

fn page_flip_arg(args: &CommandArgs) -> CommandResult<PageFlip> {
    let raw = args.text(0).trim();
    let action = FlipAction::from_str(raw)
        .map_err(|_| CommandError::invalid(&args.mnemonic, raw, "page flip action"))?;
    Ok(PageFlip {
        action,
        target: args.text(1).trim().to_string(),
        password: 0,
    })
}

/// `^APF-<addr>,<action>,<target>`
pub(super) fn page_flip_add(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let flip = page_flip_arg(args)?;
    edit_buttons(pm, args, |button| {
        if !button.page_flips.contains(&flip) {
            button.page_flips.push(flip.clone());
        }
    })
}

pub(super) fn page_flip_clear(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    edit_buttons(pm, args, |button| button.page_flips.clear())
}

pub(super) fn page_flip_delete(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let flip = page_flip_arg(args)?;
    edit_buttons(pm, args, |button| {
        button
            .page_flips
            .retain(|f| !(f.action == flip.action && f.target.eq_ignore_ascii_case(&flip.target)))
    })
}

// ============================================================================
// Bargraphs and joysticks
// ============================================================================

pub(super) fn bargraph_drag_increment(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let step: i32 = args.number(0)?;
    edit_buttons(pm, args, |button| button.range.drag_increment = step)
}

/// `^GIV-<addr>,<0|1>`; joysticks take 0-3 (x, y or both inverted)
pub(super) fn bargraph_invert(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let invert: u8 = args.number(0)?;
    edit_buttons(pm, args, |button| {
        if button.kind == crate::panel::ButtonType::Joystick {
            button.range.joystick_invert = invert.min(3);
        } else {
            button.range.invert = invert != 0;
        }
    })
}

pub(super) fn bargraph_high(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let high: i32 = args.number(0)?;
    edit_buttons(pm, args, |button| button.range.high = high)
}

pub(super) fn bargraph_low(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let low: i32 = args.number(0)?;
    edit_buttons(pm, args, |button| button.range.low = low)
}

pub(super) fn bargraph_ramp_down(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let ramp: u16 = args.number(0)?;
    edit_buttons(pm, args, |button| button.range.ramp_down = ramp)
}

pub(super) fn bargraph_ramp_up(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let ramp: u16 = args.number(0)?;
    edit_buttons(pm, args, |button| button.range.ramp_up = ramp)
}

pub(super) fn bargraph_slider_color(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let value = color(args, 0)?;
    edit_buttons(pm, args, |button| button.slider_color = value)
}

pub(super) fn bargraph_slider_name(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let name = args.text(0).to_string();
    edit_buttons(pm, args, |button| button.slider_name = name.clone())
}
