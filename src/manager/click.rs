//! Touch handling: hit testing and button press effects

use super::{PageManager, TimerRequest};
use crate::error::CommandResult;
use crate::panel::{
    level_along, mirror_level, sort_by_z, Button, ButtonHandle, ButtonType, Feedback, FlipAction,
    PageFlip, SubPage,
};
use crate::protocol::{Message, OutboundCommand};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Entry of the click queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickEvent {
    /// Raw touch in panel coordinates
    Coordinates { x: i32, y: i32, pressed: bool },
    /// Touch already resolved to a button; coordinates are button local
    Handle {
        handle: ButtonHandle,
        pressed: bool,
        x: i32,
        y: i32,
    },
}

impl ClickEvent {
    /// Key used to drop consecutive duplicates
    pub fn key(&self) -> Option<(ButtonHandle, bool)> {
        match *self {
            ClickEvent::Handle { handle, pressed, .. } => Some((handle, pressed)),
            ClickEvent::Coordinates { .. } => None,
        }
    }
}

/// Button hit inside a host's local coordinate space
fn hit(buttons: &[Button], x: i32, y: i32) -> Option<(ButtonHandle, i32, i32)> {
    buttons
        .iter()
        .rev()
        .find(|b| b.is_clickable(x, y))
        .map(|b| (b.handle, x - b.rect.left, y - b.rect.top))
}

impl PageManager {
    /// Apply one click queue entry
    pub fn mouse_event(&mut self, event: ClickEvent) {
        match event {
            ClickEvent::Coordinates { x, y, pressed } => {
                if self.report_touch {
                    let text = format!("{},{},{}", if pressed { "Press" } else { "Release" }, x, y);
                    self.send(OutboundCommand::new(1, 0, Message::String(text)));
                }
                if pressed {
                    match self.resolve_click(x, y) {
                        Some((handle, lx, ly)) => self.press_button(handle, true, lx, ly),
                        None => trace!("Touch at {},{} hit nothing", x, y),
                    }
                } else if let Some(handle) = self.pressed {
                    self.press_button(handle, false, 0, 0);
                }
            }
            ClickEvent::Handle {
                handle,
                pressed,
                x,
                y,
            } => self.press_button(handle, pressed, x, y),
        }
    }

    /// Topmost clickable button at a point of the active page
    ///
    /// Popups are tested top to bottom. A touch inside a popup never falls
    /// through to what lies below; a visible modal popup blocks everything
    /// below it.
    pub fn resolve_click(&self, x: i32, y: i32) -> Option<(ButtonHandle, i32, i32)> {
        let actual = self.actual_page?;
        let mut popups: Vec<&SubPage> = self
            .subpages
            .iter()
            .filter(|s| s.visible && s.parent == Some(actual))
            .collect();
        sort_by_z(&mut popups);

        for popup in popups.iter().rev() {
            if popup.rect.contains(x, y) {
                let (lx, ly) = popup.rect.to_local(x, y);
                return hit(&popup.buttons, lx, ly);
            }
            if popup.modal {
                return None;
            }
        }
        hit(&self.page(actual)?.buttons, x, y)
    }

    /// Press or release a button and run its effects
    pub(crate) fn press_button(&mut self, handle: ButtonHandle, pressed: bool, x: i32, y: i32) {
        let ramp_generation = self.animation_generation + 1;
        let Some(button) = self.button_mut(handle) else {
            warn!("⚠️ Click on unknown button {}", handle);
            return;
        };
        if !button.enabled {
            trace!("{} is disabled", handle);
            return;
        }
        if !pressed && !button.pressed {
            return;
        }
        button.pressed = pressed;

        match button.feedback {
            Feedback::Momentary => {
                button.set_active(pressed as usize);
            }
            Feedback::On if pressed => {
                button.set_active(1);
            }
            _ => {}
        }

        let channel = button.channel.filter(|c| c.code > 0);
        let kind = button.kind;
        let sound = button.current().sound.clone();
        let flips = if pressed { Vec::new() } else { button.page_flips.clone() };
        let keyboard = (kind == ButtonType::TextInput && !pressed)
            .then(|| (button.current().text.clone(), button.name.clone()));
        let levels = if pressed && kind.is_level_driven() {
            Some(drag_levels(button, x, y, ramp_generation))
        } else {
            None
        };
        let ramp = button.ramp.filter(|r| r.generation == ramp_generation);

        self.pressed = pressed.then_some(handle);
        if pressed {
            self.touch_login();
        }
        debug!("👆 {} {}", handle, if pressed { "pressed" } else { "released" });

        if let Some(channel) = channel {
            if channel.port == 0 {
                self.system_channel(handle, channel.code, pressed);
            } else {
                let message = if pressed { Message::Push } else { Message::Release };
                self.send(OutboundCommand::new(channel.port, channel.code, message));
            }
        }

        if let Some((level, level_y)) = levels {
            self.send_levels(handle, level, level_y);
        }
        if let Some(ramp) = ramp {
            self.animation_generation = ramp_generation;
            self.schedule(TimerRequest::LevelRamp {
                handle,
                generation: ramp_generation,
                delay: Duration::from_millis(ramp.interval_ms),
            });
        }

        if pressed && !sound.is_empty() && self.settings.system_sound && !self.settings.mute {
            self.surface.play_sound(&sound);
        }

        self.display(handle);

        for flip in flips {
            if let Err(e) = self.run_page_flip(&flip) {
                warn!("⚠️ Page flip {:?} '{}' failed: {}", flip.action, flip.target, e);
            }
        }

        if let Some((text, prompt)) = keyboard {
            self.surface.show_keyboard(&text, &prompt, false);
        }
    }

    /// One level ramp step; stale generations are ignored
    pub(crate) fn step_level_ramp(&mut self, handle: ButtonHandle, generation: u64) {
        let Some(button) = self.button_mut(handle) else {
            return;
        };
        let Some(ramp) = button.ramp.filter(|r| r.generation == generation) else {
            return;
        };
        let Some(next) = ramp.next(button.level_value) else {
            button.ramp = None;
            return;
        };
        button.apply_level(next);
        let finished = next == ramp.target;
        if finished {
            button.ramp = None;
        }
        trace!("{} level ramp at {}", handle, next);

        self.send_levels(handle, Some(next), None);
        self.display(handle);
        if !finished {
            self.schedule(TimerRequest::LevelRamp {
                handle,
                generation,
                delay: Duration::from_millis(ramp.interval_ms),
            });
        }
    }

    fn send_levels(&mut self, handle: ButtonHandle, level: Option<i32>, level_y: Option<i32>) {
        let Some(button) = self.button(handle) else {
            return;
        };
        let targets = [(button.level, level), (button.level_y, level_y)];
        for (address, value) in targets {
            let (Some(address), Some(value)) = (address, value) else {
                continue;
            };
            if address.port == 0 {
                self.system_level(address.code, value);
            } else {
                self.send(OutboundCommand::new(address.port, address.code, Message::Level(value)));
            }
        }
    }

    pub(crate) fn run_page_flip(&mut self, flip: &PageFlip) -> CommandResult {
        self.check_flip_password(flip)?;
        let target = flip.target.as_str();
        match flip.action {
            FlipAction::Standard => self.set_page_by_name(target, false),
            FlipAction::Previous => match self.previous_page {
                Some(previous) => self.set_page(previous, false),
                None => {
                    debug!("No previous page to return to");
                    Ok(())
                }
            },
            FlipAction::Show => self.show_subpage(target, None),
            FlipAction::Hide => self.hide_subpage_named(target, None),
            FlipAction::Toggle => self.toggle_subpage(target, None),
            FlipAction::ClearGroup => {
                self.hide_group(target);
                Ok(())
            }
            FlipAction::ClearPage => {
                self.hide_all(self.actual_page);
                Ok(())
            }
            FlipAction::ClearAll => {
                self.hide_all(None);
                Ok(())
            }
        }
    }
}

/// Levels set by touching a bargraph or joystick at a button local point
///
/// Bargraph levels snap to the drag increment. A change larger than one
/// increment starts a ramp: the first step is returned and the rest is
/// left in `button.ramp` for the timer.
fn drag_levels(
    button: &mut Button,
    x: i32,
    y: i32,
    generation: u64,
) -> (Option<i32>, Option<i32>) {
    let value = button.level_at(x, y);
    if button.kind != ButtonType::Joystick {
        let target = button.quantize_level(value);
        button.ramp = button.plan_ramp(target, generation);
        let level = match button.ramp {
            Some(ramp) => ramp.next(button.level_value).unwrap_or(target),
            None => target,
        };
        button.apply_level(level);
        return (Some(level), None);
    }

    // joysticks: x drives the level, y the second level
    let (low, high) = (button.range.low, button.range.high);
    let mut horizontal = level_along(low, high, x, button.rect.width.max(1));
    let mut vertical = value;
    if button.range.joystick_invert & 1 != 0 {
        horizontal = mirror_level(low, high, horizontal);
    }
    if button.range.joystick_invert & 2 != 0 {
        vertical = mirror_level(low, high, vertical);
    }
    button.level_value = horizontal;
    button.level_y_value = vertical;
    (Some(horizontal), Some(vertical))
}
