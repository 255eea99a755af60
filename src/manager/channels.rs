//! State commands synthesized from protocol events: `ON OFF LEVEL TIME #FTR`

use super::resolve::AddressSpace;
use super::PageManager;
use crate::error::{CommandError, CommandResult};
use crate::panel::Address;
use crate::protocol::{CommandArgs, Message, OutboundCommand};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, trace};

impl PageManager {
    /// Switch the feedback of every button on (port, channel)
    fn set_channel(&mut self, args: &CommandArgs, on: bool) -> CommandResult {
        args.require_channels()?;
        let handles = self.resolve(AddressSpace::Channel, args.port, &args.channels)?;

        for &handle in &handles {
            let state_id = self.button(handle).and_then(|b| b.state_id);
            if let Some(state) = state_id.and_then(|id| self.states.get_mut(id)) {
                state.channel_on = on;
            }
        }
        self.update_buttons(&handles, |button| {
            if let Some(index) = button.channel_feedback(on) {
                button.set_active(index);
            }
            Ok(())
        })?;
        trace!(
            "{} {}:{:?} on {} buttons",
            if on { "ON" } else { "OFF" },
            args.port,
            args.channels,
            handles.len()
        );
        Ok(())
    }
}

pub(super) fn channel_on(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    pm.set_channel(args, true)
}

pub(super) fn channel_off(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    pm.set_channel(args, false)
}

/// `LEVEL-<channel>,<value>`; float values are rounded
pub(super) fn level(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require_channels()?;
    args.require(1)?;
    let raw = args.text(0).trim();
    let value = raw
        .parse::<i32>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.round() as i32))
        .map_err(|_| CommandError::invalid(&args.mnemonic, raw, "level value"))?;

    for &channel in &args.channels {
        let address = Address::new(args.port, channel);
        let handles = pm.resolve(AddressSpace::Level, args.port, &[channel])?;

        for &handle in &handles {
            let state_id = pm.button(handle).and_then(|b| b.state_id);
            if let Some(state) = state_id.and_then(|id| pm.states.get_mut(id)) {
                state.level = Some(value);
            }
        }
        pm.update_buttons(&handles, |button| {
            if button.level_y == Some(address) && button.level != Some(address) {
                let (low, high) = (button.range.low, button.range.high);
                button.level_y_value = value.clamp(low.min(high), high.max(low));
            } else {
                // the controller overrides a touch ramp in progress
                button.ramp = None;
                let rendered = button.apply_level(value);
                trace!("{} level {} rendered as {}", button.handle, value, rendered);
            }
            Ok(())
        })?;

        pm.send(OutboundCommand::new(args.port, channel, Message::Level(value)));
    }
    Ok(())
}

/// `TIME-<hh:mm:ss>,<yyyy-mm-dd>,<weekday>,<ON|OFF>`
pub(super) fn blink_time(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(4)?;
    let time = NaiveTime::parse_from_str(args.text(0), "%H:%M:%S")
        .map_err(|e| CommandError::invalid(&args.mnemonic, args.text(0), e.to_string()))?;
    let date = NaiveDate::parse_from_str(args.text(1), "%Y-%m-%d")
        .map_err(|e| CommandError::invalid(&args.mnemonic, args.text(1), e.to_string()))?;
    let led = args.text(3).eq_ignore_ascii_case("ON");

    pm.controller_time = Some(NaiveDateTime::new(date, time));
    if led != pm.led {
        pm.led = led;
        pm.surface.set_led(led);
    }
    trace!("Controller time {} LED {}", NaiveDateTime::new(date, time), led);
    Ok(())
}

/// `#FTR-<function>[:<count>:<info>[:<file>]]`
pub(super) fn file_transfer(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let raw = args.text(0);
    let fields: Vec<&str> = raw.split(':').collect();
    let function = fields[0];
    let number = |index: usize| -> CommandResult<u32> {
        fields
            .get(index)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| {
                CommandError::invalid(&args.mnemonic, raw, format!("field {} missing", index))
            })
    };

    let progress = &mut pm.file_transfer;
    match function {
        "SYNC" => {
            progress.files_total = number(1)?;
            progress.active = true;
            debug!("File transfer sync, {} files", progress.files_total);
        }
        "START" => {
            progress.active = true;
            progress.parts = 0;
            info!("📦 File transfer started");
        }
        "FTRSTART" => {
            let index = number(1)?;
            let size = number(2)?;
            progress.current_file = fields.get(3..).unwrap_or_default().join(":");
            progress.parts = 0;
            info!("📦 Receiving file {} '{}' ({} bytes)", index, progress.current_file, size);
        }
        "FTRPART" => {
            progress.parts = number(1)?;
            trace!("File '{}' part {}", progress.current_file, progress.parts);
        }
        "END" => {
            progress.active = false;
            info!("📦 File transfer finished");
        }
        other => return Err(CommandError::invalid(&args.mnemonic, other, "unknown function")),
    }
    Ok(())
}
