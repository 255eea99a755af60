//! Live values on system pages (IDs 5000 and up)
//!
//! System page buttons address port 0. Their text, channel and level codes
//! select a value from [`SystemSettings`](crate::config::SystemSettings) or
//! the platform status:
//!
//! | port 0 | code | value |
//! |---|---|---|
//! | address | 1-11 | panel type, firmware, host, port, channel, volume, battery, network, clock, log level, orientation |
//! | channel | 1-5 | mute, system sound, exit setup, charging, network up |
//! | channel | 6-10 | log level error, warn, info, debug, trace (one is on) |
//! | level | 1-2 | volume, battery |

use super::PageManager;
use crate::panel::{ButtonHandle, ButtonHost};
use tracing::{debug, info};

pub const TEXT_PANEL_TYPE: u16 = 1;
pub const TEXT_FIRMWARE: u16 = 2;
pub const TEXT_CONTROLLER_HOST: u16 = 3;
pub const TEXT_CONTROLLER_PORT: u16 = 4;
pub const TEXT_CHANNEL: u16 = 5;
pub const TEXT_VOLUME: u16 = 6;
pub const TEXT_BATTERY: u16 = 7;
pub const TEXT_NETWORK: u16 = 8;
pub const TEXT_CLOCK: u16 = 9;
pub const TEXT_LOG_LEVEL: u16 = 10;
pub const TEXT_ORIENTATION: u16 = 11;

pub const CHANNEL_MUTE: u16 = 1;
pub const CHANNEL_SYSTEM_SOUND: u16 = 2;
pub const CHANNEL_EXIT_SETUP: u16 = 3;
pub const CHANNEL_CHARGING: u16 = 4;
pub const CHANNEL_NETWORK: u16 = 5;
pub const CHANNEL_LOG_ERROR: u16 = 6;
pub const CHANNEL_LOG_WARN: u16 = 7;
pub const CHANNEL_LOG_INFO: u16 = 8;
pub const CHANNEL_LOG_DEBUG: u16 = 9;
pub const CHANNEL_LOG_TRACE: u16 = 10;

const LOG_LEVEL_CHANNELS: [(u16, &str); 5] = [
    (CHANNEL_LOG_ERROR, "error"),
    (CHANNEL_LOG_WARN, "warn"),
    (CHANNEL_LOG_INFO, "info"),
    (CHANNEL_LOG_DEBUG, "debug"),
    (CHANNEL_LOG_TRACE, "trace"),
];

fn log_level_of(code: u16) -> Option<&'static str> {
    LOG_LEVEL_CHANNELS
        .iter()
        .find(|(channel, _)| *channel == code)
        .map(|(_, level)| *level)
}

pub const LEVEL_VOLUME: u16 = 1;
pub const LEVEL_BATTERY: u16 = 2;

impl PageManager {
    fn system_text(&self, code: u16) -> Option<String> {
        let settings = &self.settings;
        Some(match code {
            TEXT_PANEL_TYPE => settings.panel_type.clone(),
            TEXT_FIRMWARE => settings.firmware.clone(),
            TEXT_CONTROLLER_HOST => settings.controller_host.clone(),
            TEXT_CONTROLLER_PORT => settings.controller_port.to_string(),
            TEXT_CHANNEL => settings.channel.to_string(),
            TEXT_VOLUME => format!("{}%", settings.volume),
            TEXT_BATTERY => match self.platform.battery_level {
                Some(level) => format!("{}%", level),
                None => "-".to_string(),
            },
            TEXT_NETWORK => {
                let state = if self.platform.network_connected { "Connected" } else { "Offline" };
                state.to_string()
            }
            TEXT_CLOCK => self
                .controller_time
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            TEXT_LOG_LEVEL => settings.log_level.clone(),
            TEXT_ORIENTATION => format!("{:?}", self.platform.orientation),
            _ => return None,
        })
    }

    fn system_flag(&self, code: u16) -> Option<bool> {
        Some(match code {
            CHANNEL_MUTE => self.settings.mute,
            CHANNEL_SYSTEM_SOUND => self.settings.system_sound,
            CHANNEL_CHARGING => self.platform.charging,
            CHANNEL_NETWORK => self.platform.network_connected,
            _ => self.settings.log_level.eq_ignore_ascii_case(log_level_of(code)?),
        })
    }

    fn system_level_value(&self, code: u16) -> Option<i32> {
        match code {
            LEVEL_VOLUME => Some(self.settings.volume as i32),
            LEVEL_BATTERY => self.platform.battery_level.map(i32::from),
            _ => None,
        }
    }

    /// Fill the live-value buttons of a system page from the settings
    pub(crate) fn populate_system_page(&mut self, id: u16) {
        let Some(page) = self.page(id) else {
            return;
        };

        let mut updates = Vec::new();
        for button in page.buttons() {
            let text = button
                .address
                .filter(|a| a.port == 0)
                .and_then(|a| self.system_text(a.code));
            let on = button
                .channel
                .filter(|c| c.port == 0)
                .and_then(|c| self.system_flag(c.code));
            let level = button
                .level
                .filter(|l| l.port == 0)
                .and_then(|l| self.system_level_value(l.code));
            if text.is_some() || on.is_some() || level.is_some() {
                updates.push((button.handle, text, on, level));
            }
        }

        let generation = self.settings_generation;
        for (handle, text, on, level) in updates {
            if let Some(button) = self.button_mut(handle) {
                if let Some(text) = text {
                    button.instances.iter_mut().for_each(|i| i.text = text.clone());
                }
                if let Some(on) = on {
                    button.set_active(on as usize);
                }
                if let Some(level) = level {
                    button.apply_level(level);
                }
            }
            self.display(handle);
        }
        if let Some(page) = self.page_mut(id) {
            page.populated_generation = Some(generation);
        }
        debug!("System page {} populated (generation {})", id, generation);
    }

    /// Press on a port 0 channel of a system page
    pub(crate) fn system_channel(&mut self, handle: ButtonHandle, code: u16, pressed: bool) {
        match code {
            CHANNEL_MUTE if pressed => {
                self.settings.mute = !self.settings.mute;
                info!("🔇 Mute {}", if self.settings.mute { "on" } else { "off" });
                self.settings_changed();
            }
            CHANNEL_SYSTEM_SOUND if pressed => {
                self.settings.system_sound = !self.settings.system_sound;
                self.settings_changed();
            }
            CHANNEL_EXIT_SETUP if !pressed => {
                if let Some(previous) = self.previous_page {
                    if let Err(e) = self.set_page(previous, true) {
                        debug!("Leaving setup failed: {}", e);
                    }
                }
            }
            _ => match log_level_of(code).filter(|_| pressed) {
                Some(level) if !self.settings.log_level.eq_ignore_ascii_case(level) => {
                    info!("📝 Log level switched to {}", level);
                    self.settings.log_level = level.to_string();
                    self.settings_changed();
                }
                Some(_) => {}
                None => debug!("System channel {} on {} ignored", code, handle),
            },
        }
    }

    /// Level change from a port 0 slider
    pub(crate) fn system_level(&mut self, code: u16, value: i32) {
        if code == LEVEL_VOLUME {
            let volume = value.clamp(0, 100) as u8;
            if volume != self.settings.volume {
                self.settings.volume = volume;
                self.settings_changed();
            }
        }
    }
}
