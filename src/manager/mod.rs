//! Page manager - command dispatcher and page/subpage state machine
//!
//! The manager owns every live page, subpage and button. It is driven by
//! one serial executor (see [`crate::runtime`]) and never locks: protocol
//! events are decoded into command lines, looked up in the static
//! [`COMMANDS`] table and applied to the live state. Changes go out through
//! the injected [`ControllerLink`] and [`Surface`].
//!
//! ```text
//! ProtocolEvent ─► EventDecoder ─► "^TXT-1,0,Hi" ─► COMMANDS["^TXT"]
//!                                                        │
//!                        Surface ◄── PageManager ◄───────┘
//!                        ControllerLink ◄──┘
//! ```

mod appearance;
mod bmf;
mod channels;
mod click;
mod navigation;
mod query;
mod resolve;
mod subview;
mod syspage;
mod system;
mod table;
mod text;

#[cfg(test)]
mod tests;

pub use bmf::{AttrCode, ModifyOp};
pub use click::ClickEvent;
use system::Login;
pub use table::{CommandEntry, CommandTable, Handler, COMMANDS};

use crate::config::SystemSettings;
use crate::error::{CommandError, CommandResult};
use crate::link::ControllerLink;
use crate::panel::{ButtonHandle, ButtonStateTable, Page, PageFlip, SubPage};
use crate::project::ResourceRegistry;
use crate::protocol::{
    command_line::split_mnemonic, CommandArgs, EventDecoder, OutboundCommand, ProtocolEvent,
};
use crate::surface::Surface;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ============================================================================
// Timers and platform events
// ============================================================================

/// Delayed work requested by a command, executed by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    /// Hide a popup unless it was shown or hidden again meanwhile
    PopupTimeout {
        subpage: u16,
        generation: u64,
        delay: Duration,
    },
    /// Advance a running state animation by one step
    Animation {
        handle: ButtonHandle,
        generation: u64,
        delay: Duration,
    },
    /// Move a touched bargraph one increment closer to its target level
    LevelRamp {
        handle: ButtonHandle,
        generation: u64,
        delay: Duration,
    },
    /// End a login unless it saw activity meanwhile
    Logout { generation: u64, delay: Duration },
}

impl TimerRequest {
    pub fn delay(&self) -> Duration {
        match self {
            TimerRequest::PopupTimeout { delay, .. }
            | TimerRequest::Animation { delay, .. }
            | TimerRequest::LevelRamp { delay, .. }
            | TimerRequest::Logout { delay, .. } => *delay,
        }
    }
}

/// Screen orientation reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// Events from the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    Battery { level: u8, charging: bool },
    Orientation(Orientation),
    Network { connected: bool },
}

/// Last known platform state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformStatus {
    pub battery_level: Option<u8>,
    pub charging: bool,
    pub orientation: Orientation,
    pub network_connected: bool,
}

/// Progress of a project file transfer from the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTransferProgress {
    pub active: bool,
    pub files_total: u32,
    pub parts: u32,
    pub current_file: String,
}

/// Dynamic resource registered with `^RAF`/`^RMF`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicResource {
    pub data: String,
    /// Refresh rate in seconds, 0 = never
    pub refresh_rate: u32,
}

/// Read-only view of the navigation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub actual_page: Option<String>,
    pub previous_page: Option<String>,
    /// (name, host page, z) of every visible popup, in Z order
    pub visible_popups: Vec<(String, u16, i32)>,
    pub dispatched: u64,
}

// ============================================================================
// PageManager
// ============================================================================

/// Command dispatcher and owner of the live panel
pub struct PageManager {
    registry: Arc<dyn ResourceRegistry>,
    link: Arc<dyn ControllerLink>,
    surface: Arc<dyn Surface>,

    settings: SystemSettings,
    /// Bumped on every settings change; system pages re-populate when their
    /// recorded generation differs
    settings_generation: u64,

    pages: Vec<Page>,
    subpages: Vec<SubPage>,
    states: ButtonStateTable,
    actual_page: Option<u16>,
    previous_page: Option<u16>,

    decoder: EventDecoder,
    timers: Vec<TimerRequest>,
    subview_updates: Vec<ButtonHandle>,
    animation_generation: u64,

    controller_time: Option<NaiveDateTime>,
    led: bool,
    file_transfer: FileTransferProgress,
    platform: PlatformStatus,
    resources: HashMap<String, DynamicResource>,
    user_passwords: HashMap<String, String>,
    /// Seconds of inactivity before a login ends, 0 keeps it
    logout_timeout: u32,
    login: Option<Login>,
    login_generation: u64,
    /// Protected flip waiting for a password
    pending_flip: Option<PageFlip>,
    /// Send touch coordinates to the controller (`^TOP`)
    report_touch: bool,
    keyboard_passthru: bool,
    /// Button holding the current press, released even if the finger moved
    pressed: Option<ButtonHandle>,

    dispatched: u64,
    stopped: bool,
}

impl PageManager {
    pub fn new(
        registry: Arc<dyn ResourceRegistry>,
        link: Arc<dyn ControllerLink>,
        surface: Arc<dyn Surface>,
        settings: SystemSettings,
    ) -> Self {
        Self {
            registry,
            link,
            surface,
            settings,
            settings_generation: 1,
            pages: Vec::new(),
            subpages: Vec::new(),
            states: ButtonStateTable::new(),
            actual_page: None,
            previous_page: None,
            decoder: EventDecoder::new(),
            timers: Vec::new(),
            subview_updates: Vec::new(),
            animation_generation: 0,
            controller_time: None,
            led: false,
            file_transfer: FileTransferProgress::default(),
            platform: PlatformStatus::default(),
            resources: HashMap::new(),
            user_passwords: HashMap::new(),
            logout_timeout: 0,
            login: None,
            login_generation: 0,
            pending_flip: None,
            report_touch: false,
            keyboard_passthru: false,
            pressed: None,
            dispatched: 0,
            stopped: false,
        }
    }

    /// Show the power-up page and its popups
    pub fn start(&mut self) -> CommandResult {
        let page = self
            .registry
            .power_up_page()
            .map(str::to_string)
            .ok_or(CommandError::NoActivePage)?;
        info!("🚀 Starting panel on page '{}'", page);
        self.set_page_by_name(&page, false)?;

        let popups = self.registry.power_up_popups().to_vec();
        for popup in popups {
            if let Err(e) = self.show_subpage(&popup, None) {
                warn!("⚠️ Power-up popup '{}' not shown: {}", popup, e);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Decode and dispatch one protocol event
    pub fn deliver(&mut self, event: ProtocolEvent) {
        if let Some(command) = self.decoder.decode(event) {
            self.dispatch_line(command.device, command.port, &command.line);
        }
    }

    /// Dispatch a command line; failures are logged and dropped
    pub fn dispatch_line(&mut self, device: u16, port: u16, line: &str) {
        if let Err(e) = self.execute(device, port, line) {
            if e.is_consistency_error() {
                error!("❌ '{}' failed: {}", line, e);
            } else {
                warn!("⚠️ '{}' dropped: {}", line, e);
            }
        }
    }

    /// Dispatch a command line and return the handler result
    pub fn execute(&mut self, device: u16, port: u16, line: &str) -> CommandResult {
        let (mnemonic, tail) = split_mnemonic(line);
        let entry = COMMANDS
            .get(mnemonic)
            .ok_or_else(|| CommandError::UnknownCommand(mnemonic.to_string()))?;

        debug!("⚡ {} (device {}, port {})", line.trim_end(), device, port);
        self.dispatched += 1;
        let args = CommandArgs::parse(mnemonic, device, port, entry.layout, tail)?;
        (entry.handler)(self, &args)
    }

    // ------------------------------------------------------------------------
    // Runtime hooks
    // ------------------------------------------------------------------------

    /// Timer requests recorded since the last call
    pub fn take_timers(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.timers)
    }

    /// Subview refreshes requested by commands since the last call
    pub fn take_subview_updates(&mut self) -> Vec<ButtonHandle> {
        std::mem::take(&mut self.subview_updates)
    }

    pub(crate) fn schedule(&mut self, timer: TimerRequest) {
        self.timers.push(timer);
    }

    pub(crate) fn queue_subview_update(&mut self, handle: ButtonHandle) {
        self.subview_updates.push(handle);
    }

    /// Execute an expired timer
    pub fn on_timer(&mut self, timer: TimerRequest) {
        match timer {
            TimerRequest::PopupTimeout {
                subpage, generation, ..
            } => self.expire_popup(subpage, generation),
            TimerRequest::Animation {
                handle, generation, ..
            } => self.step_animation(handle, generation),
            TimerRequest::LevelRamp {
                handle, generation, ..
            } => self.step_level_ramp(handle, generation),
            TimerRequest::Logout { generation, .. } => self.expire_login(generation),
        }
    }

    /// Replace the system settings; system pages re-populate on next show
    pub fn update_settings(&mut self, settings: SystemSettings) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        self.settings_changed();
    }

    pub(crate) fn settings_changed(&mut self) {
        self.settings_generation += 1;
        debug!("Settings generation {}", self.settings_generation);
        if let Some(id) = self.actual_page {
            if crate::panel::is_system_id(id) {
                self.populate_system_page(id);
            }
        }
    }

    pub fn platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Battery { level, charging } => {
                self.platform.battery_level = Some(level.min(100));
                self.platform.charging = charging;
            }
            PlatformEvent::Orientation(orientation) => {
                info!("Orientation changed to {:?}", orientation);
                self.platform.orientation = orientation;
            }
            PlatformEvent::Network { connected } => {
                self.platform.network_connected = connected;
            }
        }
        if let Some(id) = self.actual_page {
            if crate::panel::is_system_id(id) {
                self.populate_system_page(id);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    pub fn settings_generation(&self) -> u64 {
        self.settings_generation
    }

    pub fn actual_page(&self) -> Option<&Page> {
        self.actual_page.and_then(|id| self.page(id))
    }

    pub fn previous_page_id(&self) -> Option<u16> {
        self.previous_page
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn subpages(&self) -> &[SubPage] {
        &self.subpages
    }

    pub fn button_states(&self) -> &ButtonStateTable {
        &self.states
    }

    pub fn controller_time(&self) -> Option<NaiveDateTime> {
        self.controller_time
    }

    pub fn led(&self) -> bool {
        self.led
    }

    pub fn file_transfer(&self) -> &FileTransferProgress {
        &self.file_transfer
    }

    pub fn platform(&self) -> PlatformStatus {
        self.platform
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        let name_of = |id: Option<u16>| id.and_then(|id| self.page(id)).map(|p| p.name.clone());
        let mut popups: Vec<&SubPage> = self.subpages.iter().filter(|s| s.visible).collect();
        crate::panel::sort_by_z(&mut popups);
        PanelSnapshot {
            actual_page: name_of(self.actual_page),
            previous_page: name_of(self.previous_page),
            visible_popups: popups
                .iter()
                .map(|s| (s.name.clone(), s.parent.unwrap_or(0), s.z.0))
                .collect(),
            dispatched: self.dispatched,
        }
    }

    pub(crate) fn send(&self, command: OutboundCommand) {
        self.link.send(command);
    }

    /// Drop all live state; pages and popups are reloaded on next use
    pub fn reset(&mut self) {
        if let Some(id) = self.actual_page.take() {
            self.surface.drop_page(id);
        }
        self.previous_page = None;
        self.pages.clear();
        self.subpages.clear();
        self.states.clear();
        self.timers.clear();
        self.subview_updates.clear();
        self.login = None;
        self.pending_flip = None;
        info!("Panel state reset");
    }
}
