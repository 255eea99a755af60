//! Panel wide commands: sounds, keyboards, setup, resources and passwords

use super::appearance::flag;
use super::{ClickEvent, PageManager, TimerRequest};
use crate::error::{CommandError, CommandResult};
use crate::panel::{ButtonHandle, ButtonHost, ButtonType, PageFlip, SYSTEM_PAGE_START};
use crate::protocol::{CommandArgs, Message, OutboundCommand};
use std::time::Duration;
use tracing::{debug, info, warn};

/// First system page, shown by `SETUP`
pub const SETUP_PAGE: u16 = SYSTEM_PAGE_START + 1;

/// Number of page-flip password levels
const PASSWORD_LEVELS: usize = 4;

// ============================================================================
// Sound
// ============================================================================

pub(super) fn beep(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    if !pm.settings.mute {
        pm.surface.beep(false);
    }
    Ok(())
}

pub(super) fn double_beep(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    if !pm.settings.mute {
        pm.surface.beep(true);
    }
    Ok(())
}

/// `@SOU-<file>`
pub(super) fn play_sound(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let file = args.text(0).trim();
    if file.is_empty() {
        return Err(CommandError::missing(&args.mnemonic, 1, 0));
    }
    if pm.settings.mute {
        debug!("Muted, '{}' not played", file);
        return Ok(());
    }
    pm.surface.play_sound(file);
    Ok(())
}

/// `^MUT-<0|1>`
pub(super) fn mute(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let mute = flag(args, 0)?;
    if pm.settings.mute != mute {
        pm.settings.mute = mute;
        pm.settings_changed();
    }
    Ok(())
}

// ============================================================================
// Keyboards
// ============================================================================

/// Initial text and prompt of `@AKB-<text>;<prompt>` or `AKEYB-<text>`
fn keyboard_args(args: &CommandArgs) -> (&str, &str) {
    (args.text(0), args.text(1))
}

pub(super) fn keyboard(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let (text, prompt) = keyboard_args(args);
    pm.surface.show_keyboard(text, prompt, false);
    Ok(())
}

pub(super) fn keypad(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let (text, prompt) = keyboard_args(args);
    pm.surface.show_keypad(text, prompt, false);
    Ok(())
}

pub(super) fn private_keyboard(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let (text, prompt) = keyboard_args(args);
    pm.surface.show_keyboard(text, prompt, true);
    Ok(())
}

pub(super) fn private_keypad(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let (text, prompt) = keyboard_args(args);
    pm.surface.show_keypad(text, prompt, true);
    Ok(())
}

pub(super) fn remove_keyboard(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    pm.surface.hide_keyboard();
    Ok(())
}

pub(super) fn telephone_keypad(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let (text, prompt) = keyboard_args(args);
    pm.surface.show_keypad(text, prompt, false);
    Ok(())
}

pub(super) fn virtual_keyboard(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    pm.surface.show_keyboard("", "", false);
    Ok(())
}

/// `^KPS-<mode>`, anything but 0 forwards keystrokes
pub(super) fn keyboard_passthru(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let mode: u8 = args.number(0)?;
    pm.keyboard_passthru = mode != 0;
    Ok(())
}

/// `^VKS-<text>` types into the focused text input on screen
pub(super) fn virtual_keystrokes(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let text = args.text(0).to_string();
    if pm.keyboard_passthru {
        pm.send(OutboundCommand::new(args.port, 0, Message::String(text)));
        return Ok(());
    }

    let Some(handle) = pm.focused_input() else {
        debug!("^VKS: no focused text input");
        return Ok(());
    };
    pm.update_buttons(&[handle], |button| {
        let max = button.max_length as usize;
        for instance in button.instances.iter_mut() {
            instance.text.push_str(&text);
            if max > 0 && instance.text.chars().count() > max {
                instance.text = instance.text.chars().take(max).collect();
            }
        }
        Ok(())
    })
}

impl PageManager {
    /// Focused text input of the active page or one of its visible popups
    fn focused_input(&self) -> Option<ButtonHandle> {
        let focused = |buttons: &[crate::panel::Button]| {
            buttons
                .iter()
                .find(|b| b.focused && b.kind == ButtonType::TextInput)
                .map(|b| b.handle)
        };
        let actual = self.actual_page?;
        self.subpages
            .iter()
            .filter(|s| s.visible && s.parent == Some(actual))
            .find_map(|s| focused(s.buttons()))
            .or_else(|| self.page(actual).and_then(|p| focused(p.buttons())))
    }
}

// ============================================================================
// Panel
// ============================================================================

pub(super) fn setup(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    pm.set_page(SETUP_PAGE, false)
}

pub(super) fn shutdown(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    info!("🛑 Shutdown requested by controller");
    pm.stopped = true;
    pm.surface.shutdown();
    Ok(())
}

/// `^VER?` answers with the firmware version
pub(super) fn version(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let reply = format!("^VER-{}", pm.settings.firmware);
    pm.send(OutboundCommand::new(args.port, 0, Message::Command(reply)));
    Ok(())
}

/// `@WLD` wakes the display
pub(super) fn wake(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    info!("💡 Wake display");
    if let Some(id) = pm.actual_page {
        pm.render_page(id);
    }
    Ok(())
}

/// `^TOP-<0|1>` turns coordinate reporting on or off
pub(super) fn touch_reporting(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.report_touch = flag(args, 0)?;
    Ok(())
}

/// `^VTP-<x>,<y>,<0 release|1 press|2 press and release>`
pub(super) fn virtual_touch(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(3)?;
    let x: i32 = args.number(0)?;
    let y: i32 = args.number(1)?;
    let action: u8 = args.number(2)?;
    let steps: &[bool] = match action {
        0 => &[false],
        1 => &[true],
        2 => &[true, false],
        _ => return Err(CommandError::invalid(&args.mnemonic, args.text(2), "action 0-2")),
    };
    for &pressed in steps {
        pm.mouse_event(ClickEvent::Coordinates { x, y, pressed });
    }
    Ok(())
}

// ============================================================================
// Dynamic resources
// ============================================================================

/// `^RAF-<name>,<data>` adds, `^RMF-<name>,<data>` modifies
pub(super) fn resource_add(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let name = args.text(0).to_string();
    let data = args.params[1..].join(",");
    let exists = pm.resources.contains_key(&name);
    if args.mnemonic == "^RMF" && !exists {
        return Err(CommandError::invalid(&args.mnemonic, &name, "resource does not exist"));
    }
    let resource = pm.resources.entry(name.clone()).or_default();
    resource.data = data;
    debug!("Resource '{}' {}", name, if exists { "modified" } else { "added" });
    Ok(())
}

/// `^RFR-<name>` redraws every button showing the resource
pub(super) fn resource_refresh(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let name = args.text(0).trim();
    if !pm.resources.contains_key(name) {
        return Err(CommandError::invalid(&args.mnemonic, name, "resource does not exist"));
    }
    let uses = |buttons: &[crate::panel::Button]| -> Vec<ButtonHandle> {
        buttons
            .iter()
            .filter(|b| b.instances.iter().any(|i| i.bitmap == name))
            .map(|b| b.handle)
            .collect()
    };
    let mut handles: Vec<ButtonHandle> = pm.pages.iter().flat_map(|p| uses(p.buttons())).collect();
    handles.extend(pm.subpages.iter().flat_map(|s| uses(s.buttons())));
    for handle in handles {
        pm.display(handle);
    }
    Ok(())
}

/// `^RSR-<name>,<seconds>`
pub(super) fn resource_rate(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let rate: u32 = args.number(1)?;
    let resource = pm.resources.get_mut(args.text(0)).ok_or_else(|| {
        CommandError::invalid(&args.mnemonic, args.text(0), "resource does not exist")
    })?;
    resource.refresh_rate = rate;
    Ok(())
}

// ============================================================================
// Passwords
// ============================================================================

/// Access granted by a successful password entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Login {
    pub user: Option<String>,
    /// Page-flip level unlocked by its password; user logins unlock all
    pub level: Option<u8>,
    pub generation: u64,
}

impl PageManager {
    /// Whether a flip guarded by password `level` may run
    fn flip_unlocked(&self, level: u8) -> bool {
        let required = match level {
            0 => return true,
            level => self.settings.passwords.get(level as usize - 1),
        };
        if required.map_or(true, String::is_empty) {
            return true;
        }
        match &self.login {
            Some(login) => login.level.map_or(true, |unlocked| unlocked == level),
            None => false,
        }
    }

    /// Hold back a protected flip and ask for the password
    pub(crate) fn check_flip_password(&mut self, flip: &PageFlip) -> CommandResult {
        if self.flip_unlocked(flip.password) {
            return Ok(());
        }
        self.pending_flip = Some(flip.clone());
        self.surface.show_keyboard("", "Password", true);
        Err(CommandError::PasswordRequired(flip.target.clone()))
    }

    /// Log in with a user password (`^LPB`) or, without a user, with one of
    /// the page-flip passwords (`@PWD`)
    ///
    /// A flip held back for a password runs once the login unlocks it.
    pub fn login(&mut self, user: Option<&str>, password: &str) -> bool {
        let level = match user {
            Some(user) => {
                if self.user_passwords.get(user).map(String::as_str) != Some(password) {
                    warn!("⚠️ Login of user '{}' rejected", user);
                    return false;
                }
                None
            }
            None => {
                let position = self
                    .settings
                    .passwords
                    .iter()
                    .position(|p| !p.is_empty() && p == password);
                match position {
                    Some(index) => Some(index as u8 + 1),
                    None => {
                        warn!("⚠️ Page password rejected");
                        return false;
                    }
                }
            }
        };

        self.login_generation += 1;
        self.login = Some(Login {
            user: user.map(str::to_string),
            level,
            generation: self.login_generation,
        });
        match (user, level) {
            (Some(user), _) => info!("🔑 User '{}' logged in", user),
            (None, level) => info!("🔑 Password level {:?} unlocked", level),
        }
        self.arm_logout();

        if let Some(flip) = self.pending_flip.take() {
            if self.flip_unlocked(flip.password) {
                self.surface.hide_keyboard();
                if let Err(e) = self.run_page_flip(&flip) {
                    warn!("⚠️ Page flip {:?} '{}' failed: {}", flip.action, flip.target, e);
                }
            }
        }
        true
    }

    pub fn is_logged_in(&self) -> bool {
        self.login.is_some()
    }

    fn arm_logout(&mut self) {
        let (Some(login), timeout) = (&self.login, self.logout_timeout) else {
            return;
        };
        if timeout == 0 {
            return;
        }
        let generation = login.generation;
        self.schedule(TimerRequest::Logout {
            generation,
            delay: Duration::from_secs(timeout as u64),
        });
    }

    /// Activity while logged in restarts the logout timer
    pub(crate) fn touch_login(&mut self) {
        if self.logout_timeout == 0 {
            return;
        }
        let Some(login) = self.login.as_mut() else {
            return;
        };
        self.login_generation += 1;
        login.generation = self.login_generation;
        self.arm_logout();
    }

    /// Logout timer expiry; stale generations are ignored
    pub(crate) fn expire_login(&mut self, generation: u64) {
        if self.login.as_ref().map(|l| l.generation) != Some(generation) {
            return;
        }
        self.logout();
        info!("🔒 Logged out after {} s without activity", self.logout_timeout);
    }

    fn logout(&mut self) {
        self.login = None;
        self.pending_flip = None;
    }
}

pub(super) fn user_passwords_clear(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    pm.user_passwords.clear();
    if pm.login.as_ref().is_some_and(|l| l.user.is_some()) {
        pm.logout();
    }
    Ok(())
}

/// `^LPR-<user>`
pub(super) fn user_password_remove(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let user = args.text(0).trim();
    pm.user_passwords.remove(user);
    if pm.login.as_ref().and_then(|l| l.user.as_deref()) == Some(user) {
        pm.logout();
    }
    Ok(())
}

/// `^LPS-<seconds>`, 0 disables the logout
pub(super) fn logout_timeout(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.logout_timeout = args.number(0)?;
    pm.touch_login();
    Ok(())
}

/// `^LPB-<user>,<password>`
pub(super) fn user_password_add(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let user = args.text(0).trim();
    if user.is_empty() {
        return Err(CommandError::invalid(&args.mnemonic, user, "empty user name"));
    }
    pm.user_passwords.insert(user.to_string(), args.text(1).to_string());
    Ok(())
}

/// `@PWD-<level 1-4>,<password>`
pub(super) fn page_password(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let level: usize = args.number(0)?;
    if !(1..=PASSWORD_LEVELS).contains(&level) {
        return Err(CommandError::invalid(&args.mnemonic, args.text(0), "level 1-4"));
    }
    let passwords = &mut pm.settings.passwords;
    if passwords.len() < PASSWORD_LEVELS {
        passwords.resize(PASSWORD_LEVELS, String::new());
    }
    passwords[level - 1] = args.text(1).to_string();
    pm.settings_changed();
    Ok(())
}
