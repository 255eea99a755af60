//! Page and popup navigation
//!
//! Invariants kept here:
//! - at most one page is actual
//! - within a non-empty group at most one popup is visible
//! - a newly assigned Z never collides with a visible popup on the same page

use super::{PageManager, TimerRequest};
use crate::error::{CommandError, CommandResult};
use crate::panel::{
    is_system_id, sort_by_z, RuleTarget, ShowEffect, SubPage, ToggleRules, ZOrder,
};
use crate::protocol::CommandArgs;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Collapsible popup operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CollapseOp {
    Open,
    Close,
    Toggle(Option<ToggleRules>),
}

impl PageManager {
    // ------------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------------

    pub(crate) fn set_page_by_name(&mut self, name: &str, forget: bool) -> CommandResult {
        let id = self.page_id(name)?;
        self.set_page(id, forget)
    }

    /// Make a page actual; already active pages are left untouched
    pub(crate) fn set_page(&mut self, id: u16, forget: bool) -> CommandResult {
        if self.actual_page == Some(id) {
            debug!("Page {} is already active", id);
            return Ok(());
        }
        self.load_page(id)?;

        if let Some(current) = self.actual_page.take() {
            if !forget {
                self.previous_page = Some(current);
            }
            self.surface.drop_page(current);
        }

        if is_system_id(id) {
            let stale = self
                .page(id)
                .map(|p| p.populated_generation != Some(self.settings_generation))
                .unwrap_or(false);
            if stale {
                self.populate_system_page(id);
            }
        }

        self.actual_page = Some(id);
        self.render_page(id);
        if let Some(page) = self.page(id) {
            info!("📄 Page '{}' ({}) is now active", page.name, id);
        }
        Ok(())
    }

    /// Draw a page and its visible popups bottom to top
    pub(crate) fn render_page(&self, id: u16) {
        let Some(page) = self.page(id) else {
            return;
        };
        self.surface.set_page(page);
        for button in page.buttons.iter().filter(|b| b.visible) {
            self.surface.display_button(button);
        }

        let mut popups: Vec<&SubPage> = self
            .subpages
            .iter()
            .filter(|s| s.visible && s.parent == Some(id))
            .collect();
        sort_by_z(&mut popups);
        for popup in popups {
            self.draw_subpage(popup, id);
        }
    }

    fn draw_subpage(&self, popup: &SubPage, parent: u16) {
        self.surface.set_sub_page(popup, parent);
        for button in popup.buttons.iter().filter(|b| b.visible) {
            self.surface.display_button(button);
        }
        if let Some(collapsible) = popup.collapsible {
            self.surface
                .set_collapse_state(popup.id, collapsible.state, collapsible.dynamic_offset);
        }
    }

    // ------------------------------------------------------------------------
    // Popups
    // ------------------------------------------------------------------------

    /// Host page for a popup command: the named page or the actual one
    fn host_page(&mut self, popup: &str, page: Option<&str>) -> CommandResult<u16> {
        match page.filter(|p| !p.is_empty()) {
            Some(name) => {
                let id = self.page_id(name)?;
                self.load_page(id)?;
                Ok(id)
            }
            None => self
                .actual_page
                .ok_or_else(|| CommandError::NoParentPage(popup.to_string())),
        }
    }

    pub(crate) fn show_subpage(&mut self, name: &str, page: Option<&str>) -> CommandResult {
        let id = self.resident_subpage(name)?;
        let parent = self.host_page(name, page)?;
        self.show_subpage_on(id, parent)
    }

    pub(crate) fn show_subpage_on(&mut self, id: u16, parent: u16) -> CommandResult {
        let (visible, current_parent, group) = {
            let popup = self
                .subpage(id)
                .ok_or_else(|| CommandError::SubPageNotFound(id.to_string()))?;
            (popup.visible, popup.parent, popup.group.clone())
        };

        if visible && current_parent == Some(parent) {
            self.bring_to_front(id, parent);
            return Ok(());
        }
        if visible {
            // moving to another host page
            self.hide_subpage(id);
        }

        if !group.is_empty() {
            let siblings: Vec<u16> = self
                .subpages
                .iter()
                .filter(|s| s.visible && s.id != id && s.in_group(&group))
                .map(|s| s.id)
                .collect();
            for sibling in siblings {
                debug!("Hiding popup {} of group '{}'", sibling, group);
                self.hide_subpage(sibling);
            }
        }

        let z = self
            .page_mut(parent)
            .map(|page| page.next_z())
            .ok_or_else(|| CommandError::NoParentPage(id.to_string()))?;
        if let Some(popup) = self.subpage_mut(id) {
            popup.mark_shown(parent, z);
            info!("🪟 Popup '{}' shown on page {} (z={})", popup.name, parent, z);
        }
        self.arm_timeout(id);

        if self.actual_page == Some(parent) {
            if let Some(popup) = self.subpage(id) {
                self.draw_subpage(popup, parent);
            }
        }
        Ok(())
    }

    /// Re-show of a visible popup: raise it above overlapping siblings
    fn bring_to_front(&mut self, id: u16, parent: u16) {
        if self.is_overlapped(id, parent) {
            let Some(z) = self.page_mut(parent).map(|page| page.next_z()) else {
                return;
            };
            if let Some(popup) = self.subpage_mut(id) {
                popup.z = ZOrder(z);
            }
            if self.actual_page == Some(parent) && !self.surface.raise_sub_page(id, z) {
                self.surface.drop_sub_page(id, parent);
                if let Some(popup) = self.subpage(id) {
                    self.draw_subpage(popup, parent);
                }
            }
            debug!("Popup {} raised to z={}", id, z);
        }

        if let Some(popup) = self.subpage_mut(id) {
            popup.show_generation += 1;
        }
        self.arm_timeout(id);
    }

    /// True if a visible sibling with a higher Z overlaps the popup
    fn is_overlapped(&self, id: u16, parent: u16) -> bool {
        let Some(popup) = self.subpage(id) else {
            return false;
        };
        self.subpages.iter().any(|other| {
            other.id != id
                && other.visible
                && other.parent == Some(parent)
                && other.z > popup.z
                && other.rect.overlaps(&popup.rect)
        })
    }

    fn arm_timeout(&mut self, id: u16) {
        let Some(popup) = self.subpage(id) else {
            return;
        };
        if popup.visible && popup.timeout > 0 {
            let timer = TimerRequest::PopupTimeout {
                subpage: id,
                generation: popup.show_generation,
                delay: Duration::from_millis(popup.timeout as u64 * 100),
            };
            self.schedule(timer);
        }
    }

    pub(crate) fn expire_popup(&mut self, id: u16, generation: u64) {
        let current = self
            .subpage(id)
            .filter(|popup| popup.visible)
            .map(|popup| popup.show_generation);
        if current == Some(generation) {
            debug!("⏱ Popup {} timed out", id);
            self.hide_subpage(id);
        }
    }

    /// Hide a popup; the object stays resident
    pub(crate) fn hide_subpage(&mut self, id: u16) {
        let Some(popup) = self.subpage_mut(id) else {
            return;
        };
        if !popup.visible {
            return;
        }
        let parent = popup.parent;
        let z = popup.mark_hidden();
        debug!("Popup '{}' hidden (released z={})", popup.name, z.0);

        if let Some(parent) = parent {
            if let Some(page) = self.page_mut(parent) {
                page.release_z(z.0);
            }
            if self.actual_page == Some(parent) {
                self.surface.drop_sub_page(id, parent);
            }
        }
    }

    /// Hide a popup by name, optionally only from one page
    pub(crate) fn hide_subpage_named(&mut self, name: &str, page: Option<&str>) -> CommandResult {
        let id = self.subpage_id(name)?;
        let Some(current_parent) = self.subpage(id).filter(|s| s.visible).and_then(|s| s.parent)
        else {
            return Ok(());
        };
        if let Some(page) = page.filter(|p| !p.is_empty()) {
            if self.page_id(page)? != current_parent {
                return Ok(());
            }
        }
        self.hide_subpage(id);
        Ok(())
    }

    pub(crate) fn toggle_subpage(&mut self, name: &str, page: Option<&str>) -> CommandResult {
        let id = self.resident_subpage(name)?;
        let parent = self.host_page(name, page)?;
        let shown_here = self
            .subpage(id)
            .map(|s| s.visible && s.parent == Some(parent))
            .unwrap_or(false);
        if shown_here {
            self.hide_subpage(id);
            Ok(())
        } else {
            self.show_subpage_on(id, parent)
        }
    }

    /// Hide every visible popup of a group
    pub(crate) fn hide_group(&mut self, group: &str) {
        let members: Vec<u16> = self
            .subpages
            .iter()
            .filter(|s| s.visible && s.in_group(group))
            .map(|s| s.id)
            .collect();
        for id in members {
            self.hide_subpage(id);
        }
    }

    /// Hide every popup on one page, or on all pages, and reset Z counters
    pub(crate) fn hide_all(&mut self, page: Option<u16>) {
        let shown: Vec<u16> = self
            .subpages
            .iter()
            .filter(|s| s.visible && (page.is_none() || s.parent == page))
            .map(|s| s.id)
            .collect();
        for id in shown {
            self.hide_subpage(id);
        }
        for p in self.pages.iter_mut() {
            if page.is_none() || page == Some(p.id) {
                p.reset_z();
            }
        }
    }

    pub(crate) fn collapse(&mut self, name: &str, op: CollapseOp) -> CommandResult {
        let id = self.resident_subpage(name)?;
        let actual = self.actual_page;
        let Some(popup) = self.subpage_mut(id) else {
            return Err(CommandError::SubPageNotFound(name.to_string()));
        };
        if !popup.visible {
            debug!("Popup '{}' is hidden, collapse request ignored", name);
            return Ok(());
        }
        let parent = popup.parent;
        let Some(collapsible) = popup.collapsible.as_mut() else {
            return Err(CommandError::invalid("^PCT", name, "popup is not collapsible"));
        };

        let target = match op {
            CollapseOp::Open => Some(RuleTarget::Open),
            CollapseOp::Close => Some(RuleTarget::Collapsed),
            CollapseOp::Toggle(None) => Some(collapsible.default_toggle()),
            CollapseOp::Toggle(Some(rules)) => rules.select(collapsible),
        };
        let Some(target) = target else {
            debug!("No toggle rule matches popup '{}'", name);
            return Ok(());
        };

        let (state, offset) = (collapsible.state, collapsible.dynamic_offset);
        let changed = collapsible.apply(target);
        let (new_state, new_offset) = (collapsible.state, collapsible.dynamic_offset);
        debug!(
            "Popup '{}' collapse {:?}/{:?} -> {:?}/{:?}",
            name, state, offset, new_state, new_offset
        );
        if changed && parent.is_some() && parent == actual {
            self.surface.set_collapse_state(id, new_state, new_offset);
        }
        Ok(())
    }

    fn with_subpage<F>(&mut self, name: &str, update: F) -> CommandResult
    where
        F: FnOnce(&mut SubPage) -> CommandResult,
    {
        let id = self.resident_subpage(name)?;
        let popup = self
            .subpage_mut(id)
            .ok_or_else(|| CommandError::SubPageNotFound(name.to_string()))?;
        update(popup)
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn page_param<'a>(args: &'a CommandArgs) -> Option<&'a str> {
    args.param(1).filter(|p| !p.is_empty())
}

/// `PAGE-<name>`
pub(super) fn page_flip(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let name = args.text(0).trim();
    if name.is_empty() {
        return Err(CommandError::missing(&args.mnemonic, 1, 0));
    }
    pm.set_page_by_name(name, false)
}

/// `^AFP-<page>,<effect>,<time>`
pub(super) fn animated_page_flip(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let effect = match args.param(1).filter(|e| !e.is_empty()) {
        Some(effect) => ShowEffect::from_str(effect)
            .map_err(|_| CommandError::invalid(&args.mnemonic, effect, "unknown effect"))?,
        None => ShowEffect::None,
    };
    let time: u16 = args.number_or(2, 0)?;
    debug!("Page flip to '{}' with {} over {}/10 s", args.text(0), effect, time);
    pm.set_page_by_name(args.text(0), false)
}

/// `@PPN-<popup>[;<page>]`
pub(super) fn popup_show(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.show_subpage(args.text(0), page_param(args))
}

pub(super) fn popup_hide(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.hide_subpage_named(args.text(0), page_param(args))
}

pub(super) fn popup_toggle(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.toggle_subpage(args.text(0), page_param(args))
}

pub(super) fn popup_kill(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.hide_subpage_named(args.text(0), None)
}

/// `@PPM-<popup>;<modal|nonmodal|1|0>`
pub(super) fn popup_modality(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let value = args.text(1);
    let modal = match value.to_ascii_lowercase().as_str() {
        "modal" | "1" => true,
        "nonmodal" | "0" => false,
        _ => return Err(CommandError::invalid(&args.mnemonic, value, "expected modal or nonmodal")),
    };
    pm.with_subpage(args.text(0), |popup| {
        popup.modal = modal;
        Ok(())
    })
}

/// `@PPT-<popup>;<tenths of a second>`
pub(super) fn popup_timeout(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let timeout: u16 = args.number(1)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.timeout = timeout;
        Ok(())
    })?;
    // a visible popup starts counting now
    if let Ok(id) = pm.subpage_id(args.text(0)) {
        if let Some(popup) = pm.subpage_mut(id) {
            popup.show_generation += 1;
        }
        pm.arm_timeout(id);
    }
    Ok(())
}

pub(super) fn popup_close_all(pm: &mut PageManager, _args: &CommandArgs) -> CommandResult {
    pm.hide_all(None);
    info!("All popups closed");
    Ok(())
}

/// `@PPA[-<page>]`, the actual page when empty
pub(super) fn popup_close_page(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let page = match args.param(0).filter(|p| !p.is_empty()) {
        Some(name) => pm.page_id(name)?,
        None => pm.actual_page.ok_or(CommandError::NoActivePage)?,
    };
    pm.hide_all(Some(page));
    Ok(())
}

/// `@APG-<popup>;<group>`
pub(super) fn group_add(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let group = args.text(1).to_string();
    pm.with_subpage(args.text(0), |popup| {
        popup.group = group;
        Ok(())
    })
}

/// `@CPG-<group>`
pub(super) fn group_clear(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let group = args.text(0);
    for popup in pm.subpages.iter_mut().filter(|s| s.in_group(group)) {
        popup.group.clear();
    }
    // members that were never loaded keep their project group
    Ok(())
}

/// `@DPG-<popup>;<group>`
pub(super) fn group_remove(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let group = args.param(1).map(str::to_string);
    pm.with_subpage(args.text(0), |popup| {
        if group.as_deref().map(|g| popup.in_group(g)).unwrap_or(true) {
            popup.group.clear();
        }
        Ok(())
    })
}

/// `@PDR-<popup>[;<0|1>]`
pub(super) fn popup_reset_position(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let flag: u8 = args.number_or(1, 1)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.reset_position = flag != 0;
        Ok(())
    })
}

fn parse_effect(args: &CommandArgs) -> CommandResult<ShowEffect> {
    args.require(2)?;
    let name = args.text(1);
    ShowEffect::from_str(name)
        .map_err(|_| CommandError::invalid(&args.mnemonic, name, "unknown effect"))
}

fn parse_position(args: &CommandArgs) -> CommandResult<(i32, i32)> {
    args.require(2)?;
    let raw = args.text(1);
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, raw, "expected x,y"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|_| CommandError::invalid(&args.mnemonic, raw, "not a number"))
    };
    Ok((parse(x)?, parse(y)?))
}

pub(super) fn popup_show_effect(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let effect = parse_effect(args)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.show_effect.kind = effect;
        Ok(())
    })
}

pub(super) fn popup_hide_effect(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let effect = parse_effect(args)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.hide_effect.kind = effect;
        Ok(())
    })
}

pub(super) fn popup_show_time(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let time: u16 = args.number(1)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.show_effect.time = time;
        Ok(())
    })
}

pub(super) fn popup_hide_time(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let time: u16 = args.number(1)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.hide_effect.time = time;
        Ok(())
    })
}

pub(super) fn popup_show_position(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let position = parse_position(args)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.show_effect.position = Some(position);
        Ok(())
    })
}

pub(super) fn popup_hide_position(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    let position = parse_position(args)?;
    pm.with_subpage(args.text(0), |popup| {
        popup.hide_effect.position = Some(position);
        Ok(())
    })
}

pub(super) fn collapse_open(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.collapse(args.text(0), CollapseOp::Open)
}

pub(super) fn collapse_close(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    pm.collapse(args.text(0), CollapseOp::Close)
}

/// `^PCT-<popup>[;<rules>]`
pub(super) fn collapse_toggle(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let rules = match args.param(1).filter(|r| !r.trim().is_empty()) {
        Some(text) => Some(
            ToggleRules::parse(text)
                .map_err(|reason| CommandError::invalid(&args.mnemonic, text, reason))?,
        ),
        None => None,
    };
    pm.collapse(args.text(0), CollapseOp::Toggle(rules))
}
