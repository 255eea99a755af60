//! Subpage views (`^SSH ^SHD ^STG ^SHA ^SPD ^SCE`) and list views (`^LV*`)
//!
//! Commands only change the item model and queue the button; the surface
//! receives the new snapshot when the runtime drains the subview queue.

use super::PageManager;
use crate::error::{CommandError, CommandResult};
use crate::panel::{ButtonHandle, ListView, SubView, SubViewEvents, SubViewItem};
use crate::protocol::{CommandArgs, CustomEvent, Message, OutboundCommand};
use tracing::{debug, trace};

/// Item change reported to the controller; positions are zero based
#[derive(Debug)]
enum ItemChange {
    Shown(String, usize),
    Hidden(String, usize),
    Reordered { name: String, from: usize, to: usize },
    /// Item scrolled to the anchor position over `time` tenths of a second
    Anchored { name: String, position: usize, time: i32 },
}

impl ItemChange {
    /// Event number, item name, value1 and value2 of the custom event
    fn event(self, events: &SubViewEvents) -> (u16, String, i32, i32) {
        match self {
            ItemChange::Shown(name, position) => (events.onscreen, name, position as i32 + 1, 0),
            ItemChange::Hidden(name, position) => (events.offscreen, name, position as i32 + 1, 0),
            ItemChange::Reordered { name, from, to } => {
                (events.reorder, name, to as i32 + 1, from as i32 + 1)
            }
            ItemChange::Anchored { name, position, time } => {
                (events.anchor, name, position as i32 + 1, time)
            }
        }
    }
}

impl PageManager {
    /// Push the subview snapshot of a button to the surface
    pub fn process_subview_update(&mut self, handle: ButtonHandle) {
        if !self.is_displayed(handle) {
            trace!("{} not on screen, subview update skipped", handle);
            return;
        }
        let Some(button) = self.button(handle) else {
            return;
        };
        match (&button.subview, &button.list_view) {
            (Some(subview), _) => self.surface.update_subview_item(handle, subview),
            (None, Some(_)) => self.surface.display_button(button),
            (None, None) => debug!("{} has neither subview nor list view", handle),
        }
    }

    /// Edit the subview of every addressed button
    ///
    /// All targets are edited on copies first; nothing is committed and no
    /// event is sent unless every edit succeeds.
    fn edit_subviews<F>(&mut self, args: &CommandArgs, mut edit: F) -> CommandResult
    where
        F: FnMut(&mut SubView) -> CommandResult<Vec<ItemChange>>,
    {
        let handles = self.resolve_args(args)?;
        let mut edited = Vec::with_capacity(handles.len());
        for handle in handles {
            let button = self
                .button(handle)
                .ok_or_else(|| CommandError::Resource(format!("button {} vanished", handle)))?;
            let address = button
                .address
                .map(|a| (a.port, a.code))
                .unwrap_or((args.port, handle.index()));
            let mut subview = button.subview.clone().ok_or_else(|| {
                CommandError::invalid(&args.mnemonic, &handle.to_string(), "not a subpage view")
            })?;
            let changes = edit(&mut subview)?;
            edited.push((handle, address, subview, changes));
        }

        for (handle, (port, channel), subview, changes) in edited {
            let events = subview.events;
            if let Some(button) = self.button_mut(handle) {
                button.subview = Some(subview);
            }
            self.queue_subview_update(handle);

            for change in changes {
                let (event_type, name, value1, value2) = change.event(&events);
                if event_type == 0 {
                    continue;
                }
                let event = CustomEvent {
                    instance: 0,
                    value1,
                    value2,
                    text: name,
                    event_type,
                    ..CustomEvent::default()
                };
                self.send(OutboundCommand::new(port, channel, Message::Custom(event)));
            }
        }
        Ok(())
    }

    fn edit_lists<F>(&mut self, args: &CommandArgs, edit: F) -> CommandResult
    where
        F: Fn(&mut ListView),
    {
        let handles = self.resolve_args(args)?;
        if let Some(handle) = handles
            .iter()
            .find(|h| self.button(**h).map_or(true, |b| b.list_view.is_none()))
        {
            return Err(CommandError::invalid(
                &args.mnemonic,
                &handle.to_string(),
                "not a list view",
            ));
        }
        for handle in handles {
            if let Some(list) = self.button_mut(handle).and_then(|b| b.list_view.as_mut()) {
                edit(list);
            }
            self.queue_subview_update(handle);
        }
        Ok(())
    }
}

/// Position of an item, appending it hidden when the subpage exists but is not listed
fn listed(subview: &mut SubView, name: &str, known: bool) -> CommandResult<usize> {
    if let Some(position) = subview.position(name) {
        return Ok(position);
    }
    if !known {
        return Err(CommandError::SubPageNotFound(name.to_string()));
    }
    subview.items.push(SubViewItem {
        name: name.to_string(),
        visible: false,
    });
    Ok(subview.items.len() - 1)
}

fn show(subview: &mut SubView, position: usize) -> Option<ItemChange> {
    let item = subview.items.get_mut(position)?;
    if item.visible {
        return None;
    }
    item.visible = true;
    Some(ItemChange::Shown(item.name.clone(), position))
}

/// Move an item to `target`, clamped to the end of the list
fn reorder(subview: &mut SubView, from: usize, target: usize) -> Option<ItemChange> {
    let to = target.min(subview.items.len().saturating_sub(1));
    if from == to || from >= subview.items.len() {
        return None;
    }
    let item = subview.items.remove(from);
    let name = item.name.clone();
    subview.items.insert(to, item);
    Some(ItemChange::Reordered { name, from, to })
}

fn hide(subview: &mut SubView, position: usize) -> Option<ItemChange> {
    let item = subview.items.get_mut(position)?;
    if !item.visible {
        return None;
    }
    item.visible = false;
    Some(ItemChange::Hidden(item.name.clone(), position))
}

/// `^SSH-<addr>,<subpage>[,<position>,<time>]`
///
/// A position anchors the item; positions count from 1 and 0 keeps the
/// item where it is. The time is the scroll time in tenths of a second.
pub(super) fn show_item(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let name = args.text(0).trim().to_string();
    let anchor = match args.param(1).filter(|p| !p.trim().is_empty()) {
        Some(_) => Some((args.number::<usize>(1)?, args.number_or::<i32>(2, 0)?.max(0))),
        None => None,
    };
    let known = pm.registry.subpage_by_name(&name).is_some();
    pm.edit_subviews(args, |subview| {
        let mut position = listed(subview, &name, known)?;
        let mut changes = Vec::new();
        if let Some(target) = anchor.and_then(|(target, _)| target.checked_sub(1)) {
            if let Some(change) = reorder(subview, position, target) {
                if let ItemChange::Reordered { to, .. } = change {
                    position = to;
                }
                changes.push(change);
            }
        }
        changes.extend(show(subview, position));

        if let Some((_, time)) = anchor {
            let name = subview.items[position].name.clone();
            trace!("Subview anchored at '{}' ({} tenths)", name, time);
            subview.anchor = Some(name.clone());
            changes.push(ItemChange::Anchored { name, position, time });
        }
        Ok(changes)
    })
}

pub(super) fn hide_item(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let name = args.text(0).trim().to_string();
    pm.edit_subviews(args, |subview| {
        let position = subview
            .position(&name)
            .ok_or_else(|| CommandError::SubPageNotFound(name.clone()))?;
        Ok(hide(subview, position).into_iter().collect())
    })
}

pub(super) fn toggle_item(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let name = args.text(0).trim().to_string();
    pm.edit_subviews(args, |subview| {
        let position = subview
            .position(&name)
            .ok_or_else(|| CommandError::SubPageNotFound(name.clone()))?;
        let change = if subview.items[position].visible {
            hide(subview, position)
        } else {
            show(subview, position)
        };
        Ok(change.into_iter().collect())
    })
}

pub(super) fn hide_all(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    pm.edit_subviews(args, |subview| {
        let changes = (0..subview.items.len())
            .filter_map(|position| hide(subview, position))
            .collect();
        subview.anchor = None;
        Ok(changes)
    })
}

pub(super) fn padding(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let padding: i32 = args.number(0)?;
    pm.edit_subviews(args, |subview| {
        subview.padding = padding.max(0);
        Ok(Vec::new())
    })
}

/// `^SCE-<addr>,<anchor>,<onscreen>,<offscreen>,<reorder>`, 0 disables an event
pub(super) fn custom_events(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(4)?;
    let anchor: u16 = args.number(0)?;
    let onscreen: u16 = args.number(1)?;
    let offscreen: u16 = args.number(2)?;
    let reorder: u16 = args.number(3)?;
    pm.edit_subviews(args, |subview| {
        subview.events.anchor = anchor;
        subview.events.onscreen = onscreen;
        subview.events.offscreen = offscreen;
        subview.events.reorder = reorder;
        Ok(Vec::new())
    })
}

// ============================================================================
// List views
// ============================================================================

/// `^LVD-<addr>,<source>[,<configuration>]`
pub(super) fn list_source(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let (source, configuration) = args
        .text(0)
        .split_once(',')
        .unwrap_or((args.text(0), ""));
    let (source, configuration) = (source.trim().to_string(), configuration.trim().to_string());
    pm.edit_lists(args, |list| {
        list.source = source.clone();
        list.configuration = configuration.clone();
        list.position = 0;
    })
}

pub(super) fn list_event(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let event: u16 = args.number(0)?;
    pm.edit_lists(args, |list| list.event = event)
}

pub(super) fn list_filter(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let filter = args.text(0).to_string();
    pm.edit_lists(args, |list| list.filter = filter.clone())
}

pub(super) fn list_layout(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let layout = args.text(0).to_string();
    pm.edit_lists(args, |list| list.layout = layout.clone())
}

pub(super) fn list_map(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let map = args.text(0).to_string();
    pm.edit_lists(args, |list| list.map = map.clone())
}

/// `^LVN-<addr>,<position>`
pub(super) fn list_navigate(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let position: usize = args.number(0)?;
    pm.edit_lists(args, |list| list.position = position)
}

pub(super) fn list_refresh(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    pm.edit_lists(args, |_| {})
}

pub(super) fn list_sort(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let sort = args.text(0).to_string();
    pm.edit_lists(args, |list| list.sort = sort.clone())
}
