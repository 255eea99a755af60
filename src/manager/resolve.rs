//! Lazy loading of pages/subpages and address to button resolution

use super::PageManager;
use crate::error::{CommandError, CommandResult};
use crate::panel::{
    Button, ButtonHandle, ButtonHost, ButtonStateTable, Page, SubPage, SurfaceKind,
};
use crate::protocol::CommandArgs;
use tracing::{debug, trace};

/// Which registry map a command resolves its addresses through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddressSpace {
    /// Push/feedback channels (`ON`, `OFF`)
    Channel,
    /// Variable text addresses (`^` and `?` commands)
    Address,
    /// Level channels (`LEVEL`)
    Level,
}

/// Link freshly built buttons to their shared state records and apply the
/// last state the controller reported for them
fn attach_states(states: &mut ButtonStateTable, buttons: &mut [Button]) {
    for button in buttons {
        let id = states.add_button_state(button.state_key());
        button.state_id = Some(id);
        let Some(state) = states.get(id) else {
            continue;
        };
        if state.channel_on {
            if let Some(index) = button.channel_feedback(true) {
                button.set_active(index);
            }
        }
        if let Some(level) = state.level {
            button.apply_level(level);
        }
    }
}

impl PageManager {
    pub(crate) fn page(&self, id: u16) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub(crate) fn page_mut(&mut self, id: u16) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    pub(crate) fn subpage(&self, id: u16) -> Option<&SubPage> {
        self.subpages.iter().find(|s| s.id == id)
    }

    pub(crate) fn subpage_mut(&mut self, id: u16) -> Option<&mut SubPage> {
        self.subpages.iter_mut().find(|s| s.id == id)
    }

    /// Make a page resident, reading it from the registry on first use
    pub(crate) fn load_page(&mut self, id: u16) -> CommandResult {
        if self.page(id).is_some() {
            return Ok(());
        }
        let mut page = self
            .registry
            .page(id)
            .map(Page::from_def)
            .ok_or_else(|| CommandError::PageNotFound(id.to_string()))?;
        attach_states(&mut self.states, &mut page.buttons);
        debug!("📥 Loaded page '{}' ({}) with {} buttons", page.name, id, page.buttons.len());
        self.pages.push(page);
        Ok(())
    }

    /// Make a subpage resident, reading it from the registry on first use
    pub(crate) fn load_subpage(&mut self, id: u16) -> CommandResult {
        if self.subpage(id).is_some() {
            return Ok(());
        }
        let mut subpage = self
            .registry
            .subpage(id)
            .map(SubPage::from_def)
            .ok_or_else(|| CommandError::SubPageNotFound(id.to_string()))?;
        attach_states(&mut self.states, &mut subpage.buttons);
        debug!(
            "📥 Loaded popup '{}' ({}) with {} buttons",
            subpage.name,
            id,
            subpage.buttons.len()
        );
        self.subpages.push(subpage);
        Ok(())
    }

    /// ID of a page by name, resident or in the registry
    pub(crate) fn page_id(&self, name: &str) -> CommandResult<u16> {
        if let Some(page) = self.pages.iter().find(|p| p.name == name) {
            return Ok(page.id);
        }
        self.registry
            .page_by_name(name)
            .map(|def| def.id)
            .ok_or_else(|| CommandError::PageNotFound(name.to_string()))
    }

    /// ID of a subpage by name, resident or in the registry
    pub(crate) fn subpage_id(&self, name: &str) -> CommandResult<u16> {
        if let Some(subpage) = self.subpages.iter().find(|s| s.name == name) {
            return Ok(subpage.id);
        }
        self.registry
            .subpage_by_name(name)
            .map(|def| def.id)
            .ok_or_else(|| CommandError::SubPageNotFound(name.to_string()))
    }

    /// Load a subpage by name and return its ID
    pub(crate) fn resident_subpage(&mut self, name: &str) -> CommandResult<u16> {
        if name.is_empty() {
            return Err(CommandError::SubPageNotFound(String::new()));
        }
        let id = self.subpage_id(name)?;
        self.load_subpage(id)?;
        Ok(id)
    }

    pub(crate) fn button(&self, handle: ButtonHandle) -> Option<&Button> {
        let parent = handle.parent_id();
        match SurfaceKind::of(parent) {
            SurfaceKind::Page => self.page(parent)?.button(handle.index()),
            SurfaceKind::SubPage => self.subpage(parent)?.button(handle.index()),
        }
    }

    pub(crate) fn button_mut(&mut self, handle: ButtonHandle) -> Option<&mut Button> {
        let parent = handle.parent_id();
        match SurfaceKind::of(parent) {
            SurfaceKind::Page => self.page_mut(parent)?.button_mut(handle.index()),
            SurfaceKind::SubPage => self.subpage_mut(parent)?.button_mut(handle.index()),
        }
    }

    /// Resolve (port, channel list) to buttons through one address map
    ///
    /// Targets are loaded lazily. Any channel without a button fails the
    /// whole resolution.
    pub(crate) fn resolve(
        &mut self,
        space: AddressSpace,
        port: u16,
        channels: &[u16],
    ) -> CommandResult<Vec<ButtonHandle>> {
        let mut targets = Vec::new();
        for &channel in channels {
            let locations = match space {
                AddressSpace::Channel => self.registry.channel_targets(port, channel),
                AddressSpace::Address => self.registry.address_targets(port, channel),
                AddressSpace::Level => self.registry.level_targets(port, channel),
            };
            if locations.is_empty() {
                return Err(CommandError::UnresolvedButton { port, channel });
            }
            targets.extend(locations.iter().map(|location| (channel, *location)));
        }

        let mut handles = Vec::with_capacity(targets.len());
        for (channel, location) in targets {
            match SurfaceKind::of(location.parent_id) {
                SurfaceKind::Page => self.load_page(location.parent_id)?,
                SurfaceKind::SubPage => self.load_subpage(location.parent_id)?,
            }
            let handle = ButtonHandle::new(location.parent_id, location.index);
            if self.button(handle).is_none() {
                return Err(CommandError::UnresolvedButton { port, channel });
            }
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
        trace!("Resolved {:?} {}:{:?} to {} buttons", space, port, channels, handles.len());
        Ok(handles)
    }

    /// Resolve the address list of an addressed command
    pub(crate) fn resolve_args(&mut self, args: &CommandArgs) -> CommandResult<Vec<ButtonHandle>> {
        args.require_channels()?;
        self.resolve(AddressSpace::Address, args.port, &args.channels)
    }

    /// Whether a button is currently on screen
    pub(crate) fn is_displayed(&self, handle: ButtonHandle) -> bool {
        let Some(actual) = self.actual_page else {
            return false;
        };
        let parent = handle.parent_id();
        match SurfaceKind::of(parent) {
            SurfaceKind::Page => parent == actual,
            SurfaceKind::SubPage => self
                .subpage(parent)
                .map(|s| s.visible && s.parent == Some(actual))
                .unwrap_or(false),
        }
    }

    /// Redraw a button if it is on screen
    pub(crate) fn display(&self, handle: ButtonHandle) {
        if !self.is_displayed(handle) {
            return;
        }
        if let Some(button) = self.button(handle) {
            self.surface.display_button(button);
        }
    }

    /// Apply `update` to every button, then redraw the visible ones
    pub(crate) fn update_buttons<F>(
        &mut self,
        handles: &[ButtonHandle],
        mut update: F,
    ) -> CommandResult
    where
        F: FnMut(&mut Button) -> CommandResult,
    {
        for &handle in handles {
            let button = self
                .button_mut(handle)
                .ok_or_else(|| CommandError::Resource(format!("button {} vanished", handle)))?;
            update(button)?;
            self.display(handle);
        }
        Ok(())
    }
}
