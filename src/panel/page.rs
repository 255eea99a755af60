//! Live pages and the button-host abstraction shared with subpages

use super::button::Button;
use super::handle::{is_system_id, ButtonHandle};
use crate::project::PageDef;

/// Common access to the buttons of a page or subpage
pub trait ButtonHost {
    fn id(&self) -> u16;
    fn name(&self) -> &str;
    fn buttons(&self) -> &[Button];
    fn buttons_mut(&mut self) -> &mut Vec<Button>;

    fn handle(&self) -> ButtonHandle {
        ButtonHandle::for_surface(self.id())
    }

    fn button(&self, index: u16) -> Option<&Button> {
        self.buttons().iter().find(|b| b.index() == index)
    }

    fn button_mut(&mut self, index: u16) -> Option<&mut Button> {
        self.buttons_mut().iter_mut().find(|b| b.index() == index)
    }

    fn button_by_name(&self, name: &str) -> Option<&Button> {
        self.buttons().iter().find(|b| b.name == name)
    }
}

/// A full-screen surface
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: u16,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub buttons: Vec<Button>,
    z_counter: i32,
    /// Settings generation the live-value buttons were last filled from
    pub populated_generation: Option<u64>,
}

impl Page {
    pub fn from_def(def: &PageDef) -> Self {
        Self {
            id: def.id,
            name: def.name.clone(),
            width: def.width,
            height: def.height,
            buttons: def
                .buttons
                .iter()
                .map(|b| Button::from_def(def.id, b))
                .collect(),
            z_counter: 0,
            populated_generation: None,
        }
    }

    pub fn is_system(&self) -> bool {
        is_system_id(self.id)
    }

    /// Allocate the next Z-order for a popup shown on this page
    pub fn next_z(&mut self) -> i32 {
        self.z_counter += 1;
        self.z_counter
    }

    /// Release a Z-order slot; only the topmost slot can be reused
    pub fn release_z(&mut self, z: i32) {
        if z > 0 && z == self.z_counter {
            self.z_counter -= 1;
        }
    }

    pub fn reset_z(&mut self) {
        self.z_counter = 0;
    }

    pub fn current_z(&self) -> i32 {
        self.z_counter
    }
}

impl ButtonHost for Page {
    fn id(&self) -> u16 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    fn buttons_mut(&mut self) -> &mut Vec<Button> {
        &mut self.buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_counter() {
        let mut page = Page::from_def(&PageDef {
            id: 1,
            name: "Main".into(),
            ..PageDef::default()
        });
        assert_eq!(page.next_z(), 1);
        assert_eq!(page.next_z(), 2);
        // releasing a slot below the top keeps the counter
        page.release_z(1);
        assert_eq!(page.current_z(), 2);
        page.release_z(2);
        assert_eq!(page.current_z(), 1);
        page.reset_z();
        assert_eq!(page.next_z(), 1);
    }
}
