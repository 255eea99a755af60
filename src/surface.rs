//! Rendering surface callbacks
//!
//! The page manager never draws; it tells a [`Surface`] what changed.
//! [`LoggingSurface`] writes every callback to the log, [`RecordingSurface`]
//! keeps them for assertions.

use crate::panel::{Button, ButtonHandle, CollapseState, Page, SubPage, SubView};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Callbacks toward the rendering layer
pub trait Surface: Send + Sync {
    fn set_page(&self, page: &Page);
    fn set_sub_page(&self, subpage: &SubPage, parent: u16);
    fn display_button(&self, button: &Button);
    fn set_visible(&self, handle: ButtonHandle, visible: bool);
    fn drop_page(&self, id: u16);
    fn drop_sub_page(&self, id: u16, parent: u16);
    /// Bring a shown popup to the front; false if the surface cannot
    fn raise_sub_page(&self, id: u16, z: i32) -> bool;
    fn set_collapse_state(&self, id: u16, state: CollapseState, offset: Option<i32>);
    fn update_subview_item(&self, handle: ButtonHandle, subview: &SubView);
    fn play_sound(&self, file: &str);
    fn beep(&self, double: bool);
    fn show_keyboard(&self, text: &str, prompt: &str, private: bool);
    fn show_keypad(&self, text: &str, prompt: &str, private: bool);
    fn hide_keyboard(&self);
    fn set_led(&self, on: bool);
    fn shutdown(&self);
}

/// Surface that only logs
#[derive(Debug, Default)]
pub struct LoggingSurface;

impl Surface for LoggingSurface {
    fn set_page(&self, page: &Page) {
        info!("📄 Page '{}' ({}) shown", page.name, page.id);
    }

    fn set_sub_page(&self, subpage: &SubPage, parent: u16) {
        info!(
            "🪟 Popup '{}' ({}) shown on page {} at z={}",
            subpage.name, subpage.id, parent, subpage.z.0
        );
    }

    fn display_button(&self, button: &Button) {
        let current = button.current();
        debug!(
            "🔘 Button {} '{}' state {} text='{}' fill={}",
            button.handle, button.name, current.number, current.text, current.fill_color
        );
    }

    fn set_visible(&self, handle: ButtonHandle, visible: bool) {
        debug!("👁 {} visible={}", handle, visible);
    }

    fn drop_page(&self, id: u16) {
        debug!("Page {} dropped", id);
    }

    fn drop_sub_page(&self, id: u16, parent: u16) {
        info!("🪟 Popup {} hidden from page {}", id, parent);
    }

    fn raise_sub_page(&self, id: u16, z: i32) -> bool {
        debug!("Popup {} raised to z={}", id, z);
        true
    }

    fn set_collapse_state(&self, id: u16, state: CollapseState, offset: Option<i32>) {
        debug!("Popup {} collapse state {:?} offset {:?}", id, state, offset);
    }

    fn update_subview_item(&self, handle: ButtonHandle, subview: &SubView) {
        let visible: Vec<&str> = subview
            .items
            .iter()
            .filter(|item| item.visible)
            .map(|item| item.name.as_str())
            .collect();
        debug!("Subview {} items {:?}", handle, visible);
    }

    fn play_sound(&self, file: &str) {
        info!("🔊 Play sound '{}'", file);
    }

    fn beep(&self, double: bool) {
        info!("🔔 {}", if double { "Double beep" } else { "Beep" });
    }

    fn show_keyboard(&self, text: &str, prompt: &str, private: bool) {
        info!("⌨️ Keyboard '{}' prompt='{}' private={}", text, prompt, private);
    }

    fn show_keypad(&self, text: &str, prompt: &str, private: bool) {
        info!("🔢 Keypad '{}' prompt='{}' private={}", text, prompt, private);
    }

    fn hide_keyboard(&self) {
        debug!("Keyboard removed");
    }

    fn set_led(&self, on: bool) {
        debug!("LED {}", if on { "on" } else { "off" });
    }

    fn shutdown(&self) {
        info!("🛑 Surface shutdown");
    }
}

/// One recorded surface callback
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetPage(u16),
    SetSubPage { id: u16, parent: u16, z: i32 },
    DisplayButton { handle: ButtonHandle, instance: u16 },
    SetVisible { handle: ButtonHandle, visible: bool },
    DropPage(u16),
    DropSubPage { id: u16, parent: u16 },
    RaiseSubPage { id: u16, z: i32 },
    Collapse { id: u16, state: CollapseState, offset: Option<i32> },
    SubViewItems { handle: ButtonHandle, visible: Vec<String> },
    PlaySound(String),
    Beep { double: bool },
    ShowKeyboard { text: String, private: bool },
    ShowKeypad { text: String, private: bool },
    HideKeyboard,
    Led(bool),
    Shutdown,
}

/// Surface that records every callback
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    can_raise: AtomicBool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            can_raise: AtomicBool::new(true),
        }
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `raise_sub_page` succeed or fail
    pub fn set_can_raise(&self, can_raise: bool) {
        self.can_raise.store(can_raise, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    pub fn take(&self) -> Vec<SurfaceCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().push(call);
    }
}

impl Surface for RecordingSurface {
    fn set_page(&self, page: &Page) {
        self.record(SurfaceCall::SetPage(page.id));
    }

    fn set_sub_page(&self, subpage: &SubPage, parent: u16) {
        self.record(SurfaceCall::SetSubPage {
            id: subpage.id,
            parent,
            z: subpage.z.0,
        });
    }

    fn display_button(&self, button: &Button) {
        self.record(SurfaceCall::DisplayButton {
            handle: button.handle,
            instance: button.current().number,
        });
    }

    fn set_visible(&self, handle: ButtonHandle, visible: bool) {
        self.record(SurfaceCall::SetVisible { handle, visible });
    }

    fn drop_page(&self, id: u16) {
        self.record(SurfaceCall::DropPage(id));
    }

    fn drop_sub_page(&self, id: u16, parent: u16) {
        self.record(SurfaceCall::DropSubPage { id, parent });
    }

    fn raise_sub_page(&self, id: u16, z: i32) -> bool {
        self.record(SurfaceCall::RaiseSubPage { id, z });
        self.can_raise.load(Ordering::SeqCst)
    }

    fn set_collapse_state(&self, id: u16, state: CollapseState, offset: Option<i32>) {
        self.record(SurfaceCall::Collapse { id, state, offset });
    }

    fn update_subview_item(&self, handle: ButtonHandle, subview: &SubView) {
        self.record(SurfaceCall::SubViewItems {
            handle,
            visible: subview
                .items
                .iter()
                .filter(|item| item.visible)
                .map(|item| item.name.clone())
                .collect(),
        });
    }

    fn play_sound(&self, file: &str) {
        self.record(SurfaceCall::PlaySound(file.to_string()));
    }

    fn beep(&self, double: bool) {
        self.record(SurfaceCall::Beep { double });
    }

    fn show_keyboard(&self, text: &str, _prompt: &str, private: bool) {
        self.record(SurfaceCall::ShowKeyboard {
            text: text.to_string(),
            private,
        });
    }

    fn show_keypad(&self, text: &str, _prompt: &str, private: bool) {
        self.record(SurfaceCall::ShowKeypad {
            text: text.to_string(),
            private,
        });
    }

    fn hide_keyboard(&self) {
        self.record(SurfaceCall::HideKeyboard);
    }

    fn set_led(&self, on: bool) {
        self.record(SurfaceCall::Led(on));
    }

    fn shutdown(&self) {
        self.record(SurfaceCall::Shutdown);
    }
}
