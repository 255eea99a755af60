//! Project file definitions (pages, subpages, buttons)
//!
//! These are the decoded resources a panel is built from. A project is
//! written as YAML or JSON and deserialized with serde.

use crate::panel::{
    Address, ButtonInstance, ButtonType, CollapseDirection, Effect, Feedback, LevelRange,
    PageFlip, Rect,
};
use serde::{Deserialize, Serialize};

/// Root of a project file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectDef {
    #[serde(default)]
    pub name: String,
    /// Page shown after startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_up_page: Option<String>,
    /// Popups shown on the power-up page
    #[serde(default)]
    pub power_up_popups: Vec<String>,
    #[serde(default)]
    pub pages: Vec<PageDef>,
    #[serde(default)]
    pub subpages: Vec<SubPageDef>,
}

/// Page definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageDef {
    pub id: u16,
    pub name: String,
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    #[serde(default)]
    pub buttons: Vec<ButtonDef>,
}

impl Default for PageDef {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            width: default_width(),
            height: default_height(),
            buttons: Vec::new(),
        }
    }
}

/// Collapsible popup settings
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct CollapsibleDef {
    #[serde(default)]
    pub direction: CollapseDirection,
    #[serde(default)]
    pub offset: i32,
}

/// Subpage (popup) definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubPageDef {
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub modal: bool,
    #[serde(default)]
    pub reset_position: bool,
    #[serde(default)]
    pub timeout: u16,
    #[serde(default)]
    pub show_effect: Effect,
    #[serde(default)]
    pub hide_effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsible: Option<CollapsibleDef>,
    #[serde(default)]
    pub buttons: Vec<ButtonDef>,
}

/// Subpage viewer contents
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubViewDef {
    /// Subpage names in display order
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub padding: i32,
    /// Show every item initially
    #[serde(default)]
    pub show_all: bool,
}

/// Button definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ButtonDef {
    pub index: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: ButtonType,
    #[serde(flatten)]
    pub rect: Rect,
    /// Push/feedback channel (port, channel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Address>,
    /// Variable text address (port, code)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Level (port, channel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Address>,
    /// Second level of a joystick (Y axis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_y: Option<Address>,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default)]
    pub range: LevelRange,
    #[serde(default)]
    pub instances: Vec<ButtonInstance>,
    #[serde(default)]
    pub page_flips: Vec<PageFlip>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub touchable: bool,
    #[serde(default)]
    pub max_length: u16,
    #[serde(default)]
    pub input_mask: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subview: Option<SubViewDef>,
}

impl Default for ButtonDef {
    fn default() -> Self {
        Self {
            index: 0,
            name: String::new(),
            kind: ButtonType::General,
            rect: Rect::default(),
            channel: None,
            address: None,
            level: None,
            level_y: None,
            feedback: Feedback::default(),
            range: LevelRange::default(),
            instances: Vec::new(),
            page_flips: Vec::new(),
            visible: true,
            enabled: true,
            touchable: true,
            max_length: 0,
            input_mask: String::new(),
            subview: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_width() -> i32 { 1024 }
fn default_height() -> i32 { 768 }
