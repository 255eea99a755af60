//! Live panel entities: pages, subpages, buttons and shared button states
//!
//! These are built from project definitions the first time they are
//! referenced and mutated only by the page manager.

mod button;
mod color;
mod geometry;
mod handle;
mod page;
pub mod states;
mod style;
mod subpage;

pub use button::{
    level_along, mirror_level, Address, Animation, Button, ButtonInstance, LevelRamp, LevelRange,
    ListView, StateSelection, SubView, SubViewEvents, SubViewItem,
};
pub use color::Color;
pub use geometry::Rect;
pub use handle::{
    is_system_id, ButtonHandle, SurfaceKind, REGULAR_SUBPAGE_START, SYSTEM_PAGE_START,
    SYSTEM_SUBPAGE_START,
};
pub use page::{ButtonHost, Page};
pub use states::{ButtonState, ButtonStateTable, StateKey};
pub use style::{
    border_style, text_effect, ButtonType, DrawOrder, Effect, Feedback, FlipAction,
    Justification, Layer, PageFlip, ShowEffect,
};
pub use subpage::{
    sort_by_z, CollapseDirection, CollapseState, Collapsible, RulePattern, RuleTarget, SubPage,
    ToggleRule, ToggleRules, ZOrder,
};
