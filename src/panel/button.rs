//! Buttons and their numbered instances (states)

use super::color::Color;
use super::geometry::Rect;
use super::handle::ButtonHandle;
use super::states::StateKey;
use super::style::{ButtonType, DrawOrder, Feedback, Justification, PageFlip};
use crate::project::ButtonDef;
use serde::{Deserialize, Serialize};

/// Port/code pair used to match protocol commands against buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub port: u16,
    pub code: u16,
}

impl Address {
    pub fn new(port: u16, code: u16) -> Self {
        Self { port, code }
    }
}

/// One visual state of a button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonInstance {
    /// 1-based state number, assigned when the button is built
    #[serde(skip)]
    pub number: u16,
    pub text: String,
    pub border_color: Color,
    pub fill_color: Color,
    pub text_color: Color,
    pub text_effect_color: Color,
    pub border_style: String,
    pub font: i32,
    pub bitmap: String,
    pub icon: i32,
    pub text_justification: Justification,
    pub bitmap_justification: Justification,
    pub icon_justification: Justification,
    pub opacity: u8,
    pub word_wrap: bool,
    pub text_effect: String,
    pub sound: String,
    pub marquee_speed: u8,
    pub draw_order: DrawOrder,
}

impl Default for ButtonInstance {
    fn default() -> Self {
        Self {
            number: 0,
            text: String::new(),
            border_color: Color::BLACK,
            fill_color: Color::TRANSPARENT,
            text_color: Color::WHITE,
            text_effect_color: Color::BLACK,
            border_style: "None".to_string(),
            font: 1,
            bitmap: String::new(),
            icon: 0,
            text_justification: Justification::Center,
            bitmap_justification: Justification::Center,
            icon_justification: Justification::Center,
            opacity: 0xFF,
            word_wrap: false,
            text_effect: "None".to_string(),
            sound: String::new(),
            marquee_speed: 0,
            draw_order: DrawOrder::default(),
        }
    }
}

/// Which instances a command addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateSelection {
    All,
    Only(Vec<u16>),
}

impl StateSelection {
    /// Parse a state field: `0` for all states, otherwise a range list
    pub fn parse(field: &str) -> Option<Self> {
        let numbers = crate::protocol::parse_range_list(field)?;
        if numbers.is_empty() || numbers.contains(&0) {
            Some(StateSelection::All)
        } else {
            Some(StateSelection::Only(numbers))
        }
    }

    pub fn includes(&self, number: u16) -> bool {
        match self {
            StateSelection::All => true,
            StateSelection::Only(numbers) => numbers.contains(&number),
        }
    }
}

/// Level range and behavior of bargraphs and joysticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRange {
    pub low: i32,
    pub high: i32,
    pub invert: bool,
    pub drag_increment: i32,
    /// Ramp times in tenths of a second
    pub ramp_up: u16,
    pub ramp_down: u16,
    /// Joystick axis inversion bitmask (bit 0 = X, bit 1 = Y)
    pub joystick_invert: u8,
}

impl Default for LevelRange {
    fn default() -> Self {
        Self {
            low: 0,
            high: 255,
            invert: false,
            drag_increment: 2,
            ramp_up: 20,
            ramp_down: 20,
            joystick_invert: 0,
        }
    }
}

/// Mirror a level inside `low..=high`
pub fn mirror_level(low: i32, high: i32, value: i32) -> i32 {
    let mirrored = high as i64 - (value as i64 - low as i64);
    mirrored.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Level value at `position` of `length` along a `low..=high` axis
pub fn level_along(low: i32, high: i32, position: i32, length: i32) -> i32 {
    if length <= 0 {
        return low;
    }
    let span = high as i64 - low as i64;
    let value = low as i64 + (position.clamp(0, length) as i64 * span) / length as i64;
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Custom event numbers fired by subview state transitions (`^SCE`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubViewEvents {
    pub anchor: u16,
    pub onscreen: u16,
    pub offscreen: u16,
    pub reorder: u16,
}

/// One subpage presented inside a subpage viewer button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubViewItem {
    pub name: String,
    pub visible: bool,
}

/// Ordered, scrollable list of subpages shown inside a button
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubView {
    pub items: Vec<SubViewItem>,
    pub padding: i32,
    pub events: SubViewEvents,
    /// Name of the first visible item
    pub anchor: Option<String>,
}

impl SubView {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.eq_ignore_ascii_case(name))
    }

    pub fn first_visible(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.visible)
            .map(|item| item.name.as_str())
    }
}

/// Data binding of a list view button (`^LV*`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListView {
    pub source: String,
    pub configuration: String,
    pub event: u16,
    pub filter: String,
    pub layout: String,
    pub map: String,
    pub sort: String,
    pub position: usize,
}

/// Running state animation (`^ANI`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub from: u16,
    pub to: u16,
    /// Total time in tenths of a second
    pub time: u16,
    pub current: u16,
    pub generation: u64,
}

impl Animation {
    pub fn steps(&self) -> u16 {
        self.from.abs_diff(self.to).max(1)
    }

    /// Interval between two steps in milliseconds
    pub fn step_interval_ms(&self) -> u64 {
        (self.time as u64 * 100) / self.steps() as u64
    }

    /// Advance one state; returns false once the end state is reached
    pub fn advance(&mut self) -> bool {
        if self.current == self.to {
            return false;
        }
        if self.to > self.current {
            self.current += 1;
        } else {
            self.current -= 1;
        }
        true
    }
}

/// Touch-driven level transition toward a target on the drag increment grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRamp {
    pub target: i32,
    /// Level change per step
    pub step: i32,
    pub interval_ms: u64,
    pub generation: u64,
}

impl LevelRamp {
    /// Level following `current`, or None once the target is reached
    pub fn next(&self, current: i32) -> Option<i32> {
        if current == self.target {
            return None;
        }
        let next = if self.target > current {
            current.saturating_add(self.step).min(self.target)
        } else {
            current.saturating_sub(self.step).max(self.target)
        };
        Some(next)
    }
}

/// An interactive element owned by a page or subpage
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub handle: ButtonHandle,
    pub name: String,
    pub kind: ButtonType,
    pub rect: Rect,
    pub channel: Option<Address>,
    pub address: Option<Address>,
    pub level: Option<Address>,
    pub level_y: Option<Address>,
    pub feedback: Feedback,
    pub instances: Vec<ButtonInstance>,
    /// Index into `instances` of the displayed state
    pub active: usize,
    pub visible: bool,
    pub enabled: bool,
    pub touchable: bool,
    pub range: LevelRange,
    pub level_value: i32,
    pub level_y_value: i32,
    pub slider_color: Color,
    pub slider_name: String,
    pub page_flips: Vec<PageFlip>,
    pub max_length: u16,
    pub input_mask: String,
    pub volume: u8,
    pub video: bool,
    pub focused: bool,
    pub pressed: bool,
    pub animation: Option<Animation>,
    pub ramp: Option<LevelRamp>,
    pub subview: Option<SubView>,
    pub list_view: Option<ListView>,
    pub state_id: Option<u32>,
}

impl Button {
    /// Build a live button from its project definition
    pub fn from_def(parent_id: u16, def: &ButtonDef) -> Self {
        let mut instances = def.instances.clone();
        if instances.is_empty() {
            // A button without explicit states still has an off and an on state
            instances = vec![ButtonInstance::default(), ButtonInstance::default()];
        }
        for (index, instance) in instances.iter_mut().enumerate() {
            instance.number = index as u16 + 1;
        }

        let subview = def.subview.as_ref().map(|sv| SubView {
            items: sv
                .items
                .iter()
                .map(|name| SubViewItem {
                    name: name.clone(),
                    visible: sv.show_all,
                })
                .collect(),
            padding: sv.padding,
            events: SubViewEvents::default(),
            anchor: None,
        });

        let list_view = (def.kind == ButtonType::ListView).then(ListView::default);

        Self {
            handle: ButtonHandle::new(parent_id, def.index),
            name: def.name.clone(),
            kind: def.kind,
            rect: def.rect,
            channel: def.channel,
            address: def.address,
            level: def.level,
            level_y: def.level_y,
            feedback: def.feedback,
            instances,
            active: 0,
            visible: def.visible,
            enabled: def.enabled,
            touchable: def.touchable,
            range: def.range,
            level_value: def.range.low,
            level_y_value: def.range.low,
            slider_color: Color::WHITE,
            slider_name: String::new(),
            page_flips: def.page_flips.clone(),
            max_length: def.max_length,
            input_mask: def.input_mask.clone(),
            volume: 100,
            video: false,
            focused: false,
            pressed: false,
            animation: None,
            ramp: None,
            subview,
            list_view,
            state_id: None,
        }
    }

    pub fn index(&self) -> u16 {
        self.handle.index()
    }

    /// Key used to deduplicate shared state records
    pub fn state_key(&self) -> StateKey {
        let address = self.address.unwrap_or(Address::new(0, 0));
        let channel = self.channel.unwrap_or(Address::new(0, 0));
        let level = self.level.unwrap_or(Address::new(0, 0));
        StateKey {
            kind: self.kind,
            address_port: address.port,
            address_code: address.code,
            channel: channel.code,
            channel_port: channel.port,
            level_port: level.port,
            level_channel: level.code,
        }
    }

    /// Indexes into `instances` selected by a state field
    pub fn selected(&self, selection: &StateSelection) -> Vec<usize> {
        self.instances
            .iter()
            .enumerate()
            .filter(|(_, instance)| selection.includes(instance.number))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn instances_mut<'a>(
        &'a mut self,
        selection: &'a StateSelection,
    ) -> impl Iterator<Item = &'a mut ButtonInstance> + 'a {
        self.instances
            .iter_mut()
            .filter(move |instance| selection.includes(instance.number))
    }

    pub fn current(&self) -> &ButtonInstance {
        &self.instances[self.active.min(self.instances.len() - 1)]
    }

    /// Switch the displayed instance; returns true if it changed
    pub fn set_active(&mut self, index: usize) -> bool {
        let index = index.min(self.instances.len().saturating_sub(1));
        if self.active == index {
            return false;
        }
        self.active = index;
        true
    }

    pub fn is_on(&self) -> bool {
        self.active > 0
    }

    /// Instance to display for a channel feedback event, if the feedback
    /// type follows the controller
    pub fn channel_feedback(&self, on: bool) -> Option<usize> {
        match self.feedback {
            Feedback::Channel => Some(on as usize),
            Feedback::InvertedChannel => Some(!on as usize),
            Feedback::Blink => Some(on as usize),
            Feedback::None | Feedback::On | Feedback::Momentary => None,
        }
    }

    /// Hit test in parent-local coordinates
    pub fn is_clickable(&self, x: i32, y: i32) -> bool {
        self.visible && self.enabled && self.touchable && self.rect.contains(x, y)
    }

    /// Store a level value and return the level to render
    ///
    /// The value is clamped to the range; an inverted range renders the
    /// mirrored level. Multi-state bargraphs also switch their instance.
    pub fn apply_level(&mut self, value: i32) -> i32 {
        let low = self.range.low.min(self.range.high);
        let high = self.range.high.max(self.range.low);
        self.level_value = value.clamp(low, high);
        let rendered = self.rendered_level();

        if self.kind == ButtonType::MultiStateBargraph && high > low {
            let states = self.instances.len().saturating_sub(1) as i64;
            let index = ((rendered as i64 - low as i64) * states) / (high as i64 - low as i64);
            self.set_active(index as usize);
        }
        rendered
    }

    /// Level as drawn; inverted ranges mirror the stored value
    pub fn rendered_level(&self) -> i32 {
        let low = self.range.low.min(self.range.high);
        let high = self.range.high.max(self.range.low);
        if self.range.invert {
            mirror_level(low, high, self.level_value)
        } else {
            self.level_value
        }
    }

    /// Level value a press at a local point represents (vertical slider)
    pub fn level_at(&self, _x: i32, y: i32) -> i32 {
        let (low, high) = (self.range.low, self.range.high);
        if self.rect.height <= 0 {
            return low;
        }
        let from_bottom = self.rect.height - y.clamp(0, self.rect.height);
        let value = level_along(low, high, from_bottom, self.rect.height);
        if self.range.invert {
            mirror_level(low, high, value)
        } else {
            value
        }
    }

    /// Snap a level to the drag increment grid counted from the range low
    pub fn quantize_level(&self, value: i32) -> i32 {
        let low = self.range.low.min(self.range.high) as i64;
        let high = self.range.high.max(self.range.low) as i64;
        let step = self.range.drag_increment.max(1) as i64;
        let offset = (value as i64).clamp(low, high) - low;
        let snapped = low + ((offset + step / 2) / step) * step;
        snapped.min(high) as i32
    }

    /// Ramp from the stored level to `target`, None when the change applies at once
    ///
    /// The ramp up time covers a rise over the whole range, the ramp down
    /// time a full fall.
    pub fn plan_ramp(&self, target: i32, generation: u64) -> Option<LevelRamp> {
        let step = self.range.drag_increment.max(1);
        let distance = (target as i64 - self.level_value as i64).abs();
        let time = if target > self.level_value {
            self.range.ramp_up
        } else {
            self.range.ramp_down
        };
        if time == 0 || distance <= step as i64 {
            return None;
        }
        let span = (self.range.high as i64 - self.range.low as i64).abs().max(1);
        let interval_ms = ((time as i64 * 100 * step as i64) / span).max(1) as u64;
        Some(LevelRamp { target, step, interval_ms, generation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ButtonDef;

    fn bargraph(invert: bool) -> Button {
        let def = ButtonDef {
            index: 3,
            kind: ButtonType::Bargraph,
            rect: Rect::new(0, 0, 20, 100),
            range: LevelRange {
                low: 0,
                high: 100,
                invert,
                ..LevelRange::default()
            },
            ..ButtonDef::default()
        };
        Button::from_def(1, &def)
    }

    #[test]
    fn test_default_instances() {
        let button = Button::from_def(7, &ButtonDef { index: 2, ..ButtonDef::default() });
        assert_eq!(button.instances.len(), 2);
        assert_eq!(button.instances[1].number, 2);
        assert_eq!(button.handle, ButtonHandle::new(7, 2));
    }

    #[test]
    fn test_inverted_level() {
        let mut button = bargraph(true);
        assert_eq!(button.apply_level(30), 70);
        assert_eq!(button.level_value, 30);
        assert_eq!(button.rendered_level(), 70);

        let mut button = bargraph(false);
        assert_eq!(button.apply_level(130), 100);
    }

    #[test]
    fn test_level_from_point() {
        let button = bargraph(false);
        assert_eq!(button.level_at(5, 100), 0);
        assert_eq!(button.level_at(5, 0), 100);
        assert_eq!(button.level_at(5, 25), 75);
    }

    #[test]
    fn test_extreme_range_does_not_overflow() {
        let mut button = bargraph(true);
        button.range.low = i32::MIN;
        button.range.high = i32::MAX;
        assert_eq!(button.apply_level(i32::MIN), i32::MAX);
        assert_eq!(button.apply_level(i32::MAX), i32::MIN);
        assert_eq!(button.level_at(5, 100), i32::MAX);
        assert_eq!(button.level_at(5, 0), i32::MIN);

        button.range.invert = false;
        assert_eq!(button.level_at(5, 0), i32::MAX);
        assert_eq!(mirror_level(-10, 10, 10), -10);
    }

    #[test]
    fn test_quantize_and_ramp() {
        let mut button = bargraph(false);
        button.range.drag_increment = 10;
        assert_eq!(button.quantize_level(74), 70);
        assert_eq!(button.quantize_level(75), 80);
        assert_eq!(button.quantize_level(130), 100);

        // 2 s over 0..100 in steps of 10
        let ramp = button.plan_ramp(40, 7).unwrap();
        assert_eq!((ramp.step, ramp.interval_ms, ramp.generation), (10, 200, 7));
        assert_eq!(ramp.next(0), Some(10));
        assert_eq!(ramp.next(35), Some(40));
        assert_eq!(ramp.next(40), None);

        // a single increment or a zero ramp time applies at once
        assert_eq!(button.plan_ramp(10, 0), None);
        button.range.ramp_up = 0;
        assert_eq!(button.plan_ramp(40, 0), None);
        button.level_value = 80;
        assert!(button.plan_ramp(40, 0).is_some());
    }

    #[test]
    fn test_state_selection() {
        let all = StateSelection::parse("0").unwrap();
        assert!(all.includes(5));
        let some = StateSelection::parse("1&3").unwrap();
        assert!(some.includes(3));
        assert!(!some.includes(2));

        let button = Button::from_def(1, &ButtonDef::default());
        assert_eq!(button.selected(&StateSelection::parse("2").unwrap()), vec![1]);
    }

    #[test]
    fn test_animation_steps() {
        let mut ani = Animation { from: 1, to: 3, time: 20, current: 1, generation: 0 };
        assert_eq!(ani.step_interval_ms(), 1000);
        assert!(ani.advance());
        assert!(ani.advance());
        assert!(!ani.advance());
        assert_eq!(ani.current, 3);
    }
}
