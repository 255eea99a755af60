//! Subpages (popups) and the collapsible-popup state machine

use super::button::Button;
use super::geometry::Rect;
use super::page::ButtonHost;
use super::style::Effect;
use crate::project::SubPageDef;
use serde::{Deserialize, Serialize};

/// Z-order of a popup on its host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZOrder(pub i32);

impl ZOrder {
    /// Sentinel for a popup that is not shown
    pub const INVALID: ZOrder = ZOrder(-1);

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

/// Edge a collapsible popup collapses towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseDirection {
    Left,
    Right,
    #[default]
    Up,
    Down,
}

/// Collapsible sub-state of a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollapseState {
    /// Not shown
    #[default]
    Closed,
    /// Shown collapsed, only the handle area is visible
    Small,
    /// Shown fully open
    Full,
}

/// Collapsible configuration and live state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collapsible {
    pub direction: CollapseDirection,
    /// Size in pixels that stays visible when collapsed
    pub offset: i32,
    pub state: CollapseState,
    /// Offset of a dynamic (partial) open, `None` when fully open
    pub dynamic_offset: Option<i32>,
}

impl Collapsible {
    pub fn new(direction: CollapseDirection, offset: i32) -> Self {
        Self {
            direction,
            offset,
            state: CollapseState::Closed,
            dynamic_offset: None,
        }
    }

    /// Apply a rule target, returns true when the state changed
    pub fn apply(&mut self, target: RuleTarget) -> bool {
        let before = (self.state, self.dynamic_offset);
        match target {
            RuleTarget::Collapsed => {
                self.state = CollapseState::Small;
                self.dynamic_offset = None;
            }
            RuleTarget::Open => {
                self.state = CollapseState::Full;
                self.dynamic_offset = None;
            }
            RuleTarget::Dynamic(offset) => {
                self.state = CollapseState::Full;
                self.dynamic_offset = Some(offset);
            }
        }
        before != (self.state, self.dynamic_offset)
    }

    /// Default toggle without rules: collapsed and open swap
    pub fn default_toggle(&self) -> RuleTarget {
        match self.state {
            CollapseState::Full => RuleTarget::Collapsed,
            CollapseState::Closed | CollapseState::Small => RuleTarget::Open,
        }
    }
}

/// State pattern on the left of a toggle rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePattern {
    Any,
    Collapsed,
    Open,
    /// Dynamic open, at any offset when `None`
    Dynamic(Option<i32>),
}

/// State on the right of a toggle rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    Collapsed,
    Open,
    Dynamic(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleRule {
    pub from: RulePattern,
    pub to: RuleTarget,
}

impl RulePattern {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "*" => Some(RulePattern::Any),
            "c" => Some(RulePattern::Collapsed),
            "o" => Some(RulePattern::Open),
            "d" => Some(RulePattern::Dynamic(None)),
            _ => token
                .strip_prefix('d')
                .and_then(|n| n.parse().ok())
                .map(|n| RulePattern::Dynamic(Some(n))),
        }
    }

    fn matches(&self, collapsible: &Collapsible) -> bool {
        match (self, collapsible.state, collapsible.dynamic_offset) {
            (RulePattern::Any, _, _) => true,
            (RulePattern::Collapsed, CollapseState::Small | CollapseState::Closed, _) => true,
            (RulePattern::Open, CollapseState::Full, None) => true,
            (RulePattern::Dynamic(None), CollapseState::Full, Some(_)) => true,
            (RulePattern::Dynamic(Some(n)), CollapseState::Full, Some(offset)) => *n == offset,
            _ => false,
        }
    }
}

impl RuleTarget {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "c" => Some(RuleTarget::Collapsed),
            "o" => Some(RuleTarget::Open),
            _ => token
                .strip_prefix('d')
                .and_then(|n| n.parse().ok())
                .map(RuleTarget::Dynamic),
        }
    }
}

/// Ordered toggle rule list, e.g. `c->o, o->d100, *->c`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleRules(pub Vec<ToggleRule>);

impl ToggleRules {
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut rules = Vec::new();
        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (from, to) = part
                .split_once("->")
                .ok_or_else(|| format!("rule '{}' has no '->'", part))?;
            let from = RulePattern::parse(from.trim().to_ascii_lowercase().as_str())
                .ok_or_else(|| format!("invalid source state in '{}'", part))?;
            let to = RuleTarget::parse(to.trim().to_ascii_lowercase().as_str())
                .ok_or_else(|| format!("invalid target state in '{}'", part))?;
            rules.push(ToggleRule { from, to });
        }
        if rules.is_empty() {
            return Err("empty rule list".to_string());
        }
        Ok(Self(rules))
    }

    /// First rule whose source matches the current state
    pub fn select(&self, collapsible: &Collapsible) -> Option<RuleTarget> {
        self.0
            .iter()
            .find(|rule| rule.from.matches(collapsible))
            .map(|rule| rule.to)
    }
}

/// A popup surface hosted on a page
#[derive(Debug, Clone, PartialEq)]
pub struct SubPage {
    pub id: u16,
    pub name: String,
    pub group: String,
    pub rect: Rect,
    /// Position from the project, restored when `reset_position` is set
    pub home: (i32, i32),
    pub reset_position: bool,
    pub modal: bool,
    pub visible: bool,
    pub z: ZOrder,
    /// Page currently hosting this popup
    pub parent: Option<u16>,
    pub show_effect: Effect,
    pub hide_effect: Effect,
    /// Auto-hide timeout in tenths of a second, 0 = none
    pub timeout: u16,
    /// Bumped on every show so stale timeouts are ignored
    pub show_generation: u64,
    pub collapsible: Option<Collapsible>,
    pub buttons: Vec<Button>,
}

impl SubPage {
    pub fn from_def(def: &SubPageDef) -> Self {
        Self {
            id: def.id,
            name: def.name.clone(),
            group: def.group.clone(),
            rect: def.rect,
            home: (def.rect.left, def.rect.top),
            reset_position: def.reset_position,
            modal: def.modal,
            visible: false,
            z: ZOrder::INVALID,
            parent: None,
            show_effect: def.show_effect,
            hide_effect: def.hide_effect,
            timeout: def.timeout,
            show_generation: 0,
            collapsible: def
                .collapsible
                .map(|c| Collapsible::new(c.direction, c.offset)),
            buttons: def
                .buttons
                .iter()
                .map(|b| Button::from_def(def.id, b))
                .collect(),
        }
    }

    pub fn in_group(&self, group: &str) -> bool {
        !self.group.is_empty() && self.group.eq_ignore_ascii_case(group)
    }

    /// Mark as shown with the given Z-order
    pub fn mark_shown(&mut self, parent: u16, z: i32) {
        self.visible = true;
        self.parent = Some(parent);
        self.z = ZOrder(z);
        self.show_generation += 1;
        if self.reset_position {
            self.rect.left = self.home.0;
            self.rect.top = self.home.1;
        }
        if let Some(collapsible) = self.collapsible.as_mut() {
            collapsible.state = CollapseState::Small;
            collapsible.dynamic_offset = None;
        }
    }

    /// Mark as hidden; returns the released Z-order
    pub fn mark_hidden(&mut self) -> ZOrder {
        let z = self.z;
        self.visible = false;
        self.z = ZOrder::INVALID;
        self.show_generation += 1;
        if let Some(collapsible) = self.collapsible.as_mut() {
            collapsible.state = CollapseState::Closed;
            collapsible.dynamic_offset = None;
        }
        z
    }
}

impl ButtonHost for SubPage {
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

/// Stable sort of popups by ascending Z; ties keep their original order
pub fn sort_by_z(popups: &mut [&SubPage]) {
    popups.sort_by_key(|popup| popup.z);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collapsed() -> Collapsible {
        Collapsible {
            state: CollapseState::Small,
            ..Collapsible::new(CollapseDirection::Up, 20)
        }
    }

    #[test]
    fn test_rule_table_first_match_wins() {
        let rules = ToggleRules::parse("c->o, o->d100, *->c").unwrap();
        let mut state = collapsed();

        let target = rules.select(&state).unwrap();
        assert_eq!(target, RuleTarget::Open);
        assert!(state.apply(target));
        assert_eq!(state.state, CollapseState::Full);

        let target = rules.select(&state).unwrap();
        assert_eq!(target, RuleTarget::Dynamic(100));
        state.apply(target);
        assert_eq!(state.dynamic_offset, Some(100));

        // only the wildcard matches a dynamic state
        assert_eq!(rules.select(&state), Some(RuleTarget::Collapsed));
    }

    #[test]
    fn test_rule_parse_errors() {
        assert!(ToggleRules::parse("").is_err());
        assert!(ToggleRules::parse("c=>o").is_err());
        assert!(ToggleRules::parse("x->o").is_err());
        assert!(ToggleRules::parse("c->*").is_err());
        assert_eq!(ToggleRules::parse(" d50 -> c ").unwrap().0.len(), 1);
    }

    #[test]
    fn test_no_match_without_wildcard() {
        let rules = ToggleRules::parse("o->c").unwrap();
        assert_eq!(rules.select(&collapsed()), None);
    }

    #[test]
    fn test_default_toggle() {
        let mut state = collapsed();
        assert_eq!(state.default_toggle(), RuleTarget::Open);
        state.apply(RuleTarget::Open);
        assert_eq!(state.default_toggle(), RuleTarget::Collapsed);
    }

    #[test]
    fn test_show_hide_marks() {
        let mut popup = SubPage::from_def(&SubPageDef {
            id: 500,
            name: "Volume".into(),
            ..SubPageDef::default()
        });
        popup.mark_shown(1, 3);
        assert!(popup.visible);
        assert_eq!(popup.z, ZOrder(3));
        assert_eq!(popup.mark_hidden(), ZOrder(3));
        assert!(!popup.z.is_valid());
    }

    proptest! {
        #[test]
        fn prop_sort_by_z_is_stable(zs in proptest::collection::vec(0i32..4, 0..12)) {
            let popups: Vec<SubPage> = zs
                .iter()
                .enumerate()
                .map(|(i, &z)| {
                    let mut popup = SubPage::from_def(&SubPageDef {
                        id: 500 + i as u16,
                        name: format!("P{}", i),
                        ..SubPageDef::default()
                    });
                    popup.mark_shown(1, z);
                    popup
                })
                .collect();
            let mut sorted: Vec<&SubPage> = popups.iter().collect();
            sort_by_z(&mut sorted);
            for pair in sorted.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.z < b.z || (a.z == b.z && a.id < b.id));
            }
        }
    }
}
