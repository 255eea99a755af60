//! Button-state table
//!
//! Many buttons may respond to one address range. The table hands out one
//! shared state record per (type, address, channel, level) key so repeated
//! protocol events reuse it instead of allocating duplicates.

use super::style::ButtonType;
use std::collections::HashMap;

/// Full key of a shared state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub kind: ButtonType,
    pub address_port: u16,
    pub address_code: u16,
    pub channel: u16,
    pub channel_port: u16,
    pub level_port: u16,
    pub level_channel: u16,
}

/// State shared by every button with the same key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub id: u32,
    pub key: StateKey,
    /// Last channel state reported by the controller
    pub channel_on: bool,
    /// Last raw level reported by the controller
    pub level: Option<i32>,
}

/// Deduplicated lookup of button states
#[derive(Debug, Default)]
pub struct ButtonStateTable {
    by_key: HashMap<StateKey, u32>,
    states: Vec<ButtonState>,
}

impl ButtonStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the ID of the record for `key`, creating it on first use
    pub fn add_button_state(&mut self, key: StateKey) -> u32 {
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }
        let id = self.states.len() as u32 + 1;
        self.states.push(ButtonState {
            id,
            key,
            channel_on: false,
            level: None,
        });
        self.by_key.insert(key, id);
        id
    }

    pub fn find(&self, key: &StateKey) -> Option<&ButtonState> {
        self.by_key.get(key).and_then(|id| self.get(*id))
    }

    pub fn get(&self, id: u32) -> Option<&ButtonState> {
        id.checked_sub(1)
            .and_then(|index| self.states.get(index as usize))
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut ButtonState> {
        id.checked_sub(1)
            .and_then(|index| self.states.get_mut(index as usize))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(channel: u16) -> StateKey {
        StateKey {
            kind: ButtonType::General,
            address_port: 1,
            address_code: channel,
            channel,
            channel_port: 1,
            level_port: 0,
            level_channel: 0,
        }
    }

    #[test]
    fn test_same_key_reuses_state() {
        let mut table = ButtonStateTable::new();
        let a = table.add_button_state(key(10));
        let b = table.add_button_state(key(10));
        let c = table.add_button_state(key(11));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_lookup_by_key_and_id() {
        let mut table = ButtonStateTable::new();
        let id = table.add_button_state(key(3));
        table.get_mut(id).unwrap().channel_on = true;
        assert!(table.find(&key(3)).unwrap().channel_on);
        assert_eq!(table.get(id).unwrap().key, key(3));
        assert!(table.get(0).is_none());
        assert!(table.find(&key(4)).is_none());
    }
}
