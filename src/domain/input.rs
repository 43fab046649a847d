// Per-tick input view: the sampled held flags plus one debouncer per tracked key.

use crate::domain::debounce::KeyDebouncer;
use crate::domain::errors::ConfigError;
use crate::domain::keys::{KeyId, KeySnapshot};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: KeySnapshot,
    debouncers: HashMap<KeyId, KeyDebouncer>,
}

impl InputState {
    pub fn new(keys: impl IntoIterator<Item = KeyId>) -> Self {
        Self {
            held: KeySnapshot::default(),
            debouncers: keys
                .into_iter()
                .map(|key| (key, KeyDebouncer::new()))
                .collect(),
        }
    }

    /// Advances every debouncer from the same snapshot so all keys observe one instant.
    pub fn update(&mut self, snapshot: KeySnapshot) {
        for (key, debouncer) in self.debouncers.iter_mut() {
            debouncer.update(snapshot.is_held(key));
        }
        self.held = snapshot;
    }

    pub fn is_tracked(&self, key: &KeyId) -> bool {
        self.debouncers.contains_key(key)
    }

    pub fn held(&self, key: &KeyId) -> bool {
        self.held.is_held(key)
    }

    pub fn debouncer(&self, key: &KeyId) -> Option<&KeyDebouncer> {
        self.debouncers.get(key)
    }

    pub fn just_pressed(&self, key: &KeyId) -> bool {
        self.query(key, KeyDebouncer::just_pressed)
    }

    pub fn still_pressed(&self, key: &KeyId) -> bool {
        self.query(key, KeyDebouncer::still_pressed)
    }

    pub fn just_not_pressed(&self, key: &KeyId) -> bool {
        self.query(key, KeyDebouncer::just_not_pressed)
    }

    pub fn still_not_pressed(&self, key: &KeyId) -> bool {
        self.query(key, KeyDebouncer::still_not_pressed)
    }

    pub fn fire(&self, key: &KeyId) -> bool {
        self.query(key, KeyDebouncer::fire)
    }

    pub fn set_cooldown(&mut self, key: &KeyId, frames: i32) -> Result<(), ConfigError> {
        self.debouncers
            .get_mut(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?
            .set_cooldown(frames)
    }

    fn query(&self, key: &KeyId, read: fn(&KeyDebouncer) -> bool) -> bool {
        self.debouncers.get(key).is_some_and(read)
    }
}
