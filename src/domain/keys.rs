// Logical keys, wire-name bindings and the raw held/not-held signal table.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Logical name of a trackable key, independent of the wire key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(Cow<'static, str>);

impl KeyId {
    pub const UP: KeyId = KeyId(Cow::Borrowed("up"));
    pub const DOWN: KeyId = KeyId(Cow::Borrowed("down"));
    pub const LEFT: KeyId = KeyId(Cow::Borrowed("left"));
    pub const RIGHT: KeyId = KeyId(Cow::Borrowed("right"));
    pub const W: KeyId = KeyId(Cow::Borrowed("w"));
    pub const A: KeyId = KeyId(Cow::Borrowed("a"));
    pub const S: KeyId = KeyId(Cow::Borrowed("s"));
    pub const D: KeyId = KeyId(Cow::Borrowed("d"));
    pub const Q: KeyId = KeyId(Cow::Borrowed("q"));
    pub const SPACE: KeyId = KeyId(Cow::Borrowed("space"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    KeyUp,
    KeyDown,
}

/// A decoded inbound key event: `{"type": "keyup"|"keydown", "key": <wire name>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key: String,
}

/// Maps wire key names (`"ArrowUp"`, `" "`) to logical keys.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    by_wire_name: HashMap<String, KeyId>,
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            by_wire_name: HashMap::new(),
        }
    }

    /// Adds or replaces the logical key bound to a wire name.
    #[must_use]
    pub fn with_binding(mut self, wire_name: impl Into<String>, key: KeyId) -> Self {
        self.by_wire_name.insert(wire_name.into(), key);
        self
    }

    pub fn resolve(&self, wire_name: &str) -> Option<&KeyId> {
        self.by_wire_name.get(wire_name)
    }

    /// Distinct logical keys, sorted so iteration order is stable.
    pub fn keys(&self) -> Vec<KeyId> {
        let mut keys: Vec<KeyId> = self.by_wire_name.values().cloned().collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::empty()
            .with_binding("ArrowUp", KeyId::UP)
            .with_binding("ArrowDown", KeyId::DOWN)
            .with_binding("ArrowLeft", KeyId::LEFT)
            .with_binding("ArrowRight", KeyId::RIGHT)
            .with_binding("w", KeyId::W)
            .with_binding("a", KeyId::A)
            .with_binding("s", KeyId::S)
            .with_binding("d", KeyId::D)
            .with_binding("q", KeyId::Q)
            .with_binding(" ", KeyId::SPACE)
    }
}

/// Point-in-time copy of every tracked key's held flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySnapshot {
    held: HashMap<KeyId, bool>,
}

impl KeySnapshot {
    pub fn is_held(&self, key: &KeyId) -> bool {
        self.held.get(key).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyId, bool)> {
        self.held.iter().map(|(key, held)| (key, *held))
    }
}

impl FromIterator<(KeyId, bool)> for KeySnapshot {
    fn from_iter<I: IntoIterator<Item = (KeyId, bool)>>(iter: I) -> Self {
        Self {
            held: iter.into_iter().collect(),
        }
    }
}

/// Raw "currently held" flags, written by the delivery path and sampled once per tick.
///
/// Entries are plain booleans, so a snapshot taken between two writes is always a
/// consistent view of each key. Widening an entry beyond a boolean needs a real
/// per-tick exchange instead of this table.
#[derive(Debug)]
pub struct KeySignals {
    bindings: KeyBindings,
    held: Mutex<HashMap<KeyId, bool>>,
}

impl KeySignals {
    pub fn new(bindings: KeyBindings) -> Self {
        let held = bindings.keys().into_iter().map(|key| (key, false)).collect();
        Self {
            bindings,
            held: Mutex::new(held),
        }
    }

    /// Applies a decoded event. Returns the logical key that changed state, or
    /// `None` when the wire name is not bound.
    pub fn apply(&self, event: &KeyEvent) -> Option<KeyId> {
        let key = self.bindings.resolve(&event.key)?.clone();
        let is_down = event.kind == KeyEventKind::KeyDown;
        // A poisoned table still holds valid booleans.
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.insert(key.clone(), is_down);
        Some(key)
    }

    pub fn is_held(&self, key: &KeyId) -> bool {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.get(key).copied().unwrap_or(false)
    }

    pub fn snapshot(&self) -> KeySnapshot {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        KeySnapshot { held: held.clone() }
    }

    pub fn tracked_keys(&self) -> Vec<KeyId> {
        self.bindings.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: KeyEventKind, key: &str) -> KeyEvent {
        KeyEvent {
            kind,
            key: key.to_string(),
        }
    }

    #[test]
    fn when_arrow_up_is_pressed_then_released_then_up_signal_follows() {
        let signals = KeySignals::new(KeyBindings::default());

        signals.apply(&event(KeyEventKind::KeyDown, "ArrowUp"));
        assert!(signals.is_held(&KeyId::UP));

        signals.apply(&event(KeyEventKind::KeyUp, "ArrowUp"));
        assert!(!signals.is_held(&KeyId::UP));
    }

    #[test]
    fn when_key_is_not_bound_then_all_signals_are_unchanged() {
        let signals = KeySignals::new(KeyBindings::default());
        signals.apply(&event(KeyEventKind::KeyDown, "w"));
        let before = signals.snapshot();

        let changed = signals.apply(&event(KeyEventKind::KeyDown, "Escape"));

        assert_eq!(changed, None);
        assert_eq!(signals.snapshot(), before);
    }

    #[test]
    fn when_space_wire_name_is_pressed_then_space_key_is_held() {
        let signals = KeySignals::new(KeyBindings::default());

        let changed = signals.apply(&event(KeyEventKind::KeyDown, " "));

        assert_eq!(changed, Some(KeyId::SPACE));
        assert!(signals.snapshot().is_held(&KeyId::SPACE));
    }

    #[test]
    fn when_custom_binding_is_added_then_new_key_is_tracked_without_code_change() {
        let bindings = KeyBindings::default().with_binding("Enter", KeyId::new("enter"));
        let signals = KeySignals::new(bindings);

        signals.apply(&event(KeyEventKind::KeyDown, "Enter"));

        assert!(signals.is_held(&KeyId::new("enter")));
        assert!(signals.tracked_keys().contains(&KeyId::new("enter")));
    }

    #[test]
    fn when_default_bindings_are_used_then_ten_keys_are_tracked() {
        let keys = KeyBindings::default().keys();

        assert_eq!(keys.len(), 10);
        assert!(keys.contains(&KeyId::Q));
    }

    #[test]
    fn owned_and_constant_key_ids_compare_equal() {
        assert_eq!(KeyId::new("up"), KeyId::UP);
    }
}
