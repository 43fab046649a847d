// Fan-out of decoded key events to everything that registered interest.

use crate::domain::{KeyEvent, KeyEventKind, KeySignals};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Receives raw key events on the channel's delivery task. Implementations must
/// return quickly; the registry lock is held while they run.
pub trait KeyListener: Send + Sync {
    fn keyup(&self, event: &KeyEvent);
    fn keydown(&self, event: &KeyEvent);
}

impl KeyListener for KeySignals {
    fn keyup(&self, event: &KeyEvent) {
        if let Some(key) = self.apply(event) {
            trace!(%key, "key released");
        }
    }

    fn keydown(&self, event: &KeyEvent) {
        if let Some(key) = self.apply(event) {
            trace!(%key, "key pressed");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registered {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn KeyListener>)>,
}

/// Registration and delivery share one lock, so a listener never observes a
/// half-applied event and removal takes effect before the next delivery.
#[derive(Default)]
pub struct KeyListenerRegistry {
    inner: Mutex<Registered>,
}

impl KeyListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Safe to call before or after the channel connects.
    pub fn register(&self, listener: Arc<dyn KeyListener>) -> ListenerId {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, listener));
        id
    }

    /// Returns false when the id was not registered (or already removed).
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(registered, _)| *registered != id);
        inner.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers one event to every listener, in registration order.
    pub fn dispatch(&self, event: &KeyEvent) {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, listener) in inner.listeners.iter() {
            match event.kind {
                KeyEventKind::KeyUp => listener.keyup(event),
                KeyEventKind::KeyDown => listener.keydown(event),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeyBindings, KeyId};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(KeyEventKind, String)>>,
    }

    impl KeyListener for Recorder {
        fn keyup(&self, event: &KeyEvent) {
            self.seen
                .lock()
                .expect("recorder mutex poisoned")
                .push((KeyEventKind::KeyUp, event.key.clone()));
        }

        fn keydown(&self, event: &KeyEvent) {
            self.seen
                .lock()
                .expect("recorder mutex poisoned")
                .push((KeyEventKind::KeyDown, event.key.clone()));
        }
    }

    fn event(kind: KeyEventKind, key: &str) -> KeyEvent {
        KeyEvent {
            kind,
            key: key.to_string(),
        }
    }

    #[test]
    fn when_event_is_dispatched_then_every_listener_gets_matching_callback() {
        let registry = KeyListenerRegistry::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        registry.register(first.clone());
        registry.register(second.clone());

        registry.dispatch(&event(KeyEventKind::KeyDown, "w"));
        registry.dispatch(&event(KeyEventKind::KeyUp, "w"));

        let expected = vec![
            (KeyEventKind::KeyDown, "w".to_string()),
            (KeyEventKind::KeyUp, "w".to_string()),
        ];
        assert_eq!(*first.seen.lock().expect("recorder mutex poisoned"), expected);
        assert_eq!(*second.seen.lock().expect("recorder mutex poisoned"), expected);
    }

    #[test]
    fn when_listener_is_unregistered_then_it_stops_receiving_events() {
        let registry = KeyListenerRegistry::new();
        let recorder = Arc::new(Recorder::default());
        let id = registry.register(recorder.clone());

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        registry.dispatch(&event(KeyEventKind::KeyDown, "q"));

        assert!(registry.is_empty());
        assert!(recorder.seen.lock().expect("recorder mutex poisoned").is_empty());
    }

    #[test]
    fn when_key_signals_are_registered_then_dispatch_updates_held_flags() {
        let registry = KeyListenerRegistry::new();
        let signals = Arc::new(KeySignals::new(KeyBindings::default()));
        registry.register(signals.clone());

        registry.dispatch(&event(KeyEventKind::KeyDown, "ArrowLeft"));
        assert!(signals.is_held(&KeyId::LEFT));

        registry.dispatch(&event(KeyEventKind::KeyUp, "ArrowLeft"));
        assert!(!signals.is_held(&KeyId::LEFT));
    }
}
