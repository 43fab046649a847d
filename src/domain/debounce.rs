// Per-key debounce and fire/cooldown state machines, advanced once per tick.

use crate::domain::errors::ConfigError;

pub const DEFAULT_FIRE_COOLDOWN: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    JustPressed,
    StillPressed,
    JustNotPressed,
    StillNotPressed,
}

impl EdgeState {
    fn next(self, held: bool) -> Self {
        match (self, held) {
            (EdgeState::JustPressed | EdgeState::StillPressed, true) => EdgeState::StillPressed,
            (EdgeState::JustPressed | EdgeState::StillPressed, false) => EdgeState::JustNotPressed,
            (EdgeState::JustNotPressed | EdgeState::StillNotPressed, true) => {
                EdgeState::JustPressed
            }
            (EdgeState::JustNotPressed | EdgeState::StillNotPressed, false) => {
                EdgeState::StillNotPressed
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    Fire,
    Cooldown,
    NotPressed,
}

/// Turns a raw held sample into edge queries and a rate-limited `fire` signal.
#[derive(Debug, Clone)]
pub struct KeyDebouncer {
    edge: EdgeState,
    fire: FireState,
    // Frames between two fires while the key stays held.
    cooldown: i32,
    cooldown_counter: i32,
}

impl KeyDebouncer {
    pub fn new() -> Self {
        Self {
            edge: EdgeState::StillNotPressed,
            fire: FireState::NotPressed,
            cooldown: DEFAULT_FIRE_COOLDOWN,
            cooldown_counter: 0,
        }
    }

    pub fn update(&mut self, held: bool) {
        self.edge = self.edge.next(held);

        self.fire = match (self.fire, held) {
            (_, false) => FireState::NotPressed,
            (FireState::NotPressed, true) => FireState::Fire,
            (FireState::Fire, true) => {
                // The fire tick itself counts toward the period.
                self.cooldown_counter = self.cooldown - 1;
                self.fire_when_elapsed()
            }
            (FireState::Cooldown, true) => {
                self.cooldown_counter -= 1;
                self.fire_when_elapsed()
            }
        };
    }

    fn fire_when_elapsed(&self) -> FireState {
        if self.cooldown_counter <= 0 {
            FireState::Fire
        } else {
            FireState::Cooldown
        }
    }

    pub fn set_cooldown(&mut self, frames: i32) -> Result<(), ConfigError> {
        if frames <= 0 {
            return Err(ConfigError::InvalidCooldown(frames));
        }
        self.cooldown = frames;
        Ok(())
    }

    pub fn cooldown(&self) -> i32 {
        self.cooldown
    }

    pub fn edge_state(&self) -> EdgeState {
        self.edge
    }

    pub fn fire_state(&self) -> FireState {
        self.fire
    }

    pub fn just_pressed(&self) -> bool {
        self.edge == EdgeState::JustPressed
    }

    pub fn still_pressed(&self) -> bool {
        self.edge == EdgeState::StillPressed
    }

    pub fn just_not_pressed(&self) -> bool {
        self.edge == EdgeState::JustNotPressed
    }

    pub fn still_not_pressed(&self) -> bool {
        self.edge == EdgeState::StillNotPressed
    }

    pub fn fire(&self) -> bool {
        self.fire == FireState::Fire
    }
}

impl Default for KeyDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
