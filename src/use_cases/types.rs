// Use-case level inputs/outputs for a game session.

use std::fmt;

/// Identity passed through the connection handshake. Immutable once a session exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub session_id: i64,
    pub username: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(session_id: i64, username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            session_id,
            username: username.into(),
            api_key: api_key.into(),
        }
    }
}

/// Why the game loop reached its Stopped state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    // The game called `quit()` during a tick.
    Quit,
    // The configured frame limit was reached.
    FrameLimit(u64),
    // The transport closed or failed after the handshake.
    ConnectionLost(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Quit => write!(f, "game quit"),
            StopReason::FrameLimit(limit) => write!(f, "frame limit of {limit} reached"),
            StopReason::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}
