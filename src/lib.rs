pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::{KeyBindings, KeyId, NamedColor, NamedSymbol};
pub use frameworks::runtime::{init_runtime, run_game};
pub use frameworks::session::{GameSession, GameSettings, SessionError};
pub use use_cases::{Credentials, Game, GameContext, GameFns, StopReason};
