// Domain layer: input state machines, board model and the rendering port.

pub mod board;
pub mod debounce;
pub mod errors;
pub mod input;
pub mod keys;
pub mod ports;

pub use board::{GameCell, GameGrid, MAX_BOARD_CELLS, NamedColor, NamedSymbol};
pub use debounce::{DEFAULT_FIRE_COOLDOWN, EdgeState, FireState, KeyDebouncer};
pub use errors::{BoardError, ConfigError};
pub use input::InputState;
pub use keys::{KeyBindings, KeyEvent, KeyEventKind, KeyId, KeySignals, KeySnapshot};
pub use ports::{
    BoardMetadata, FrameOutput, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN, OutputError,
};
