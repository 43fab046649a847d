// Domain-level errors raised synchronously at construction or by board access.

use crate::domain::keys::KeyId;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    // Fire cooldowns are measured in frames and must be positive.
    InvalidCooldown(i32),
    BoardTooLarge { rows: usize, cols: usize, max_cells: usize },
    EmptyBoard,
    InvalidFrameRate(f64),
    UnknownKey(KeyId),
    MissingCredentials(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCooldown(value) => {
                write!(f, "fire cooldown must be positive, got {value}")
            }
            ConfigError::BoardTooLarge {
                rows,
                cols,
                max_cells,
            } => write!(
                f,
                "board of {rows}x{cols} exceeds the {max_cells} cell budget"
            ),
            ConfigError::EmptyBoard => write!(f, "board must have at least one row and column"),
            ConfigError::InvalidFrameRate(fps) => {
                write!(f, "frame rate must be a positive number, got {fps}")
            }
            ConfigError::UnknownKey(key) => write!(f, "key {key} is not tracked"),
            ConfigError::MissingCredentials(var) => write!(f, "missing credential {var}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::OutOfBounds {
                row,
                col,
                rows,
                cols,
            } => write!(f, "cell ({row}, {col}) is outside the {rows}x{cols} board"),
        }
    }
}

impl std::error::Error for BoardError {}
