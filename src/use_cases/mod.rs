// Use cases layer: the fixed-rate game loop and its inputs/outputs.

pub mod scheduler;
pub mod types;

pub use scheduler::{
    FrameClock, FrameScheduler, Game, GameContext, GameFns, LoopError, SchedulerSettings,
    SchedulerState,
};
pub use types::{Credentials, StopReason};
