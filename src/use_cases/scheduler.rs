// Fixed-rate game loop: sample input, run game logic, render, pace the frame.

use super::types::StopReason;
use crate::domain::board::{GameGrid, NamedColor, NamedSymbol};
use crate::domain::errors::{BoardError, ConfigError};
use crate::domain::input::InputState;
use crate::domain::keys::{KeyId, KeySignals};
use crate::domain::ports::{BoardMetadata, FrameOutput, OutputError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_FPS: f64 = 30.0;

/// The two extension points a game provides to the loop.
pub trait Game {
    /// Called once, before the first tick.
    fn initialize(&mut self, ctx: &mut GameContext);

    /// Called once per tick, after input has been sampled.
    fn game_loop(&mut self, ctx: &mut GameContext);
}

/// Adapts a pair of closures into a [`Game`].
pub struct GameFns<I, L> {
    pub initialize: I,
    pub game_loop: L,
}

impl<I, L> Game for GameFns<I, L>
where
    I: FnMut(&mut GameContext),
    L: FnMut(&mut GameContext),
{
    fn initialize(&mut self, ctx: &mut GameContext) {
        (self.initialize)(ctx)
    }

    fn game_loop(&mut self, ctx: &mut GameContext) {
        (self.game_loop)(ctx)
    }
}

/// Everything game logic may touch during a tick. Owned by the loop thread.
pub struct GameContext {
    board: GameGrid,
    input: InputState,
    metadata: BoardMetadata,
    frame: u64,
    fps: f64,
    quit_requested: bool,
}

impl GameContext {
    /// Ends the game after the current frame has been rendered.
    pub fn quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Number of ticks completed before the current one.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Target rate; the real rate can be lower if a tick overruns its budget.
    pub fn frame_rate(&self) -> f64 {
        self.fps
    }

    pub fn set_title(&mut self, title: &str) {
        self.metadata.set_title(title);
    }

    pub fn set_description(&mut self, description: &str) {
        self.metadata.set_description(description);
    }

    pub fn metadata(&self) -> &BoardMetadata {
        &self.metadata
    }

    pub fn board(&self) -> &GameGrid {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut GameGrid {
        &mut self.board
    }

    pub fn board_width(&self) -> usize {
        self.board.width()
    }

    pub fn board_height(&self) -> usize {
        self.board.height()
    }

    pub fn set_bg_color(
        &mut self,
        row: usize,
        col: usize,
        color: NamedColor,
    ) -> Result<(), BoardError> {
        self.board.set_bg_color(row, col, color)
    }

    pub fn draw_symbol(
        &mut self,
        row: usize,
        col: usize,
        symbol: NamedSymbol,
        color: NamedColor,
    ) -> Result<(), BoardError> {
        self.board.draw_symbol(row, col, symbol, color)
    }

    pub fn set_fg_color(
        &mut self,
        row: usize,
        col: usize,
        color: NamedColor,
    ) -> Result<(), BoardError> {
        self.board.set_fg_color(row, col, color)
    }

    pub fn set_symbol(
        &mut self,
        row: usize,
        col: usize,
        symbol: NamedSymbol,
    ) -> Result<(), BoardError> {
        self.board.set_symbol(row, col, symbol)
    }

    pub fn bg_color(&self, row: usize, col: usize) -> Option<NamedColor> {
        self.board.bg_color(row, col)
    }

    pub fn symbol(&self, row: usize, col: usize) -> Option<NamedSymbol> {
        self.board.symbol(row, col)
    }

    pub fn symbol_color(&self, row: usize, col: usize) -> Option<NamedColor> {
        self.board.symbol_color(row, col)
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Raw sample for this tick.
    pub fn key_held(&self, key: &KeyId) -> bool {
        self.input.held(key)
    }

    pub fn key_just_pressed(&self, key: &KeyId) -> bool {
        self.input.just_pressed(key)
    }

    pub fn key_still_pressed(&self, key: &KeyId) -> bool {
        self.input.still_pressed(key)
    }

    pub fn key_just_not_pressed(&self, key: &KeyId) -> bool {
        self.input.just_not_pressed(key)
    }

    pub fn key_still_not_pressed(&self, key: &KeyId) -> bool {
        self.input.still_not_pressed(key)
    }

    pub fn key_fire(&self, key: &KeyId) -> bool {
        self.input.fire(key)
    }

    pub fn set_key_fire_cooldown(&mut self, key: &KeyId, frames: i32) -> Result<(), ConfigError> {
        self.input.set_cooldown(key, frames)
    }
}

/// Target rate and the start of the previous frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_time: Duration,
    last_frame: Instant,
}

impl FrameClock {
    pub fn new(fps: f64) -> Result<Self, ConfigError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ConfigError::InvalidFrameRate(fps));
        }
        // Rates so low that one frame overflows a Duration are rejected too.
        let frame_time = Duration::try_from_secs_f64(1.0 / fps)
            .map_err(|_| ConfigError::InvalidFrameRate(fps))?;
        Ok(Self {
            frame_time,
            last_frame: Instant::now(),
        })
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    pub fn reset(&mut self, now: Instant) {
        self.last_frame = now;
    }

    /// Remaining budget of the current frame; `None` when the frame overran.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        let next_frame = self.last_frame + self.frame_time;
        next_frame
            .checked_duration_since(now)
            .filter(|wait| !wait.is_zero())
    }

    /// Sleeps out the rest of the frame budget. Running behind only shortens the
    /// sleep; missed frames are never caught up.
    pub async fn pace(&mut self) {
        if let Some(wait) = self.wait_time(Instant::now()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame = Instant::now();
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub rows: usize,
    pub cols: usize,
    pub fps: f64,
    // Hard stop after this many ticks (automated runs).
    pub frame_limit: Option<u64>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            fps: DEFAULT_FPS,
            frame_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    AlreadyStarted(SchedulerState),
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::AlreadyStarted(state) => {
                write!(f, "game loop cannot start from state {state:?}")
            }
        }
    }
}

impl std::error::Error for LoopError {}

type ShutdownHook = Box<dyn FnOnce(&StopReason) + Send>;

pub struct FrameScheduler {
    state: SchedulerState,
    clock: FrameClock,
    ctx: GameContext,
    signals: Arc<KeySignals>,
    frame_limit: Option<u64>,
    metadata_published: bool,
    // Failure reported by a send since the last tick.
    pending_failure: Option<String>,
    shutdown_hook: Option<ShutdownHook>,
}

impl FrameScheduler {
    /// Validates the board and frame rate. Fails before any networking happens.
    pub fn new(settings: SchedulerSettings, signals: Arc<KeySignals>) -> Result<Self, ConfigError> {
        let board = GameGrid::new(settings.rows, settings.cols)?;
        let clock = FrameClock::new(settings.fps)?;
        let input = InputState::new(signals.tracked_keys());

        Ok(Self {
            state: SchedulerState::NotStarted,
            clock,
            ctx: GameContext {
                board,
                input,
                metadata: BoardMetadata::default(),
                frame: 0,
                fps: settings.fps,
                quit_requested: false,
            },
            signals,
            frame_limit: settings.frame_limit.filter(|limit| *limit > 0),
            metadata_published: false,
            pending_failure: None,
            shutdown_hook: None,
        })
    }

    /// Runs once the loop stops, whatever the reason.
    #[must_use]
    pub fn with_shutdown_hook(mut self, hook: impl FnOnce(&StopReason) + Send + 'static) -> Self {
        self.shutdown_hook = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    pub async fn start<G, O>(
        &mut self,
        game: &mut G,
        output: &mut O,
    ) -> Result<StopReason, LoopError>
    where
        G: Game + ?Sized,
        O: FrameOutput + ?Sized,
    {
        if self.state != SchedulerState::NotStarted {
            return Err(LoopError::AlreadyStarted(self.state));
        }
        self.state = SchedulerState::Running;
        info!(
            fps = self.ctx.fps,
            rows = self.ctx.board.height(),
            cols = self.ctx.board.width(),
            frame_limit = ?self.frame_limit,
            "game loop starting"
        );

        self.clock.reset(Instant::now());
        game.initialize(&mut self.ctx);

        let reason = loop {
            if let Some(reason) = self.take_failure(output) {
                break StopReason::ConnectionLost(reason);
            }

            self.ctx.input.update(self.signals.snapshot());
            game.game_loop(&mut self.ctx);
            self.render(output).await;
            self.clock.pace().await;

            self.ctx.frame += 1;
            trace!(frame = self.ctx.frame, "tick complete");

            if self.ctx.quit_requested {
                break StopReason::Quit;
            }
            if let Some(limit) = self.frame_limit
                && self.ctx.frame >= limit
            {
                break StopReason::FrameLimit(limit);
            }
        };

        self.state = SchedulerState::Stopped;
        info!(frames = self.ctx.frame, reason = %reason, "game loop stopped");
        if let Some(hook) = self.shutdown_hook.take() {
            hook(&reason);
        }
        Ok(reason)
    }

    async fn render<O>(&mut self, output: &mut O)
    where
        O: FrameOutput + ?Sized,
    {
        if !self.metadata_published {
            self.metadata_published = true;
            // Publishing is best-effort; the game keeps running without it.
            if let Err(e) = output
                .publish_metadata(&self.ctx.metadata, &self.ctx.board)
                .await
            {
                warn!(error = %e, "failed to publish board metadata");
            }
        }

        match output.send_frame(&mut self.ctx.board) {
            Ok(()) => {}
            Err(OutputError::ChannelClosed) => {
                debug!(frame = self.ctx.frame, "frame dropped; channel closed");
                self.pending_failure
                    .get_or_insert_with(|| "frame channel closed".to_string());
            }
            Err(e) => warn!(frame = self.ctx.frame, error = %e, "failed to send frame"),
        }
    }

    fn take_failure<O>(&mut self, output: &mut O) -> Option<String>
    where
        O: FrameOutput + ?Sized,
    {
        output.poll_failure().or_else(|| self.pending_failure.take())
    }
}
