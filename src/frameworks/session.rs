// Session wiring: connect, handshake, then render every tick through the channel.

use crate::domain::{
    BoardMetadata, ConfigError, FrameOutput, GameGrid, KeyBindings, KeySignals, OutputError,
};
use crate::frameworks::config;
use crate::interface_adapters::clients::visualization::VisualizationClient;
use crate::interface_adapters::protocol;
use crate::interface_adapters::{
    ChannelError, ChannelSettings, ConnectionError, KeyListenerRegistry, SocketChannel,
};
use crate::use_cases::{Credentials, FrameScheduler, Game, LoopError, SchedulerSettings, StopReason};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct GameSettings {
    pub credentials: Credentials,
    pub game_server_url: String,
    // Assignment server for the first-frame upload; `None` skips the upload.
    pub server_url: Option<String>,
    pub connect_timeout: Duration,
    pub publish_timeout: Duration,
    pub scheduler: SchedulerSettings,
    pub bindings: KeyBindings,
}

impl GameSettings {
    /// Settings for a rows x cols board with every other value taken from the
    /// environment or its default.
    pub fn from_env(credentials: Credentials, rows: usize, cols: usize) -> Self {
        Self {
            credentials,
            game_server_url: config::game_server_url(),
            server_url: Some(config::server_url()),
            connect_timeout: config::connect_timeout(),
            publish_timeout: config::publish_timeout(),
            scheduler: SchedulerSettings {
                rows,
                cols,
                frame_limit: config::frame_limit(),
                ..SchedulerSettings::default()
            },
            bindings: KeyBindings::default(),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Connection(ConnectionError),
    Channel(ChannelError),
    Loop(LoopError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(e) => write!(f, "invalid game configuration: {e}"),
            SessionError::Connection(e) => write!(f, "could not connect to game server: {e}"),
            SessionError::Channel(e) => write!(f, "game channel error: {e}"),
            SessionError::Loop(e) => write!(f, "game loop error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Config(e) => Some(e),
            SessionError::Connection(e) => Some(e),
            SessionError::Channel(e) => Some(e),
            SessionError::Loop(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

impl From<ConnectionError> for SessionError {
    fn from(err: ConnectionError) -> Self {
        SessionError::Connection(err)
    }
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        SessionError::Channel(err)
    }
}

impl From<LoopError> for SessionError {
    fn from(err: LoopError) -> Self {
        SessionError::Loop(err)
    }
}

/// A connected, authenticated game. Renders frames for the scheduler.
pub struct GameSession {
    channel: SocketChannel,
    publisher: Option<VisualizationClient>,
    credentials: Credentials,
    // Encoded packet of the last rendered board; reused while the board is clean.
    cached_frame: Option<String>,
}

impl GameSession {
    /// Runs a whole game: validates the board, connects, sends credentials, plays
    /// until the loop stops and closes the channel.
    pub async fn run<G>(settings: GameSettings, game: &mut G) -> Result<StopReason, SessionError>
    where
        G: Game + ?Sized,
    {
        let signals = Arc::new(KeySignals::new(settings.bindings.clone()));
        // Board and frame rate are checked before any network activity.
        let mut scheduler = FrameScheduler::new(settings.scheduler.clone(), signals.clone())?;

        let registry = Arc::new(KeyListenerRegistry::new());
        registry.register(signals);

        let session = Self::connect(&settings, registry).await?;
        session.play(&mut scheduler, game).await
    }

    /// Connects and performs the credential handshake. Listeners in `registry`
    /// receive key events from the moment the channel opens.
    pub async fn connect(
        settings: &GameSettings,
        registry: Arc<KeyListenerRegistry>,
    ) -> Result<Self, SessionError> {
        let channel_settings = ChannelSettings {
            server_url: settings.game_server_url.clone(),
            connect_timeout: settings.connect_timeout,
        };
        let mut channel = SocketChannel::connect(&channel_settings, registry).await?;
        if let Err(e) = channel.send_credentials(&settings.credentials).await {
            channel.close().await;
            return Err(e.into());
        }

        let publisher = settings.server_url.as_ref().and_then(|url| {
            VisualizationClient::new(url.clone(), settings.publish_timeout)
                .inspect_err(|e| warn!(error = %e, "visualization client unavailable"))
                .ok()
        });

        Ok(Self {
            channel,
            publisher,
            credentials: settings.credentials.clone(),
            cached_frame: None,
        })
    }

    /// Drives `scheduler` until it stops, then closes the channel.
    pub async fn play<G>(
        mut self,
        scheduler: &mut FrameScheduler,
        game: &mut G,
    ) -> Result<StopReason, SessionError>
    where
        G: Game + ?Sized,
    {
        let result = scheduler.start(game, &mut self).await;
        self.channel.close().await;
        Ok(result?)
    }

    pub fn channel(&self) -> &SocketChannel {
        &self.channel
    }
}

#[async_trait]
impl FrameOutput for GameSession {
    async fn publish_metadata(
        &mut self,
        metadata: &BoardMetadata,
        board: &GameGrid,
    ) -> Result<(), OutputError> {
        let Some(publisher) = &self.publisher else {
            return Ok(());
        };

        let view_url = publisher
            .publish(&self.credentials, metadata, board)
            .await
            .map_err(|e| OutputError::Publish(e.to_string()))?;
        info!(%view_url, "game published; watch it in the browser");
        Ok(())
    }

    fn send_frame(&mut self, board: &mut GameGrid) -> Result<(), OutputError> {
        let packet = match self.cached_frame.take() {
            Some(cached) if !board.take_dirty() => cached,
            _ => {
                board.take_dirty();
                protocol::encode_frame(board).map_err(|e| OutputError::Encode(e.to_string()))?
            }
        };
        self.cached_frame = Some(packet.clone());

        self.channel.send_frame(packet).map_err(|e| match e {
            ChannelError::Closed => OutputError::ChannelClosed,
            other => OutputError::Encode(other.to_string()),
        })
    }

    fn poll_failure(&mut self) -> Option<String> {
        self.channel.failure()
    }
}
