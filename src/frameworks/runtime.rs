// Framework bootstrap for game binaries.

use crate::frameworks::session::{GameSession, GameSettings, SessionError};
use crate::use_cases::{Credentials, Game, StopReason};

/// Loads `.env`, installs the tracing subscriber and a panic hook. Call once.
pub fn init_runtime() {
    // Safe to ignore when no .env file is present.
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Plays `game` on a rows x cols board with environment-driven settings.
pub async fn run_game<G>(
    credentials: Credentials,
    rows: usize,
    cols: usize,
    game: &mut G,
) -> Result<StopReason, SessionError>
where
    G: Game + ?Sized,
{
    let settings = GameSettings::from_env(credentials, rows, cols);
    tracing::info!(
        server = %settings.game_server_url,
        rows,
        cols,
        frame_limit = ?settings.scheduler.frame_limit,
        "starting game"
    );

    GameSession::run(settings, game)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "game failed"))
}
