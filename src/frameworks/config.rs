use crate::domain::ConfigError;
use crate::use_cases::Credentials;
use std::{env, time::Duration};

// Runtime constants and environment lookups (not gameplay tuning).

pub const DEFAULT_SERVER_URL: &str = "http://bridges-games.herokuapp.com";
pub const FRAME_LIMIT_VAR: &str = "FORCE_BRIDGES_FRAMELIMIT";

pub fn game_server_url() -> String {
    env::var("BRIDGES_GAME_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
}

// Assignment server used for the one-time visualization upload.
pub fn server_url() -> String {
    env::var("BRIDGES_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
}

pub fn connect_timeout() -> Duration {
    millis_var("BRIDGES_CONNECT_TIMEOUT_MS", 10_000)
}

pub fn publish_timeout() -> Duration {
    millis_var("BRIDGES_PUBLISH_TIMEOUT_MS", 10_000)
}

/// Hard stop for automated runs. Read once, when a session is configured.
pub fn frame_limit() -> Option<u64> {
    parse_frame_limit(env::var(FRAME_LIMIT_VAR).ok().as_deref())
}

pub fn parse_frame_limit(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|limit| *limit > 0)
}

pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    let username =
        env::var("BRIDGES_USER").map_err(|_| ConfigError::MissingCredentials("BRIDGES_USER"))?;
    let api_key = env::var("BRIDGES_API_KEY")
        .map_err(|_| ConfigError::MissingCredentials("BRIDGES_API_KEY"))?;
    let assignment = parse_assignment(env::var("BRIDGES_ASSIGNMENT").ok().as_deref())?;
    Ok(Credentials::new(assignment, username, api_key))
}

fn parse_assignment(value: Option<&str>) -> Result<i64, ConfigError> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or(ConfigError::MissingCredentials("BRIDGES_ASSIGNMENT"))
}

fn millis_var(name: &str, default: u64) -> Duration {
    let millis = env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_millis(millis)
}
