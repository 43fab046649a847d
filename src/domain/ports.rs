use async_trait::async_trait;
use std::fmt;

use crate::domain::board::GameGrid;

pub const MAX_TITLE_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 250;

// One-time visualization metadata published with the first frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardMetadata {
    title: String,
    description: String,
}

impl BoardMetadata {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: truncate_chars(title, MAX_TITLE_LEN),
            description: truncate_chars(description, MAX_DESCRIPTION_LEN),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = truncate_chars(title, MAX_TITLE_LEN);
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = truncate_chars(description, MAX_DESCRIPTION_LEN);
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => {
            tracing::warn!(max, len = value.chars().count(), "text truncated");
            value[..cut].to_string()
        }
        None => value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    // The frame could not be serialized.
    Encode(String),
    // The outbound channel is gone; the loop sees the cause on its next tick.
    ChannelClosed,
    Publish(String),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Encode(msg) => write!(f, "frame encode failed: {msg}"),
            OutputError::ChannelClosed => write!(f, "frame channel closed"),
            OutputError::Publish(msg) => write!(f, "metadata publish failed: {msg}"),
        }
    }
}

impl std::error::Error for OutputError {}

// Port the game loop renders into. The loop depends on this trait, not on the
// socket channel or the HTTP client.
#[async_trait]
pub trait FrameOutput: Send {
    /// Called once, on the first rendered tick.
    async fn publish_metadata(
        &mut self,
        metadata: &BoardMetadata,
        board: &GameGrid,
    ) -> Result<(), OutputError>;

    /// Fire-and-forget; no acknowledgement is awaited.
    fn send_frame(&mut self, board: &mut GameGrid) -> Result<(), OutputError>;

    /// Reports a connection failure observed since the previous tick.
    fn poll_failure(&mut self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_title_is_longer_than_limit_then_it_is_truncated() {
        let metadata = BoardMetadata::new(&"t".repeat(80), "short");

        assert_eq!(metadata.title().chars().count(), MAX_TITLE_LEN);
        assert_eq!(metadata.description(), "short");
    }

    #[test]
    fn when_description_has_multibyte_chars_then_truncation_keeps_char_boundaries() {
        let mut metadata = BoardMetadata::default();

        metadata.set_description(&"é".repeat(300));

        assert_eq!(metadata.description().chars().count(), MAX_DESCRIPTION_LEN);
    }
}
