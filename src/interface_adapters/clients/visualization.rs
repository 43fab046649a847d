use crate::domain::{BoardMetadata, GameGrid};
use crate::interface_adapters::protocol::VisualizationDocument;
use crate::use_cases::Credentials;
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Debug)]
pub enum PublishError {
    InvalidUrl(String),
    Transport(reqwest::Error),
    Upstream { status: u16 },
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::InvalidUrl(msg) => write!(f, "invalid assignment url: {msg}"),
            PublishError::Transport(err) => write!(f, "assignment server unreachable: {err}"),
            PublishError::Upstream { status } => {
                write!(f, "assignment server answered with status {status}")
            }
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

// Thin reqwest client for the one-time assignment upload.
#[derive(Clone)]
pub struct VisualizationClient {
    http: reqwest::Client,
    base_url: String,
}

impl VisualizationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Uploads title, description and the initial board. Returns the URL where
    /// the running game can be viewed.
    pub async fn publish(
        &self,
        credentials: &Credentials,
        metadata: &BoardMetadata,
        board: &GameGrid,
    ) -> Result<String, PublishError> {
        let assignment = credentials.session_id.to_string();
        let mut url = self.assignment_url(&[assignment.as_str()])?;
        url.query_pairs_mut()
            .append_pair("apikey", &credentials.api_key)
            .append_pair("username", &credentials.username);

        let response = self
            .http
            .post(url)
            .json(&VisualizationDocument::new(metadata, board))
            .send()
            .await
            .map_err(PublishError::Transport)?;

        if !response.status().is_success() {
            return Err(PublishError::Upstream {
                status: response.status().as_u16(),
            });
        }

        let view_url = self.assignment_url(&[assignment.as_str(), credentials.username.as_str()])?;
        Ok(view_url.to_string())
    }

    fn assignment_url(&self, segments: &[&str]) -> Result<Url, PublishError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| PublishError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PublishError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("assignments")
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> VisualizationClient {
        VisualizationClient::new(base, Duration::from_secs(1)).expect("expected http client")
    }

    #[test]
    fn when_base_url_is_plain_host_then_assignment_url_is_appended() {
        let url = client("http://bridges.example.com")
            .assignment_url(&["42", "alice"])
            .expect("expected url");

        assert_eq!(url.as_str(), "http://bridges.example.com/assignments/42/alice");
    }

    #[test]
    fn when_base_url_has_trailing_slash_then_no_empty_segment_is_added() {
        let url = client("http://bridges.example.com/api/")
            .assignment_url(&["42"])
            .expect("expected url");

        assert_eq!(url.as_str(), "http://bridges.example.com/api/assignments/42");
    }

    #[test]
    fn when_base_url_is_invalid_then_publish_url_fails() {
        assert!(matches!(
            client("mailto:someone").assignment_url(&["1"]),
            Err(PublishError::InvalidUrl(_))
        ));
        assert!(matches!(
            client("not a url").assignment_url(&["1"]),
            Err(PublishError::InvalidUrl(_))
        ));
    }
}
