use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::info;

use crate::story::{Story, StoryFeed};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed story feed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where raw (not yet normalized) stories come from.
pub trait StorySource: Send + Sync {
    fn fetch_stories(&self) -> impl Future<Output = Result<Vec<Story>, FetchError>> + Send;
}

pub struct HttpStorySource {
    client: Client,
    endpoint: String,
}

impl HttpStorySource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("GlobalUpvote/1.0 (Story Reader)")
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl StorySource for HttpStorySource {
    async fn fetch_stories(&self) -> Result<Vec<Story>, FetchError> {
        info!("Fetching stories from {}", self.endpoint);

        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let feed: StoryFeed = serde_json::from_slice(&bytes)?;

        let received = feed.len();
        let stories = feed.into_stories();

        info!("Received {} of {} stories", stories.len(), received);
        Ok(stories)
    }
}
