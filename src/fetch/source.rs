use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{HttpClient, fetch_bytes};
use crate::error::Result;

const SLOW_FETCH: Duration = Duration::from_secs(15);

/// Something a session can pull fresh feed bytes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Fetches the feed over HTTP through any [`HttpClient`].
pub struct HttpFeedSource<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpFeedSource<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for HttpFeedSource<C> {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let fetch_start = Instant::now();
        let bytes = fetch_bytes(&self.client, &self.url).await?;
        let elapsed = fetch_start.elapsed();
        if elapsed > SLOW_FETCH {
            warn!(url = %self.url, elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
        }
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads a stored feed from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(&self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Stored feed read");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl<S: FeedSource + ?Sized> FeedSource for Box<S> {
    async fn fetch(&self) -> Result<Vec<u8>> {
        (**self).fetch().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
