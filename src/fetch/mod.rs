//! Feed retrieval: an HTTP client seam, API key injection, the line-to-feed
//! endpoint table and the [`FeedSource`] implementations a session refreshes
//! from.

mod basic;
mod client;
mod endpoint;
mod source;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use endpoint::{FeedSpecifier, feed_url_for_line};
pub use source::{FeedSource, FileFeedSource, HttpFeedSource};

use crate::error::{Error, Result};
use tracing::debug;

/// GETs `url` through `client` and returns the body. A non-success status is
/// an error, not an empty body.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let url = reqwest::Url::parse(url).map_err(|e| Error::InvalidFeedSpecifier(format!("{url}: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::FetchStatus {
            url: resp.url().to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = resp.bytes().await?;
    debug!(bytes = bytes.len(), "Feed bytes received");
    Ok(bytes.to_vec())
}
