use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam between feed fetching and the transport, so authentication can be
/// layered on as a wrapper.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
