pub mod http_fetcher;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use crate::app::Result;

/// A CDN image request, carrying the episode context the CDN checks.
#[derive(Debug, Clone)]
pub struct ImageRequest<'a> {
    pub url: &'a str,
    pub referer: String,
    pub origin: String,
    pub sort: u32,
    /// Retries stop once the signed URL has expired.
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait Fetcher {
    /// GET a markup or JSON document from the site.
    async fn fetch_text(&self, url: &Url) -> Result<String>;

    /// GET raw scrambled image bytes from the CDN.
    async fn fetch_image(&self, request: &ImageRequest<'_>) -> Result<Vec<u8>>;
}

#[cfg(test)]
pub(crate) mod testing;
