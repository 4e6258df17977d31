use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::{Client, Response};
use url::Url;

use crate::app::{ComiciError, Result};
use crate::config::Cookie;
use crate::fetcher::{Fetcher, ImageRequest};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:135.0) Gecko/20100101 Firefox/135.0";

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// reqwest-backed fetcher: one client for the site, one for the image CDN.
pub struct HttpFetcher {
    client: Client,
    cdn_client: Client,
    jar: Arc<Jar>,
    settings: HttpSettings,
}

impl HttpFetcher {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let mut builder = Client::builder()
            .timeout(settings.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(settings.user_agent.clone())
            .cookie_provider(jar.clone());
        if let Some(proxy) = settings.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;

        let mut cdn_headers = HeaderMap::new();
        for (name, value) in [
            ("sec-fetch-dest", "image"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-site", "same-site"),
            ("dnt", "1"),
            ("sec-gpc", "1"),
            ("priority", "u=5, i"),
        ] {
            cdn_headers.insert(name, HeaderValue::from_static(value));
        }
        let cdn_client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .default_headers(cdn_headers)
            .build()?;

        Ok(Self {
            client,
            cdn_client,
            jar,
            settings,
        })
    }

    /// Install imported cookies for the site host.
    pub fn add_cookies(&self, cookies: &[Cookie], host: &Url) {
        for cookie in cookies {
            self.jar.add_cookie_str(&cookie.header_value(), host);
        }
        tracing::debug!("Installed {} cookies for {}", cookies.len(), host);
    }

    fn retry_delay(&self, attempt: usize) -> Duration {
        self.settings.retry_delay * 2u32.pow(attempt.min(6) as u32)
    }

    fn check_status(url: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ComiciError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String> {
        let mut attempt = 0;
        loop {
            let result = match self.client.get(url.clone()).send().await {
                Ok(response) => Self::check_status(url.as_str(), response),
                Err(e) => Err(e.into()),
            };

            let err = match result {
                Ok(response) => return Ok(response.text().await?),
                Err(e) => e,
            };

            if err.is_retryable() && attempt < self.settings.max_retries {
                tracing::warn!(
                    "Request failed for {}, attempt {}/{}: {}",
                    url,
                    attempt + 1,
                    self.settings.max_retries + 1,
                    err
                );
                tokio::time::sleep(self.retry_delay(attempt)).await;
                attempt += 1;
                continue;
            }
            return Err(err);
        }
    }

    async fn fetch_image(&self, request: &ImageRequest<'_>) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            if request.expires_at <= Utc::now() {
                return Err(ComiciError::ContentExpired { sort: request.sort });
            }

            let sent = self
                .cdn_client
                .get(request.url)
                .header(REFERER, request.referer.as_str())
                .header(ORIGIN, request.origin.as_str())
                .send()
                .await;
            let result = match sent {
                Ok(response) => Self::check_status(request.url, response),
                Err(e) => Err(e.into()),
            };

            let err = match result {
                Ok(response) => return Ok(response.bytes().await?.to_vec()),
                Err(e) => e,
            };

            if err.is_retryable() && attempt < self.settings.max_retries {
                tracing::warn!(
                    "Image fetch failed for page {}, attempt {}/{}: {}",
                    request.sort,
                    attempt + 1,
                    self.settings.max_retries + 1,
                    err
                );
                tokio::time::sleep(self.retry_delay(attempt)).await;
                attempt += 1;
                continue;
            }
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::is_retryable_status;

    #[test]
    fn test_retry_delay_backoff() {
        let fetcher = HttpFetcher::new(HttpSettings::default()).unwrap();
        assert_eq!(fetcher.retry_delay(0), Duration::from_millis(500));
        assert_eq!(fetcher.retry_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(403));
    }

    #[tokio::test]
    async fn test_expired_image_is_not_requested() {
        let fetcher = HttpFetcher::new(HttpSettings::default()).unwrap();
        let request = ImageRequest {
            url: "https://cdn.invalid/never-fetched.jpg",
            referer: "https://example.com/episodes/x/".into(),
            origin: "https://example.com".into(),
            sort: 3,
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        };
        let err = fetcher.fetch_image(&request).await.unwrap_err();
        assert!(matches!(err, ComiciError::ContentExpired { sort: 3 }));
    }
}
