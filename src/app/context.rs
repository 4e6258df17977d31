use std::path::Path;
use std::sync::Arc;

use crate::app::error::Result;
use crate::config::{load_cookie_file, Config, CookieImport};
use crate::download::{DownloadOptions, Downloader};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::listing::Paginator;
use crate::resolver::ContentResolver;
use crate::site::{self, Session};

/// Everything a command needs to talk to one site.
pub struct AppContext {
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub session: Arc<Session>,
}

impl AppContext {
    /// Build the HTTP client, install cookies and settle the protocol.
    ///
    /// `cookies` overrides the path stored in the config. Unless the config
    /// pins a protocol, the landing page is fetched once to detect it.
    pub async fn connect(
        config: &Config,
        cookies: Option<&Path>,
        import: CookieImport,
    ) -> Result<Self> {
        let host = config.host_url()?;
        let http = HttpFetcher::new(config.http_settings())?;

        if let Some(path) = cookies.or(config.cookies.as_deref()) {
            let loaded = load_cookie_file(path, &host, import)?;
            http.add_cookies(&loaded, &host);
        }

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(http);
        let protocol = match config.protocol {
            Some(protocol) => {
                tracing::debug!("Using configured {} protocol", protocol);
                protocol
            }
            None => site::detect(fetcher.as_ref(), &host).await?,
        };

        Ok(Self::with_parts(fetcher, Session::new(host, protocol)))
    }

    pub fn with_parts(fetcher: Arc<dyn Fetcher + Send + Sync>, session: Session) -> Self {
        Self {
            fetcher,
            session: Arc::new(session),
        }
    }

    pub fn paginator(&self) -> Paginator<'_> {
        Paginator::new(self.fetcher.as_ref(), &self.session)
    }

    pub fn resolver(&self) -> ContentResolver<'_> {
        ContentResolver::new(self.fetcher.as_ref(), &self.session)
    }

    pub fn downloader(&self, options: DownloadOptions) -> Downloader {
        Downloader::new(self.fetcher.clone(), self.session.clone(), options)
    }
}
