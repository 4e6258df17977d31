use scraper::Html;
use url::Url;

use crate::app::Result;
use crate::fetcher::Fetcher;
use crate::site::markup::login_user_id;
use crate::site::SiteProtocol;

/// Fetch the landing page once and classify the site.
///
/// Network failure here is fatal: no protocol can be assumed safely.
pub async fn detect(fetcher: &(dyn Fetcher + Send + Sync), host: &Url) -> Result<SiteProtocol> {
    let body = fetcher.fetch_text(host).await?;
    let protocol = detect_document(&body);
    tracing::info!("Detected {} protocol at {}", protocol, host);
    Ok(protocol)
}

/// Classify an already-fetched landing page. Only legacy markup carries
/// the login user id span.
pub fn detect_document(html: &str) -> SiteProtocol {
    let document = Html::parse_document(html);
    if login_user_id(&document).is_some() {
        SiteProtocol::Legacy
    } else {
        SiteProtocol::Modern
    }
}
