//! Resolve an episode into viewer handle, metadata and signed page URLs.

pub mod ident;

pub use ident::{parse_series_id, EpisodeIdent, PageRange};

use std::collections::HashMap;

use scraper::Html;
use serde::Deserialize;
use url::Url;

use crate::app::{ComiciError, Result};
use crate::domain::content::RawContentPage;
use crate::domain::{BookInfo, ContentPage, EpisodeInfo, PageOutcome, ViewerHandle};
use crate::fetcher::Fetcher;
use crate::site::markup::{login_user_id, selector};
use crate::site::{envelope, Session, SiteProtocol};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeAccess {
    comici_viewer_id: String,
    #[serde(default)]
    series_id: Option<String>,
    #[serde(default = "granted")]
    has_access: bool,
}

fn granted() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageAccess {
    sort: u32,
    has_access: bool,
}

pub struct ContentResolver<'a> {
    fetcher: &'a (dyn Fetcher + Send + Sync),
    session: &'a Session,
}

impl<'a> ContentResolver<'a> {
    pub fn new(fetcher: &'a (dyn Fetcher + Send + Sync), session: &'a Session) -> Self {
        Self { fetcher, session }
    }

    fn book_endpoint(&self, name: &str, params: &[(&str, &str)]) -> Result<Url> {
        let path = match self.session.protocol() {
            SiteProtocol::Legacy => format!("/book/{}", name),
            SiteProtocol::Modern => format!("/api/book/{}", name),
        };
        let mut url = self.session.endpoint(&path)?;
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok(url)
    }

    /// Stage one: turn a user-facing identifier into a viewer handle.
    pub async fn resolve_viewer_handle(&self, ident: &EpisodeIdent) -> Result<ViewerHandle> {
        let episode_id = match ident {
            EpisodeIdent::Viewer(viewer_id) => {
                tracing::debug!("Using viewer id {} directly", viewer_id);
                return Ok(ViewerHandle::new(viewer_id.clone()));
            }
            EpisodeIdent::Episode(id) => id,
        };

        let mut handle = match self.session.protocol() {
            SiteProtocol::Legacy => self.legacy_viewer_handle(episode_id).await?,
            SiteProtocol::Modern => self.modern_viewer_handle(episode_id).await?,
        };
        handle.episode_id = Some(episode_id.clone());
        tracing::debug!("Episode {} has viewer id {}", episode_id, handle.viewer_id);
        Ok(handle)
    }

    async fn legacy_viewer_handle(&self, episode_id: &str) -> Result<ViewerHandle> {
        let url = self.session.episode_page(episode_id)?;
        let body = self.fetcher.fetch_text(&url).await?;
        let document = Html::parse_document(&body);
        if let Some(user_id) = login_user_id(&document) {
            self.session.record_user_id(&user_id);
        }

        document
            .select(&selector("div#comici-viewer"))
            .next()
            .and_then(|viewer| viewer.value().attr("comici-viewer-id"))
            .filter(|id| !id.is_empty())
            .map(ViewerHandle::new)
            .ok_or_else(|| ComiciError::EpisodeUnavailable(episode_id.to_string()))
    }

    async fn modern_viewer_handle(&self, episode_id: &str) -> Result<ViewerHandle> {
        let url = self.session.endpoint(&format!("/api/episodes/{}", episode_id))?;
        let body = self.fetcher.fetch_text(&url).await?;
        let access: EpisodeAccess = envelope::decode(&body)?;
        if !access.has_access {
            return Err(ComiciError::AccessDenied(format!("episode {}", episode_id)));
        }
        if access.comici_viewer_id.is_empty() {
            return Err(ComiciError::EpisodeUnavailable(episode_id.to_string()));
        }
        Ok(ViewerHandle {
            viewer_id: access.comici_viewer_id,
            episode_id: None,
            series_id: access.series_id,
        })
    }

    /// Stage two: series metadata plus every episode's metadata.
    pub async fn resolve_book(&self, handle: &ViewerHandle) -> Result<(BookInfo, Vec<EpisodeInfo>)> {
        let viewer_id = handle.viewer_id.as_str();
        let info_url = self.book_endpoint("Info", &[("comici-viewer-id", viewer_id)])?;
        let episodes_url = self.book_endpoint(
            "episodeInfo",
            &[("comici-viewer-id", viewer_id), ("isPreview", "false")],
        )?;

        let book: BookInfo = envelope::decode(&self.fetcher.fetch_text(&info_url).await?)?;
        let episodes: Vec<EpisodeInfo> =
            envelope::decode(&self.fetcher.fetch_text(&episodes_url).await?)?;
        tracing::debug!("Book '{}' lists {} episodes", book.title, episodes.len());
        Ok((book, episodes))
    }

    /// Stages one and two, then pick the episode the handle points at.
    pub async fn resolve_episode(
        &self,
        ident: &EpisodeIdent,
    ) -> Result<(ViewerHandle, BookInfo, EpisodeInfo)> {
        let handle = self.resolve_viewer_handle(ident).await?;
        let (book, episodes) = self.resolve_book(&handle).await?;
        let episode = episodes
            .into_iter()
            .find(|ep| ep.id == handle.viewer_id)
            .ok_or_else(|| ComiciError::EpisodeNotFound(ident.as_str().to_string()))?;
        Ok((handle, book, episode))
    }

    /// Stage three: signed image URLs and scramble orders for `range`.
    pub async fn resolve_content(
        &self,
        handle: &ViewerHandle,
        range: PageRange,
        user_id: Option<&str>,
    ) -> Result<Vec<PageOutcome>> {
        let access = match self.session.protocol() {
            SiteProtocol::Legacy => None,
            SiteProtocol::Modern => Some(self.check_page_access(handle, range).await?),
        };

        if let Some(access) = &access {
            if !access.is_empty() && access.values().all(|granted| !granted) {
                tracing::warn!("No page of {} is accessible", handle.viewer_id);
                let mut denied: Vec<_> = access.keys().map(|&sort| PageOutcome::Denied { sort }).collect();
                denied.sort_by_key(PageOutcome::sort);
                return Ok(denied);
            }
        }

        let user_id = self.session.effective_user_id(user_id);
        let from = range.from.to_string();
        let to = range.to.to_string();
        let url = self.book_endpoint(
            "contentsInfo",
            &[
                ("user-id", user_id.as_str()),
                ("comici-viewer-id", handle.viewer_id.as_str()),
                ("page-from", from.as_str()),
                ("page-to", to.as_str()),
            ],
        )?;
        let raw: Vec<RawContentPage> = envelope::decode(&self.fetcher.fetch_text(&url).await?)?;
        let pages = raw
            .into_iter()
            .map(ContentPage::try_from)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Resolved {} pages of {}", pages.len(), handle.viewer_id);

        let mut outcomes: Vec<PageOutcome> = pages
            .into_iter()
            .map(|page| match access.as_ref().and_then(|a| a.get(&page.sort)) {
                Some(false) => PageOutcome::Denied { sort: page.sort },
                _ => PageOutcome::Available(page),
            })
            .collect();

        if let Some(access) = &access {
            for (&sort, &granted) in access {
                if !granted && !outcomes.iter().any(|o| o.sort() == sort) {
                    outcomes.push(PageOutcome::Denied { sort });
                }
            }
        }
        outcomes.sort_by_key(PageOutcome::sort);
        Ok(outcomes)
    }

    async fn check_page_access(
        &self,
        handle: &ViewerHandle,
        range: PageRange,
    ) -> Result<HashMap<u32, bool>> {
        let from = range.from.to_string();
        let to = range.to.to_string();
        let mut params = vec![
            ("comici-viewer-id", handle.viewer_id.as_str()),
            ("page-from", from.as_str()),
            ("page-to", to.as_str()),
        ];
        if let Some(series_id) = handle.series_id.as_deref() {
            params.push(("series-id", series_id));
        }
        let url = self.book_endpoint("accessCheck", &params)?;
        let checks: Vec<PageAccess> = envelope::decode(&self.fetcher.fetch_text(&url).await?)?;
        Ok(checks.into_iter().map(|c| (c.sort, c.has_access)).collect())
    }
}
