//! Paginated listings over both protocol generations.
//!
//! Callers always pass zero-based page indices. Each strategy translates
//! to its own wire convention and reports `has_more` its own way; the
//! output is the same [`ListingPage`] either way.

pub mod legacy;
pub mod modern;

use clap::ValueEnum;

use crate::app::Result;
use crate::domain::{BookshelfEntry, EpisodeRef, SeriesSummary};
use crate::fetcher::Fetcher;
use crate::site::{Session, SiteProtocol};

/// Stop runaway traversals against sites that never report an end.
pub const MAX_PAGES: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchFilter {
    Series,
    #[value(name = "seriesofauthors")]
    SeriesOfAuthors,
    /// Episodes
    Articles,
}

impl SearchFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFilter::Series => "series",
            SearchFilter::SeriesOfAuthors => "seriesofauthors",
            SearchFilter::Articles => "articles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EpisodeSort {
    NewestFirst,
    OldestFirst,
}

impl EpisodeSort {
    pub fn code(&self) -> u8 {
        match self {
            EpisodeSort::NewestFirst => 1,
            EpisodeSort::OldestFirst => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeriesSort {
    Updated,
    Newest,
}

impl SeriesSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesSort::Updated => "update",
            SeriesSort::Newest => "new",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BookshelfKind {
    All,
    Favorite,
    Buying,
    Liking,
}

impl BookshelfKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookshelfKind::All => "",
            BookshelfKind::Favorite => "favorite",
            BookshelfKind::Buying => "buying",
            BookshelfKind::Liking => "liking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingQuery {
    Search { keyword: String, filter: SearchFilter },
    SeriesEpisodes { series_id: String, sort: EpisodeSort },
    SeriesList { sort: SeriesSort },
    AuthorSeries { author_id: String },
    Bookshelf { kind: BookshelfKind },
}

impl ListingQuery {
    pub fn series_episodes(series_id: impl Into<String>) -> Self {
        ListingQuery::SeriesEpisodes {
            series_id: series_id.into(),
            sort: EpisodeSort::OldestFirst,
        }
    }

    /// Which entry type this listing yields.
    pub fn item_kind(&self) -> ItemKind {
        match self {
            ListingQuery::Search {
                filter: SearchFilter::Articles,
                ..
            }
            | ListingQuery::SeriesEpisodes { .. } => ItemKind::Episode,
            ListingQuery::Bookshelf { .. } => ItemKind::Bookshelf,
            _ => ItemKind::Series,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Series,
    Episode,
    Bookshelf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListingItem {
    Series(SeriesSummary),
    Episode(EpisodeRef),
    Bookshelf(BookshelfEntry),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    pub has_more: bool,
}

impl ListingPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn episodes(&self) -> impl Iterator<Item = &EpisodeRef> {
        self.items.iter().filter_map(|item| match item {
            ListingItem::Episode(ep) => Some(ep),
            _ => None,
        })
    }
}

/// Listing traversal bound to one session.
pub struct Paginator<'a> {
    fetcher: &'a (dyn Fetcher + Send + Sync),
    session: &'a Session,
}

impl<'a> Paginator<'a> {
    pub fn new(fetcher: &'a (dyn Fetcher + Send + Sync), session: &'a Session) -> Self {
        Self { fetcher, session }
    }

    /// Fetch one zero-based page of `query`.
    pub async fn list(
        &self,
        query: &ListingQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage> {
        match self.session.protocol() {
            SiteProtocol::Legacy => {
                let url = legacy::request_url(self.session, query, page, page_size)?;
                let body = self.fetcher.fetch_text(&url).await?;
                legacy::parse(self.session, query, &body)
            }
            SiteProtocol::Modern => {
                let url = modern::request_url(self.session, query, page, page_size)?;
                let body = self.fetcher.fetch_text(&url).await?;
                modern::parse(query, &body, page, page_size)
            }
        }
    }

    /// Walk every page, keeping page-ascending, within-page order.
    pub async fn collect_all(&self, query: &ListingQuery, page_size: u32) -> Result<Vec<ListingItem>> {
        let mut items = Vec::new();
        let mut page = 0;
        loop {
            let listing = self.list(query, page, page_size).await?;
            items.extend(listing.items);
            if !listing.has_more {
                break;
            }
            page += 1;
            if page >= MAX_PAGES {
                tracing::warn!("Stopped listing after {} pages: {:?}", MAX_PAGES, query);
                break;
            }
        }
        tracing::debug!("Collected {} entries over {} pages", items.len(), page + 1);
        Ok(items)
    }

    /// Every episode of a series, oldest first.
    pub async fn all_episodes(&self, series_id: &str, page_size: u32) -> Result<Vec<EpisodeRef>> {
        let items = self
            .collect_all(&ListingQuery::series_episodes(series_id), page_size)
            .await?;
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                ListingItem::Episode(ep) => Some(ep),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::MockFetcher;

    fn episode_page(ids: &[&str], active: usize, pages: usize) -> String {
        let items: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="series-ep-list-item">
                        <a data-href="/episodes/{id}/"></a>
                        <div class="series-ep-list-item-main">
                            <span class="series-ep-list-item-h-text">Episode {id}</span>
                            <p class="series-ep-list-date">2024/01/01</p>
                        </div>
                        <div class="series-ep-list-symbols"><div class="mode-list"><span>無料</span></div></div>
                    </div>"#
                )
            })
            .collect();
        let paging: String = (0..pages)
            .map(|i| {
                if i == active {
                    format!(r#"<li class="active">{}</li>"#, i + 1)
                } else {
                    format!(r#"<li><a href="?page={i}">{}</a></li>"#, i + 1)
                }
            })
            .collect();
        format!(
            r#"<html><body><span id="login_user_id">42</span>
            <div class="series-ep-list">{items}</div>
            <ul class="mode-paging">{paging}</ul></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_collect_all_keeps_page_order() {
        let base = "https://comic.example/series/s1/pagingList?s=2";
        let fetcher = MockFetcher::new()
            .with_text(&format!("{base}&page=0&limit=2"), &episode_page(&["a", "b"], 0, 2))
            .with_text(&format!("{base}&page=1&limit=2"), &episode_page(&["c"], 1, 2));
        let session = Session::for_tests(SiteProtocol::Legacy);
        let paginator = Paginator::new(&fetcher, &session);

        let episodes = paginator.all_episodes("s1", 2).await.unwrap();
        let ids: Vec<_> = episodes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(fetcher.text_requests().len(), 2);
        assert_eq!(session.user_id().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_modern_list_uses_one_based_pages() {
        let fetcher = MockFetcher::new().with_text(
            "https://comic.example/api/series?sort=update&page=1&size=10",
            r#"{"code":1000,"result":{"items":[{"id":"s1","title":"One"}],"lastPage":1}}"#,
        );
        let session = Session::for_tests(SiteProtocol::Modern);
        let paginator = Paginator::new(&fetcher, &session);

        let page = paginator
            .list(&ListingQuery::SeriesList { sort: SeriesSort::Updated }, 0, 10)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more);
    }

    #[test]
    fn test_item_kind() {
        let query = ListingQuery::Search {
            keyword: "x".into(),
            filter: SearchFilter::Articles,
        };
        assert_eq!(query.item_kind(), ItemKind::Episode);
        assert_eq!(
            ListingQuery::Bookshelf { kind: BookshelfKind::All }.item_kind(),
            ItemKind::Bookshelf
        );
        assert_eq!(
            ListingQuery::AuthorSeries { author_id: "1".into() }.item_kind(),
            ItemKind::Series
        );
    }
}
