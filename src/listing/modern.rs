//! JSON `/api/*` listings.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{ItemKind, ListingItem, ListingPage, ListingQuery};
use crate::app::Result;
use crate::domain::{BookshelfEntry, EpisodeRef, SeriesSummary};
use crate::site::{envelope, Session};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PagedResult<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    last_page: Option<u32>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// Build the listing URL. Modern endpoints count pages from one.
pub fn request_url(
    session: &Session,
    query: &ListingQuery,
    page: u32,
    page_size: u32,
) -> Result<Url> {
    let (path, mut params): (String, Vec<(&str, String)>) = match query {
        ListingQuery::Search { keyword, filter } => (
            "/api/search".into(),
            vec![("keyword", keyword.clone()), ("filter", filter.as_str().into())],
        ),
        ListingQuery::SeriesEpisodes { series_id, sort } => (
            format!("/api/series/{}/episodes", series_id),
            vec![("sort", sort.code().to_string())],
        ),
        ListingQuery::SeriesList { sort } => {
            ("/api/series".into(), vec![("sort", sort.as_str().into())])
        }
        ListingQuery::AuthorSeries { author_id } => {
            (format!("/api/authors/{}/series", author_id), Vec::new())
        }
        ListingQuery::Bookshelf { kind } => {
            ("/api/bookshelf".into(), vec![("type", kind.as_str().into())])
        }
    };
    params.push(("page", (page + 1).to_string()));
    params.push(("size", page_size.to_string()));

    let mut url = session.endpoint(&path)?;
    url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    Ok(url)
}

/// Whether another page follows the zero-based `page`.
pub fn has_more(page: u32, page_size: u32, last_page: Option<u32>, total_count: Option<u64>) -> bool {
    let next = u64::from(page) + 1;
    match (last_page, total_count) {
        (Some(last), _) => next < u64::from(last),
        (None, Some(total)) => next * u64::from(page_size) < total,
        (None, None) => false,
    }
}

fn decode_page<T, F>(body: &str, page: u32, page_size: u32, wrap: F) -> Result<ListingPage>
where
    T: DeserializeOwned,
    F: Fn(T) -> ListingItem,
{
    let result: PagedResult<T> = envelope::decode(body)?;
    let mut more = has_more(page, page_size, result.last_page, result.total_count);
    if result.items.is_empty() && more {
        tracing::warn!(
            "Page {} came back empty although the paging hints promised more, stopping",
            page
        );
        more = false;
    }
    Ok(ListingPage {
        has_more: more,
        items: result.items.into_iter().map(wrap).collect(),
    })
}

pub fn parse(query: &ListingQuery, body: &str, page: u32, page_size: u32) -> Result<ListingPage> {
    match query.item_kind() {
        ItemKind::Series => decode_page::<SeriesSummary, _>(body, page, page_size, ListingItem::Series),
        ItemKind::Episode => decode_page::<EpisodeRef, _>(body, page, page_size, ListingItem::Episode),
        ItemKind::Bookshelf => {
            decode_page::<BookshelfEntry, _>(body, page, page_size, ListingItem::Bookshelf)
        }
    }
}
