//! Server-rendered HTML listings.

use scraper::{ElementRef, Html};
use url::Url;

use super::{ItemKind, ListingItem, ListingPage, ListingQuery};
use crate::app::Result;
use crate::domain::{Author, BookshelfEntry, EpisodeRef, SeriesSummary};
use crate::site::markup::{first_text, login_user_id, selector, text_of};
use crate::site::Session;

/// Build the listing URL. Legacy pages are zero-based on the wire.
pub fn request_url(
    session: &Session,
    query: &ListingQuery,
    page: u32,
    page_size: u32,
) -> Result<Url> {
    let page = page.to_string();
    let size = page_size.to_string();
    let (path, params): (String, Vec<(&str, String)>) = match query {
        ListingQuery::Search { keyword, filter } => (
            "/search".into(),
            vec![
                ("keyword", keyword.clone()),
                ("page", page),
                ("size", size),
                ("filter", filter.as_str().into()),
            ],
        ),
        ListingQuery::SeriesEpisodes { series_id, sort } => (
            format!("/series/{}/pagingList", series_id),
            vec![
                ("s", sort.code().to_string()),
                ("page", page),
                ("limit", size),
            ],
        ),
        ListingQuery::SeriesList { sort } => (
            "/series/list".into(),
            vec![("sort", sort.as_str().into()), ("page", page)],
        ),
        ListingQuery::AuthorSeries { author_id } => {
            (format!("/authors/{}", author_id), vec![("page", page)])
        }
        ListingQuery::Bookshelf { kind } => (
            "/my/bookshelf".into(),
            vec![("type", kind.as_str().into()), ("page", page)],
        ),
    };

    let mut url = session.endpoint(&path)?;
    url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    Ok(url)
}

/// Parse one listing page, recording the login user id as a side effect.
pub fn parse(session: &Session, query: &ListingQuery, html: &str) -> Result<ListingPage> {
    let document = Html::parse_document(html);
    if let Some(user_id) = login_user_id(&document) {
        session.record_user_id(&user_id);
    }

    let items: Vec<ListingItem> = match query.item_kind() {
        ItemKind::Series => parse_series(&document)
            .into_iter()
            .map(ListingItem::Series)
            .collect(),
        ItemKind::Episode => match query {
            ListingQuery::Search { .. } => parse_articles(&document),
            _ => parse_episodes(&document),
        }
        .into_iter()
        .map(ListingItem::Episode)
        .collect(),
        ItemKind::Bookshelf => parse_bookshelf(&document)
            .into_iter()
            .map(ListingItem::Bookshelf)
            .collect(),
    };

    let mut has_more = has_next_page(&document);
    if items.is_empty() && has_more {
        tracing::warn!("Listing container is empty but the pager shows a next page, stopping");
        has_more = false;
    }
    Ok(ListingPage { items, has_more })
}

/// True when the active paging entry has a following sibling entry.
pub fn has_next_page(document: &Html) -> bool {
    let Some(paging) = document.select(&selector("ul.mode-paging")).next() else {
        return false;
    };
    let Some(active) = paging.select(&selector("li.active")).next() else {
        tracing::warn!("Paging fragment without an active entry, assuming last page");
        return false;
    };
    active
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .any(|sibling| sibling.value().name() == "li")
}

fn link_href(item: ElementRef<'_>) -> String {
    item.select(&selector("a"))
        .next()
        .and_then(|a| a.value().attr("href").or_else(|| a.value().attr("data-href")))
        .unwrap_or_default()
        .to_string()
}

fn store_items(document: &Html) -> Vec<ElementRef<'_>> {
    document
        .select(&selector("div.series-list div.manga-store-item"))
        .collect()
}

fn parse_series(document: &Html) -> Vec<SeriesSummary> {
    store_items(document)
        .into_iter()
        .map(|item| {
            let title = first_text(item, "h2.manga-title").unwrap_or_default();
            SeriesSummary::from_href(link_href(item), title, parse_authors(item))
        })
        .collect()
}

fn parse_authors(item: ElementRef<'_>) -> Vec<Author> {
    let linked: Vec<Author> = item
        .select(&selector("a.manga-author"))
        .map(|a| Author {
            name: text_of(a),
            href: a.value().attr("href").unwrap_or_default().to_string(),
        })
        .collect();
    if !linked.is_empty() {
        return linked;
    }

    first_text(item, "span.manga-author")
        .map(|names| {
            names
                .split('\n')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(Author::named)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_articles(document: &Html) -> Vec<EpisodeRef> {
    store_items(document)
        .into_iter()
        .map(|item| {
            let title = first_text(item, "h2.manga-title").unwrap_or_default();
            EpisodeRef::from_href(link_href(item), title)
        })
        .collect()
}

fn parse_episodes(document: &Html) -> Vec<EpisodeRef> {
    document
        .select(&selector("div.series-ep-list div.series-ep-list-item"))
        .map(|item| {
            let href = item
                .select(&selector("a[data-href]"))
                .next()
                .and_then(|a| a.value().attr("data-href"))
                .unwrap_or_default();
            let title = first_text(item, "span.series-ep-list-item-h-text").unwrap_or_default();
            let mut episode = EpisodeRef::from_href(href, title);
            episode.updated = first_text(item, "p.series-ep-list-date").unwrap_or_default();
            episode.access_symbols = parse_symbols(item);
            episode
        })
        .collect()
}

/// Access badges: text of span/div children, plus image badges whose alt
/// text announces a free read.
fn parse_symbols(item: ElementRef<'_>) -> Vec<String> {
    let Some(list) = item
        .select(&selector("div.series-ep-list-symbols div.mode-list"))
        .next()
    else {
        return Vec::new();
    };

    list.children()
        .filter_map(ElementRef::wrap)
        .filter_map(|child| match child.value().name() {
            "span" | "div" => Some(text_of(child)),
            "img" => child
                .value()
                .attr("alt")
                .map(|alt| alt.trim_matches(|c| c == '「' || c == '」'))
                .filter(|alt| alt.ends_with("無料"))
                .map(String::from),
            _ => None,
        })
        .collect()
}

fn parse_bookshelf(document: &Html) -> Vec<BookshelfEntry> {
    document
        .select(&selector("div.bookshelf-list div.bookshelf-item"))
        .map(|item| {
            let href = link_href(item);
            BookshelfEntry {
                id: crate::domain::id_from_href(&href),
                href,
                title: first_text(item, ".bookshelf-item-title").unwrap_or_default(),
                last_update: first_text(item, ".bookshelf-item-date").unwrap_or_default(),
            }
        })
        .collect()
}
