use std::path::Path;

use crate::app::{AppContext, ComiciError, Result};
use crate::cli::{ConfigAction, OutputArgs};
use crate::config::Config;
use crate::domain::EpisodeRef;
use crate::download::{DownloadOptions, DownloadReport, OutputFormat};
use crate::listing::{
    BookshelfKind, EpisodeSort, ListingItem, ListingPage, ListingQuery, SearchFilter, SeriesSort,
};
use crate::resolver::{parse_series_id, EpisodeIdent};

fn print_items(page: &ListingPage) {
    if page.items.is_empty() {
        println!("No results");
        return;
    }
    for item in &page.items {
        match item {
            ListingItem::Series(series) => {
                let episodes = series
                    .episode_count
                    .map(|n| format!(" ({} episodes)", n))
                    .unwrap_or_default();
                println!("{}  {}{}", series.id, series.title, episodes);
                if !series.authors.is_empty() {
                    println!("  {}", series.author_names());
                }
            }
            ListingItem::Episode(episode) => print_episode(episode),
            ListingItem::Bookshelf(entry) => {
                println!("{}  {}  {}", entry.id, entry.title, entry.last_update);
            }
        }
    }
}

fn print_episode(episode: &EpisodeRef) {
    let id = if episode.id.is_empty() { "-" } else { &episode.id };
    let symbols = episode.access_symbols.join(", ").replace('\n', " ");
    println!("{:13}  {}  {}  {}", id, episode.updated, episode.title, symbols);
}

fn print_more_hint(page: &ListingPage, current: u32) {
    if page.has_more {
        println!("More results available, use --page {}", current + 1);
    }
}

async fn list(ctx: &AppContext, query: ListingQuery, page: u32, size: u32) -> Result<()> {
    let listing = ctx.paginator().list(&query, page, size).await?;
    print_items(&listing);
    print_more_hint(&listing, page);
    Ok(())
}

pub async fn search(
    ctx: &AppContext,
    keyword: &str,
    filter: SearchFilter,
    page: u32,
    size: u32,
) -> Result<()> {
    let query = ListingQuery::Search {
        keyword: keyword.to_string(),
        filter,
    };
    list(ctx, query, page, size).await
}

pub async fn series_list(ctx: &AppContext, sort: SeriesSort, page: u32) -> Result<()> {
    list(ctx, ListingQuery::SeriesList { sort }, page, 30).await
}

pub async fn author(ctx: &AppContext, author_id: &str, page: u32) -> Result<()> {
    let query = ListingQuery::AuthorSeries {
        author_id: author_id.to_string(),
    };
    list(ctx, query, page, 30).await
}

pub async fn bookshelf(ctx: &AppContext, kind: BookshelfKind, page: u32) -> Result<()> {
    list(ctx, ListingQuery::Bookshelf { kind }, page, 30).await
}

pub async fn episodes(
    ctx: &AppContext,
    series: &str,
    sort: EpisodeSort,
    page: u32,
    limit: u32,
    all: bool,
) -> Result<()> {
    let series_id = parse_series_id(series, ctx.session.host())?;
    let query = ListingQuery::SeriesEpisodes { series_id, sort };
    let mut listing = ctx.paginator().list(&query, page, limit).await?;
    if !all {
        listing.items.retain(|item| match item {
            ListingItem::Episode(episode) => episode.is_downloadable(),
            _ => true,
        });
    }
    print_items(&listing);
    print_more_hint(&listing, page);
    Ok(())
}

pub async fn detailed_episodes(ctx: &AppContext, episode: &str) -> Result<()> {
    let ident = EpisodeIdent::parse(episode, ctx.session.host())?;
    let resolver = ctx.resolver();
    let handle = resolver.resolve_viewer_handle(&ident).await?;
    let (book, episodes) = resolver.resolve_book(&handle).await?;

    println!("{}", book.title);
    if let Some(authors) = book.authors.as_deref().filter(|a| !a.is_empty()) {
        println!("  {}", authors);
    }
    for info in episodes {
        let published = info
            .publish_date
            .map(|d| d.format("%Y/%m/%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let ends = if info.open_ended() {
            "N/A".to_string()
        } else {
            info.end_date
                .map(|d| d.format("%Y/%m/%d %H:%M").to_string())
                .unwrap_or_default()
        };
        println!(
            "{}  #{:<4} {:>3}p  {}  {} ~ {}",
            info.id, info.episode_number, info.page_count, info.name, published, ends
        );
    }
    Ok(())
}

pub fn download_options(output: &OutputArgs, page_from: i64, page_to: i64) -> DownloadOptions {
    DownloadOptions {
        save_dir: output.save_dir.clone(),
        archive: output.cbz,
        overwrite: output.overwrite,
        wait_interval: output.wait_interval,
        format: OutputFormat::from_flags(output.webp, output.compression),
        workers: output.workers.max(1),
        page_from,
        page_to,
        user_id: None,
        show_progress: true,
    }
}

fn print_report(report: &DownloadReport) {
    println!(
        "{} / {}: {} saved, {} skipped, {} denied, {} failed -> {}",
        report.series_title,
        report.episode_name,
        report.persisted(),
        report.skipped(),
        report.denied(),
        report.failed(),
        report.target.display()
    );
}

pub async fn download_episode(
    ctx: &AppContext,
    episode: &str,
    page_from: i64,
    page_to: i64,
    output: &OutputArgs,
) -> Result<()> {
    let ident = EpisodeIdent::parse(episode, ctx.session.host())?;
    match &ident {
        EpisodeIdent::Episode(id) => println!("Episode id: {}", id),
        EpisodeIdent::Viewer(id) => println!("Viewer id: {}", id),
    }

    let report = ctx
        .downloader(download_options(output, page_from, page_to))
        .download_episode(&ident)
        .await?;
    print_report(&report);
    if report.failed() > 0 {
        return Err(ComiciError::Other(format!(
            "{} pages failed, run again to retry them",
            report.failed()
        )));
    }
    Ok(())
}

pub async fn download_series(ctx: &AppContext, series: &str, output: &OutputArgs) -> Result<()> {
    let series_id = parse_series_id(series, ctx.session.host())?;
    println!("Downloading series {}", series_id);

    let report = ctx
        .downloader(download_options(output, 0, -1))
        .download_series(&series_id)
        .await?;

    for episode in &report.episodes {
        print_report(episode);
    }
    for title in &report.unavailable {
        println!("  not available: {}", title);
    }
    for (title, reason) in &report.failed {
        eprintln!("  ! {}: {}", title, reason);
    }

    let pages = |count: fn(&DownloadReport) -> usize| -> usize {
        report.episodes.iter().map(count).sum()
    };
    println!(
        "\nSeries complete: {} episodes, {} pages saved, {} skipped, {} denied, {} failed, {} episodes not available, {} episodes failed",
        report.episodes.len(),
        pages(DownloadReport::persisted),
        pages(DownloadReport::skipped),
        pages(DownloadReport::denied),
        pages(DownloadReport::failed),
        report.unavailable.len(),
        report.failed.len()
    );
    Ok(())
}

/// `config set|reset|show`. Runs without touching the network.
pub fn config(path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set {
            cookie_file,
            proxy,
            user_agent,
            host,
        } => {
            let mut config = Config::load(path)?;
            if let Some(cookies) = cookie_file {
                config.cookies = Some(cookies);
            }
            if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
                config.proxy = Some(proxy);
            }
            if let Some(user_agent) = user_agent.filter(|ua| !ua.is_empty()) {
                config.user_agent = Some(user_agent);
            }
            if let Some(host) = host.filter(|h| !h.is_empty()) {
                config.host = crate::config::normalize_host(&host)?;
            }
            let saved = config.save(path)?;
            println!("Config saved to {}", saved.display());
        }
        ConfigAction::Reset => {
            if Config::reset(path)? {
                println!("Config reset");
            } else {
                println!("No config file to reset");
            }
        }
        ConfigAction::Show => {
            let config = Config::load(path)?;
            let shown = toml::to_string_pretty(&config).map_err(crate::config::ConfigError::from)?;
            print!("{}", shown);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn output_args() -> OutputArgs {
        OutputArgs {
            save_dir: "out".into(),
            cbz: true,
            overwrite: false,
            wait_interval: Duration::ZERO,
            webp: false,
            compression: 7,
            workers: 0,
        }
    }

    #[test]
    fn test_download_options_from_flags() {
        let options = download_options(&output_args(), 2, -1);
        assert!(options.archive);
        assert_eq!(options.wait_interval, Duration::ZERO);
        assert_eq!(options.format, OutputFormat::Png { compression: 7 });
        assert_eq!(options.workers, 1);
        assert_eq!(options.page_from, 2);
    }

    #[test]
    fn test_config_set_then_show_and_reset() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        config(
            Some(&path),
            ConfigAction::Set {
                cookie_file: Some("cookies.json".into()),
                proxy: None,
                user_agent: Some(String::new()),
                host: Some("http://example.com/some/page".into()),
            },
        )
        .unwrap();

        let saved = Config::load(Some(&path)).unwrap();
        assert_eq!(saved.host, "https://example.com");
        assert_eq!(saved.cookies.as_deref(), Some(Path::new("cookies.json")));
        assert_eq!(saved.user_agent, None);

        config(Some(&path), ConfigAction::Show).unwrap();
        config(Some(&path), ConfigAction::Reset).unwrap();
        assert!(!path.exists());
    }
}
