//! Episode and series downloads.
//!
//! Pages move through `Pending → Fetching → Descrambling → Persisted`, or
//! end as `Skipped`, `Denied` or `Failed`. A failing page never stops the
//! rest of the episode.

pub mod format;
pub mod pool;
pub mod progress;
pub mod sink;

pub use format::{entry_name, legal_path, OutputFormat};
pub use pool::DEFAULT_WORKERS;
pub use sink::{open_sink, PageSink};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::{ComiciError, Result};
use crate::domain::{ContentPage, PageOutcome, ViewerHandle};
use crate::fetcher::Fetcher;
use crate::listing::Paginator;
use crate::resolver::{ContentResolver, EpisodeIdent, PageRange};
use crate::site::Session;
use pool::{PageJob, PagePool, PageTracker};

/// Page size used when walking a series' episode list.
pub const SERIES_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Pending,
    Fetching,
    Descrambling,
    Persisted,
    Skipped,
    Denied,
    Failed(String),
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::Pending => write!(f, "pending"),
            PageState::Fetching => write!(f, "fetching"),
            PageState::Descrambling => write!(f, "descrambling"),
            PageState::Persisted => write!(f, "saved"),
            PageState::Skipped => write!(f, "skipped"),
            PageState::Denied => write!(f, "denied"),
            PageState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub save_dir: PathBuf,
    /// Write `{episode}.cbz` instead of a page directory
    pub archive: bool,
    pub overwrite: bool,
    pub wait_interval: Duration,
    pub format: OutputFormat,
    pub workers: usize,
    pub page_from: i64,
    /// Negative means through the last page
    pub page_to: i64,
    pub user_id: Option<String>,
    pub show_progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("."),
            archive: false,
            overwrite: false,
            wait_interval: Duration::from_millis(500),
            format: OutputFormat::default(),
            workers: DEFAULT_WORKERS,
            page_from: 0,
            page_to: -1,
            user_id: None,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub series_title: String,
    pub episode_name: String,
    pub target: PathBuf,
    pub range: PageRange,
    pub states: BTreeMap<u32, PageState>,
}

impl DownloadReport {
    fn count(&self, wanted: fn(&PageState) -> bool) -> usize {
        self.states.values().filter(|s| wanted(s)).count()
    }

    pub fn persisted(&self) -> usize {
        self.count(|s| matches!(s, PageState::Persisted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, PageState::Skipped))
    }

    pub fn denied(&self) -> usize {
        self.count(|s| matches!(s, PageState::Denied))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, PageState::Failed(_)))
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0 && self.denied() == 0
    }
}

#[derive(Debug, Default)]
pub struct SeriesReport {
    pub episodes: Vec<DownloadReport>,
    /// Titles the account cannot read
    pub unavailable: Vec<String>,
    /// (title, reason)
    pub failed: Vec<(String, String)>,
}

pub struct Downloader {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    session: Arc<Session>,
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        session: Arc<Session>,
        options: DownloadOptions,
    ) -> Self {
        Self {
            fetcher,
            session,
            options,
        }
    }

    fn resolver(&self) -> ContentResolver<'_> {
        ContentResolver::new(self.fetcher.as_ref(), &self.session)
    }

    pub async fn download_episode(&self, ident: &EpisodeIdent) -> Result<DownloadReport> {
        let resolver = self.resolver();
        let (handle, book, episode) = resolver.resolve_episode(ident).await?;
        let range = PageRange::clamp(self.options.page_from, self.options.page_to, episode.page_count);
        let width = range.name_width();
        tracing::info!(
            "Downloading '{}' / '{}' pages {}..{}",
            book.title,
            episode.name,
            range.from,
            range.to
        );

        let series_dir = self.options.save_dir.join(legal_path(&book.title));
        let episode_dir = legal_path(&episode.name);
        let mut sink = open_sink(&series_dir, &episode_dir, self.options.archive)?;

        let user_id = self.options.user_id.as_deref();
        let outcomes = resolver.resolve_content(&handle, range, user_id).await?;

        let tracker = PageTracker::default();
        let mut queue = Vec::new();
        for outcome in outcomes {
            match outcome {
                PageOutcome::Denied { sort } => tracker.set(sort, PageState::Denied),
                PageOutcome::Available(page) => {
                    let name = entry_name(page.sort, width, self.options.format);
                    let keep_existing = self.options.archive || !self.options.overwrite;
                    if keep_existing && sink.contains(&name) {
                        tracker.set(page.sort, PageState::Skipped);
                    } else if sink.adopt(&name)? {
                        tracker.set(page.sort, PageState::Skipped);
                    } else {
                        tracker.set(page.sort, PageState::Pending);
                        queue.push((name, page));
                    }
                }
            }
        }
        tracing::debug!("{} pages to fetch", queue.len());

        let bar = progress::page_bar(queue.len() as u64, &episode.name, self.options.show_progress);
        let pool = PagePool::with_workers(
            self.fetcher.clone(),
            self.options.workers,
            self.options.wait_interval,
            tracker.clone(),
        );
        let referer = self.session.episode_page(handle.referer_id())?.to_string();
        let origin = self.session.origin();
        let job = |page: ContentPage| PageJob {
            page,
            referer: referer.clone(),
            origin: origin.clone(),
            format: self.options.format,
        };

        let handles: Vec<_> = queue
            .into_iter()
            .map(|(name, page)| (page.sort, name, pool.spawn(job(page))))
            .collect();

        let mut refreshed: Option<HashMap<u32, ContentPage>> = None;
        for (sort, name, task) in handles {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(ComiciError::Other(format!("page {} worker failed: {}", sort, e))),
            };
            let result = match result {
                Err(ComiciError::ContentExpired { .. }) => {
                    tracing::info!("Image URL for page {} expired, resolving again", sort);
                    match self.refreshed_page(&handle, range, sort, &mut refreshed).await {
                        Ok(page) => pool.run(job(page)).await,
                        Err(e) => Err(e),
                    }
                }
                other => other,
            };

            match result.and_then(|bytes| sink.write(&name, &bytes)) {
                Ok(()) => tracker.set(sort, PageState::Persisted),
                Err(e) => {
                    tracing::warn!("Page {} of '{}' failed: {}", sort + 1, episode.name, e);
                    tracker.set(sort, PageState::Failed(e.to_string()));
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        let target = sink.finish()?;
        let report = DownloadReport {
            series_title: book.title,
            episode_name: episode.name,
            target,
            range,
            states: tracker.snapshot(),
        };
        tracing::info!(
            "'{}': {} saved, {} skipped, {} denied, {} failed",
            report.episode_name,
            report.persisted(),
            report.skipped(),
            report.denied(),
            report.failed()
        );
        Ok(report)
    }

    /// Re-resolve the episode's content at most once per download and hand
    /// out the fresh descriptor for `sort`.
    async fn refreshed_page(
        &self,
        handle: &ViewerHandle,
        range: PageRange,
        sort: u32,
        cache: &mut Option<HashMap<u32, ContentPage>>,
    ) -> Result<ContentPage> {
        if cache.is_none() {
            let outcomes = self
                .resolver()
                .resolve_content(handle, range, self.options.user_id.as_deref())
                .await?;
            *cache = Some(
                outcomes
                    .into_iter()
                    .filter_map(|o| match o {
                        PageOutcome::Available(page) => Some((page.sort, page)),
                        PageOutcome::Denied { .. } => None,
                    })
                    .collect(),
            );
        }
        cache
            .as_mut()
            .and_then(|pages| pages.remove(&sort))
            .ok_or(ComiciError::ContentExpired { sort })
    }

    /// Download every readable episode of a series, oldest first.
    pub async fn download_series(&self, series_id: &str) -> Result<SeriesReport> {
        let episodes = Paginator::new(self.fetcher.as_ref(), &self.session)
            .all_episodes(series_id, SERIES_PAGE_SIZE)
            .await?;
        tracing::info!("Series {} lists {} episodes", series_id, episodes.len());

        let mut report = SeriesReport::default();
        for episode in episodes {
            if !episode.is_downloadable() {
                tracing::info!("Episode '{}' is not available for this account", episode.title);
                report.unavailable.push(episode.title);
                continue;
            }
            match self
                .download_episode(&EpisodeIdent::Episode(episode.id.clone()))
                .await
            {
                Ok(done) => report.episodes.push(done),
                Err(e) if e.is_access_error() => {
                    tracing::info!("Episode '{}' is not available: {}", episode.title, e);
                    report.unavailable.push(episode.title);
                }
                Err(e) => {
                    tracing::warn!("Episode '{}' failed: {}", episode.title, e);
                    report.failed.push((episode.title, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
