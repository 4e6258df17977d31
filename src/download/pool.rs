use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::format::OutputFormat;
use super::PageState;
use crate::app::{ComiciError, Result};
use crate::descramble::descramble;
use crate::domain::ContentPage;
use crate::fetcher::{Fetcher, ImageRequest};

pub const DEFAULT_WORKERS: usize = 1;

/// Enforces a fixed gap between successive image fetches. The first fetch
/// goes out immediately.
pub struct Pacer {
    interval: Duration,
    last: AsyncMutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: AsyncMutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

/// Shared view of every page's state during one episode download.
#[derive(Clone, Default)]
pub struct PageTracker {
    states: Arc<Mutex<BTreeMap<u32, PageState>>>,
}

impl PageTracker {
    pub fn set(&self, sort: u32, state: PageState) {
        tracing::trace!("Page {} -> {:?}", sort, state);
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(sort, state);
    }

    pub fn snapshot(&self) -> BTreeMap<u32, PageState> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// One page to fetch, descramble and encode.
#[derive(Debug, Clone)]
pub struct PageJob {
    pub page: ContentPage,
    pub referer: String,
    pub origin: String,
    pub format: OutputFormat,
}

/// Bounded pool of page workers. Results are returned as join handles so
/// the caller can persist them in submission order.
pub struct PagePool {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
    pacer: Arc<Pacer>,
    tracker: PageTracker,
}

impl PagePool {
    pub fn with_workers(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
        interval: Duration,
        tracker: PageTracker,
    ) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            pacer: Arc::new(Pacer::new(interval)),
            tracker,
        }
    }

    pub fn spawn(&self, job: PageJob) -> JoinHandle<Result<Vec<u8>>> {
        let fetcher = self.fetcher.clone();
        let semaphore = self.semaphore.clone();
        let pacer = self.pacer.clone();
        let tracker = self.tracker.clone();

        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ComiciError::Other("worker pool closed".into()))?;
            process_page(fetcher.as_ref(), &pacer, &tracker, job).await
        })
    }

    /// Run a job on the calling task, still honouring the pacing gap.
    pub async fn run(&self, job: PageJob) -> Result<Vec<u8>> {
        process_page(self.fetcher.as_ref(), &self.pacer, &self.tracker, job).await
    }
}

async fn process_page(
    fetcher: &(dyn Fetcher + Send + Sync),
    pacer: &Pacer,
    tracker: &PageTracker,
    job: PageJob,
) -> Result<Vec<u8>> {
    let sort = job.page.sort;
    if job.page.is_expired() {
        return Err(ComiciError::ContentExpired { sort });
    }

    pacer.wait().await;
    tracker.set(sort, PageState::Fetching);
    let request = ImageRequest {
        url: &job.page.image_url,
        referer: job.referer.clone(),
        origin: job.origin.clone(),
        sort,
        expires_at: job.page.expires_at,
    };
    let bytes = fetcher.fetch_image(&request).await?;

    tracker.set(sort, PageState::Descrambling);
    let scramble = job.page.scramble;
    let format = job.format;
    tokio::task::spawn_blocking(move || {
        let image = descramble(&bytes, &scramble)?;
        format.encode(&image)
    })
    .await
    .map_err(|e| ComiciError::Other(format!("page {} worker failed: {}", sort, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pacer_skips_first_wait() {
        let gap = Duration::from_millis(40);
        let pacer = Pacer::new(gap);
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < gap);

        pacer.wait().await;
        assert!(start.elapsed() >= gap);
        pacer.wait().await;
        assert!(start.elapsed() >= gap * 2);
    }

    #[test]
    fn test_tracker_keeps_latest_state() {
        let tracker = PageTracker::default();
        tracker.set(1, PageState::Pending);
        tracker.set(0, PageState::Fetching);
        tracker.set(1, PageState::Persisted);

        let states = tracker.snapshot();
        assert_eq!(states.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(states[&1], PageState::Persisted);
    }
}
