//! One worker per task: fetch, extract, report, count down.

use crate::aggregate::ResultSink;
use crate::extractor::find_title;
use crate::fetcher::Fetcher;
use crate::tracker::CompletionGuard;
use crate::types::{HarvestStats, Task, TitleResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// What a single worker did with its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// A result was handed to the sink
    Recorded { untitled: bool },
    /// The page had no title and untitled pages are not recorded
    SkippedUntitled,
    /// Retrieval failed; nothing was reported
    FetchFailed,
}

/// Counters shared by every worker of one run.
#[derive(Debug, Default)]
pub(crate) struct RunCounters {
    fetched: AtomicUsize,
    fetch_failures: AtomicUsize,
    untitled: AtomicUsize,
}

impl RunCounters {
    pub(crate) fn snapshot(&self, dispatched: usize) -> HarvestStats {
        HarvestStats {
            dispatched,
            fetched: self.fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            untitled: self.untitled.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

/// Fetch + extract + report for a single task.
///
/// Cheap to clone; every spawned task gets its own copy.
#[derive(Clone)]
pub struct Worker {
    fetcher: Arc<dyn Fetcher>,
    limiter: Option<Arc<Semaphore>>,
    record_untitled: bool,
    counters: Arc<RunCounters>,
}

impl Worker {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            limiter: None,
            record_untitled: true,
            counters: Arc::new(RunCounters::default()),
        }
    }

    /// Share a concurrency limiter across workers. Permits cover fetch and
    /// extract only.
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_record_untitled(mut self, enabled: bool) -> Self {
        self.record_untitled = enabled;
        self
    }

    pub(crate) fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Process `task`, reporting at most one result to `sink`.
    ///
    /// `guard` is released when this returns or unwinds, whatever the outcome.
    pub async fn run<S>(&self, task: Task, sink: &S, guard: CompletionGuard) -> WorkerOutcome
    where
        S: ResultSink + ?Sized,
    {
        let _guard = guard;

        let title = {
            let _permit = match &self.limiter {
                Some(limiter) => limiter.acquire().await.ok(),
                None => None,
            };

            match self.fetcher.retrieve(task.url()).await {
                Ok(body) => {
                    self.counters.fetched.fetch_add(1, Ordering::Relaxed);
                    find_title(&body).map(str::to_string)
                }
                Err(e) => {
                    self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                    debug!(url = %task, error = %e, "fetch failed");
                    return WorkerOutcome::FetchFailed;
                }
            }
        };

        let untitled = title.is_none();
        if untitled {
            self.counters.untitled.fetch_add(1, Ordering::Relaxed);
            if !self.record_untitled {
                debug!(url = %task, "no title found, skipping");
                return WorkerOutcome::SkippedUntitled;
            }
        }

        let result = TitleResult::new(task.into_url(), title.unwrap_or_default());
        debug!(url = %result.url, title = %result.title, "title extracted");
        sink.ingest(result).await;

        WorkerOutcome::Recorded { untitled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::LockedAggregator;
    use crate::error::HarvestError;
    use crate::tracker::CompletionTracker;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticFetcher;

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn retrieve(&self, url: &str) -> Result<String, HarvestError> {
            match url {
                "https://titled.test" => Ok("<html><title>Titled</title></html>".to_string()),
                "https://untitled.test" => Ok("<html><body>plain</body></html>".to_string()),
                _ => Err(HarvestError::fetch(url, "unreachable")),
            }
        }
    }

    fn worker() -> Worker {
        Worker::new(Arc::new(StaticFetcher))
    }

    #[tokio::test]
    async fn test_success_records_and_releases() {
        let (tracker, mut guards) = CompletionTracker::new(1);
        let sink = LockedAggregator::new();

        let outcome = worker()
            .run(Task::new("https://titled.test"), &sink, guards.pop().unwrap())
            .await;

        assert_eq!(outcome, WorkerOutcome::Recorded { untitled: false });
        assert!(tracker.is_complete());
        assert_eq!(sink.into_result_set().get("https://titled.test"), Some("Titled"));
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_nothing_but_releases() {
        let (tracker, mut guards) = CompletionTracker::new(1);
        let sink = LockedAggregator::new();
        let worker = worker();

        let outcome = worker
            .run(Task::new("https://down.test"), &sink, guards.pop().unwrap())
            .await;

        assert_eq!(outcome, WorkerOutcome::FetchFailed);
        assert!(tracker.is_complete());
        assert!(sink.is_empty());
        assert_eq!(worker.counters().snapshot(1).fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_untitled_page_recorded_with_empty_title() {
        let (_tracker, mut guards) = CompletionTracker::new(1);
        let sink = LockedAggregator::new();

        let outcome = worker()
            .run(Task::new("https://untitled.test"), &sink, guards.pop().unwrap())
            .await;

        assert_eq!(outcome, WorkerOutcome::Recorded { untitled: true });
        assert_eq!(sink.into_result_set().get("https://untitled.test"), Some(""));
    }

    #[tokio::test]
    async fn test_untitled_page_skipped_when_disabled() {
        let (tracker, mut guards) = CompletionTracker::new(1);
        let sink = LockedAggregator::new();

        let outcome = worker()
            .with_record_untitled(false)
            .run(Task::new("https://untitled.test"), &sink, guards.pop().unwrap())
            .await;

        assert_eq!(outcome, WorkerOutcome::SkippedUntitled);
        assert!(tracker.is_complete());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_limiter_blocks_until_permit_available() {
        let limiter = Arc::new(Semaphore::new(1));
        let held = limiter.clone().acquire_owned().await.unwrap();

        let (tracker, mut guards) = CompletionTracker::new(1);
        let sink = LockedAggregator::new();
        let worker = worker().with_limiter(limiter);
        let guard = guards.pop().unwrap();

        let handle = tokio::spawn({
            let sink = sink.clone();
            async move { worker.run(Task::new("https://titled.test"), &sink, guard).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.remaining(), 1, "worker ran without a permit");

        drop(held);
        handle.await.unwrap();
        assert!(tracker.is_complete());
        assert_eq!(sink.len(), 1);
    }
}
