//! Run orchestration.
//!
//! This module provides the [`Harvester`], which turns a task list into one
//! spawned worker per task, drives the configured aggregation strategy, and
//! returns the combined [`ResultSet`](crate::ResultSet) once every worker is done.

use crate::aggregate::channel::collect;
use crate::aggregate::{ChannelAggregator, LockedAggregator};
use crate::error::HarvestError;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::tracker::CompletionTracker;
use crate::types::{HarvestConfig, HarvestReport, ResultSet, Strategy, Task};
use crate::worker::{Worker, WorkerOutcome};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Coordinates one fan-out/fan-in run per call.
///
/// # Example
///
/// ```rust,no_run
/// use title_harvest_lib::{HarvestConfig, Harvester, Strategy};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HarvestConfig::default().with_strategy(Strategy::Channel);
///     let harvester = Harvester::with_config(config)?;
///
///     let report = harvester.harvest(["https://go.dev", "https://github.com"]).await;
///     println!("{}", report.results);
///     Ok(())
/// }
/// ```
pub struct Harvester {
    /// Settings for every run made by this harvester
    config: HarvestConfig,
    /// Shared by all workers
    fetcher: Arc<dyn Fetcher>,
}

impl Harvester {
    /// Create a harvester with default settings and an HTTP fetcher.
    ///
    /// Defaults: locked strategy, no concurrency cap, no timeout.
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_config(HarvestConfig::default())
    }

    /// Create a harvester with an HTTP fetcher built from `config`.
    pub fn with_config(config: HarvestConfig) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::with_config(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a harvester around any [`Fetcher`] implementation.
    pub fn with_fetcher(config: HarvestConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Fetch every task concurrently and aggregate with the configured strategy.
    ///
    /// Always completes: tasks that fail contribute no entry and are only
    /// counted in the returned stats.
    pub async fn harvest<I, T>(&self, tasks: I) -> HarvestReport
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        let tasks: Vec<Task> = tasks.into_iter().map(Into::into).collect();

        match self.config.strategy {
            Strategy::Locked => self.harvest_locked(tasks).await,
            Strategy::Channel => self.harvest_channel(tasks).await,
        }
    }

    /// Every worker inserts into one mutex-guarded map.
    pub async fn harvest_locked(&self, tasks: Vec<Task>) -> HarvestReport {
        let started = Instant::now();
        let dispatched = tasks.len();
        let worker = self.worker();
        let aggregator = LockedAggregator::with_capacity(dispatched);
        let (tracker, guards) = CompletionTracker::new(dispatched);

        let handles: Vec<_> = tasks
            .into_iter()
            .zip(guards)
            .map(|(task, guard)| {
                let worker = worker.clone();
                let sink = aggregator.clone();
                tokio::spawn(async move { worker.run(task, &sink, guard).await })
            })
            .collect();

        tracker.wait().await;
        // Joining drops the workers' map handles so the map can be moved out.
        join_workers(handles).await;

        let results = aggregator.into_result_set();
        self.finish(Strategy::Locked, &worker, dispatched, results, started)
    }

    /// Workers send into a bounded queue; a watcher closes it once the
    /// tracker hits zero; this task collects until the queue is drained.
    pub async fn harvest_channel(&self, tasks: Vec<Task>) -> HarvestReport {
        let started = Instant::now();
        let dispatched = tasks.len();
        let worker = self.worker();
        let aggregator = ChannelAggregator::new(dispatched);
        let (tracker, guards) = CompletionTracker::new(dispatched);

        let handles: Vec<_> = tasks
            .into_iter()
            .zip(guards)
            .map(|(task, guard)| {
                let worker = worker.clone();
                let sink = aggregator.sink();
                tokio::spawn(async move { worker.run(task, &sink, guard).await })
            })
            .collect();

        let (watcher, stream) = aggregator.spawn_watcher(tracker);
        let results = collect(stream).await;

        join_workers(handles).await;
        if let Err(e) = watcher.await {
            warn!(error = %e, "channel watcher did not finish cleanly");
        }

        self.finish(Strategy::Channel, &worker, dispatched, results, started)
    }

    fn worker(&self) -> Worker {
        let worker = Worker::new(Arc::clone(&self.fetcher))
            .with_record_untitled(self.config.record_untitled);

        match self.config.concurrency {
            Some(limit) => {
                let permits = limit.clamp(1, Semaphore::MAX_PERMITS);
                worker.with_limiter(Arc::new(Semaphore::new(permits)))
            }
            None => worker,
        }
    }

    fn finish(
        &self,
        strategy: Strategy,
        worker: &Worker,
        dispatched: usize,
        results: ResultSet,
        started: Instant,
    ) -> HarvestReport {
        let mut stats = worker.counters().snapshot(dispatched);
        stats.elapsed = started.elapsed();

        info!(
            %strategy,
            dispatched = stats.dispatched,
            fetched = stats.fetched,
            failed = stats.fetch_failures,
            untitled = stats.untitled,
            entries = results.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "harvest complete"
        );

        HarvestReport { results, stats }
    }
}

/// Await every worker. A panicked worker has already released its guard, so
/// it is only logged.
async fn join_workers(handles: Vec<JoinHandle<WorkerOutcome>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "worker task failed");
        }
    }
}
