//! Result aggregation strategies.
//!
//! Workers only ever see a [`ResultSink`]. Which sink they get decides how
//! results are combined:
//!
//! - [`LockedAggregator`]: one map shared by all workers behind a mutex
//! - [`ChannelAggregator`]: a bounded queue drained by a single collector

use crate::types::TitleResult;
use async_trait::async_trait;

/// Lock-guarded shared map
pub mod locked;

/// Bounded channel fan-in with watcher and collector
pub mod channel;

pub use channel::{ChannelAggregator, ChannelSink, ResultStream};
pub use locked::LockedAggregator;

/// Ingestion entry point used by workers.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Hand over one result. May suspend when the sink applies backpressure.
    async fn ingest(&self, result: TitleResult);
}
