//! # Title Harvest Library
//!
//! Fetches many pages concurrently, pulls the first `<title>` out of each, and
//! combines the results into one URL → title map, finishing only after every
//! fetch has either succeeded or failed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use title_harvest_lib::Harvester;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let harvester = Harvester::new()?;
//!     let report = harvester.harvest(["https://go.dev"]).await;
//!
//!     for (url, title) in report.results.iter_sorted() {
//!         println!("{url}: {title}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Aggregation strategies
//!
//! - **Locked**: every worker inserts into one map behind a mutex.
//! - **Channel**: workers send into a bounded channel; a watcher task closes
//!   it once the completion tracker reaches zero; a single collector drains it.
//!
//! Both strategies produce the same content for the same fetch outcomes.

// Re-export main public API types and functions
pub use aggregate::{ChannelAggregator, ChannelSink, LockedAggregator, ResultSink, ResultStream};
pub use config::{
    env_config_from, load_env_config, parse_duration, ConfigManager, DefaultsConfig, EnvConfig,
    FileConfig, MAX_CONCURRENCY,
};
pub use error::HarvestError;
pub use extractor::{extract_title, find_title};
pub use fetcher::{Fetcher, HttpFetcher};
pub use harvester::Harvester;
pub use tracker::{CompletionGuard, CompletionTracker};
pub use types::{
    HarvestConfig, HarvestReport, HarvestStats, ResultSet, Strategy, Task, TitleResult,
};
pub use utils::{build_tasks, parse_url_list, read_url_file, validate_url, DEFAULT_URLS};
pub use worker::{Worker, WorkerOutcome};

// Public modules
pub mod aggregate;

// Internal modules - their public items are re-exported above
mod config;
mod error;
mod extractor;
mod fetcher;
mod harvester;
mod tracker;
mod types;
mod utils;
mod worker;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HarvestError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
