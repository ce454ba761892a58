//! Core data types for title harvesting.
//!
//! This module defines the task and result types that flow through the
//! workers and aggregators, plus run configuration and statistics.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::HarvestError;

/// One unit of work: a URL to fetch and pull a title from.
///
/// Tasks are immutable and handed by value to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    url: String,
}

impl Task {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_url(self) -> String {
        self.url
    }
}

impl From<String> for Task {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&str> for Task {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// The outcome of one successfully fetched task.
///
/// `title` is empty when the page had no `<title>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleResult {
    /// The URL that was fetched
    pub url: String,

    /// First `<title>` found in the body, or empty
    pub title: String,
}

impl TitleResult {
    pub fn new<U: Into<String>, T: Into<String>>(url: U, title: T) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

/// Final mapping of URL to title produced by a run.
///
/// Both aggregation strategies key by URL. Iteration order of the underlying
/// map is unspecified; use [`ResultSet::iter_sorted`] for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: HashMap<String, String>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any earlier title for the same URL.
    pub fn insert(&mut self, result: TitleResult) {
        self.entries.insert(result.url, result.title);
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by URL.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &str)> {
        let sorted: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|(url, title)| (url.as_str(), title.as_str()))
            .collect();
        sorted.into_iter()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.entries
    }
}

impl From<HashMap<String, String>> for ResultSet {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

impl FromIterator<TitleResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = TitleResult>>(iter: I) -> Self {
        let mut set = ResultSet::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}

impl Extend<TitleResult> for ResultSet {
    fn extend<I: IntoIterator<Item = TitleResult>>(&mut self, iter: I) {
        for result in iter {
            self.insert(result);
        }
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sorted: BTreeMap<&str, &str> = self.iter_sorted().collect();
        sorted.serialize(serializer)
    }
}

impl fmt::Display for ResultSet {
    /// Renders as `map[url:title url:title]`, sorted by URL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("map[")?;
        for (i, (url, title)) in self.iter_sorted().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", url, title)?;
        }
        f.write_str("]")
    }
}

/// How worker results are combined into the final [`ResultSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Every worker inserts into one map behind a mutex
    #[default]
    Locked,

    /// Workers send into a bounded channel drained by a single collector
    Channel,
}

impl FromStr for Strategy {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "locked" | "mutex" | "lock" => Ok(Strategy::Locked),
            "channel" | "chan" => Ok(Strategy::Channel),
            other => Err(HarvestError::config(format!(
                "Unknown strategy '{}', expected 'locked' or 'channel'",
                other
            ))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Locked => write!(f, "locked"),
            Strategy::Channel => write!(f, "channel"),
        }
    }
}

/// Configuration options for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Aggregation strategy
    /// Default: locked
    pub strategy: Strategy,

    /// Maximum number of fetches in flight at once.
    /// Default: None (one unbounded worker per task)
    pub concurrency: Option<usize>,

    /// Per-request timeout. A hung fetch stalls the run when this is unset.
    /// Default: None
    pub timeout: Option<Duration>,

    /// User-Agent header override; the HTTP client default is used when unset
    pub user_agent: Option<String>,

    /// Whether pages without a `<title>` get an entry with an empty title
    /// Default: true
    pub record_untitled: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Locked,
            concurrency: None,
            timeout: None,
            user_agent: None,
            record_untitled: true,
        }
    }
}

impl HarvestConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cap the number of concurrent fetches. Zero is treated as one; caps
    /// beyond what a `tokio` semaphore can hold are clamped when a run starts.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency.max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_record_untitled(mut self, enabled: bool) -> Self {
        self.record_untitled = enabled;
        self
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    /// Workers launched (one per task)
    pub dispatched: usize,

    /// Pages retrieved successfully
    pub fetched: usize,

    /// Tasks whose retrieval failed
    pub fetch_failures: usize,

    /// Retrieved pages with no `<title>`
    pub untitled: usize,

    /// Wall-clock time of the whole run
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub results: ResultSet,
    pub stats: HarvestStats,
}
