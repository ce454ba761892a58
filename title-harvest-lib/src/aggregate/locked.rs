use super::ResultSink;
use crate::types::{ResultSet, TitleResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared URL → title map written by every worker under a mutex.
///
/// Cloning is cheap and yields another handle to the same map. The lock is
/// taken only around the insert, never across a fetch.
#[derive(Clone, Default)]
pub struct LockedAggregator {
    results: Arc<Mutex<HashMap<String, String>>>,
}

impl LockedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the map for `capacity` distinct URLs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Arc::new(Mutex::new(HashMap::with_capacity(capacity))),
        }
    }

    /// Insert or overwrite the entry for `result.url`.
    pub fn insert(&self, result: TitleResult) {
        // A panic while holding the lock can only happen inside `insert`,
        // which leaves the map consistent, so poisoning is ignored.
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        results.insert(result.url, result.title);
    }

    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the final map.
    ///
    /// Intended to be called once all workers have finished. If another
    /// handle is still alive the map is copied out instead of moved.
    pub fn into_result_set(self) -> ResultSet {
        match Arc::try_unwrap(self.results) {
            Ok(mutex) => mutex
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .into(),
            Err(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
                .into(),
        }
    }
}

#[async_trait]
impl ResultSink for LockedAggregator {
    async fn ingest(&self, result: TitleResult) {
        self.insert(result);
    }
}
