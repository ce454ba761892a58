//! Completion tracking for a batch of workers.
//!
//! A [`CompletionTracker`] is created together with exactly one
//! [`CompletionGuard`] per worker. Guards are not `Clone` and release their
//! slot when dropped, so every worker counts down exactly once on every exit
//! path (normal return, early return, panic) and the counter can neither
//! overshoot nor stall short of zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct Shared {
    remaining: AtomicUsize,
    zero: Notify,
}

/// Waits for a fixed number of workers to finish.
#[derive(Clone)]
pub struct CompletionTracker {
    shared: Arc<Shared>,
}

/// Proof that one worker is still outstanding. Dropping it counts down.
#[must_use = "dropping a guard immediately marks its worker as finished"]
pub struct CompletionGuard {
    shared: Arc<Shared>,
}

impl CompletionTracker {
    /// Create a tracker for `count` workers and the guards they will hold.
    pub fn new(count: usize) -> (Self, Vec<CompletionGuard>) {
        let shared = Arc::new(Shared {
            remaining: AtomicUsize::new(count),
            zero: Notify::new(),
        });

        let guards = (0..count)
            .map(|_| CompletionGuard {
                shared: Arc::clone(&shared),
            })
            .collect();

        (Self { shared }, guards)
    }

    /// Number of guards not yet released.
    pub fn remaining(&self) -> usize {
        self.shared.remaining.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Suspend until every guard has been released.
    ///
    /// Returns immediately for a tracker created with zero workers.
    pub async fn wait(&self) {
        loop {
            let notified = self.shared.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the check and
            // the await cannot be missed.
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let previous = self.shared.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "completion guard released past zero");
        if previous == 1 {
            self.shared.zero.notify_waiters();
        }
    }
}

impl std::fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl std::fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGuard").finish_non_exhaustive()
    }
}
