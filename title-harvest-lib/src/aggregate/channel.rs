use super::ResultSink;
use crate::tracker::CompletionTracker;
use crate::types::{ResultSet, TitleResult};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lazy, finite sequence of results. Ends once the watcher has closed the
/// queue and everything buffered has been yielded.
pub type ResultStream = Pin<Box<dyn Stream<Item = TitleResult> + Send>>;

/// Bounded fan-in queue with a single collector.
///
/// Workers write through [`ChannelSink`] handles. [`ChannelAggregator::spawn_watcher`]
/// starts a watcher task that signals the collector once the tracker reports
/// completion; the collector then closes the receiving side and drains what is
/// buffered. That signal is the only thing that ends the stream. Sink handles
/// still alive at that point cannot keep it open, and anything they send
/// afterwards is rejected.
pub struct ChannelAggregator {
    sender: mpsc::Sender<TitleResult>,
    receiver: mpsc::Receiver<TitleResult>,
}

/// Producer handle given to one worker.
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<TitleResult>,
}

impl ChannelAggregator {
    /// Create a queue holding up to `capacity` results before producers wait.
    ///
    /// Sized to the task count so producers normally never wait; a zero
    /// capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self { sender, receiver }
    }

    pub fn sink(&self) -> ChannelSink {
        ChannelSink {
            sender: self.sender.clone(),
        }
    }

    /// Start the watcher and return the collector's stream.
    ///
    /// The watcher waits for `tracker` to reach zero, then closes the queue.
    /// Every guarded producer has finished enqueueing by then, so the stream
    /// yields each sent result and then ends.
    pub fn spawn_watcher(self, tracker: CompletionTracker) -> (JoinHandle<()>, ResultStream) {
        let Self { sender, receiver } = self;
        let (close, closed) = oneshot::channel();

        let watcher = tokio::spawn(async move {
            tracker.wait().await;
            debug!("all producers finished, closing result channel");
            drop(sender);
            // The collector may already be gone; nothing left to close then.
            let _ = close.send(());
        });

        (watcher, into_stream(receiver, closed))
    }
}

/// Drain a stream into a [`ResultSet`]. Only the caller touches the set.
pub async fn collect(mut results: ResultStream) -> ResultSet {
    let mut set = ResultSet::new();
    while let Some(result) = results.next().await {
        set.insert(result);
    }
    set
}

fn into_stream(
    receiver: mpsc::Receiver<TitleResult>,
    closed: oneshot::Receiver<()>,
) -> ResultStream {
    Box::pin(stream::unfold(
        (receiver, Some(closed)),
        |(mut receiver, mut closed)| async move {
            loop {
                let Some(signal) = closed.as_mut() else {
                    // Closed: `recv` yields the buffered results, then `None`.
                    return receiver.recv().await.map(|result| (result, (receiver, None)));
                };

                let received = tokio::select! {
                    biased;
                    result = receiver.recv() => Some(result),
                    _ = signal => None,
                };

                match received {
                    Some(result) => {
                        return result.map(|result| (result, (receiver, closed)));
                    }
                    None => {
                        receiver.close();
                        closed = None;
                    }
                }
            }
        },
    ))
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn ingest(&self, result: TitleResult) {
        if let Err(mpsc::error::SendError(result)) = self.sender.send(result).await {
            // The watcher already closed the queue; this producer outlived its guard.
            warn!(url = %result.url, "result channel closed before ingest");
        }
    }
}
