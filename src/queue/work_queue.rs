use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("work queue is closed")]
    Closed,
}

/// One URL waiting to be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub seq: u64,
    pub url: String,
}

/// Unbounded multi-consumer queue of URLs with a completion barrier
///
/// Every [`enqueue`](Self::enqueue) adds one outstanding item and every
/// [`mark_done`](Self::mark_done) removes one; [`join`](Self::join)
/// resolves once nothing is outstanding. Each item is handed to exactly one
/// caller of [`dequeue`](Self::dequeue).
pub struct WorkQueue {
    sender: StdMutex<Option<mpsc::UnboundedSender<WorkItem>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<WorkItem>>,
    outstanding: watch::Sender<usize>,
    next_seq: AtomicU64,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (outstanding, _) = watch::channel(0);

        Self {
            sender: StdMutex::new(Some(tx)),
            receiver: Mutex::new(rx),
            outstanding,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Add a URL; fails only after [`close`](Self::close)
    pub fn enqueue(&self, url: impl Into<String>) -> Result<u64, QueueError> {
        let guard = self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let sender = guard.as_ref().ok_or(QueueError::Closed)?;

        let item = WorkItem {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            url: url.into(),
        };
        let seq = item.seq;

        // Count before sending so a fast consumer can never mark done first.
        self.outstanding.send_modify(|n| *n += 1);
        if sender.send(item).is_err() {
            self.release_one();
            return Err(QueueError::Closed);
        }

        debug!(seq, "Work item queued");
        Ok(seq)
    }

    /// Wait for the next item; `None` once the queue is closed and drained
    pub async fn dequeue(&self) -> Option<WorkItem> {
        self.receiver.lock().await.recv().await
    }

    /// Record that one dequeued item has been fully processed
    pub fn mark_done(&self) {
        if !self.release_one() {
            warn!("mark_done called with no outstanding work");
        }
    }

    fn release_one(&self) -> bool {
        self.outstanding.send_if_modified(|n| match n.checked_sub(1) {
            Some(remaining) => {
                *n = remaining;
                true
            }
            None => false,
        })
    }

    /// Wait until every enqueued item has been marked done
    pub async fn join(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self`, so waiting cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Items enqueued but not yet marked done
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Stop accepting items; consumers drain what is left, then see `None`
    pub fn close(&self) {
        let mut guard = self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take();
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
