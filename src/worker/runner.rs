//! Per-worker loop: dequeue, dispatch, download, mark done

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

use super::WorkerContext;
use crate::dispatch::{BuildError, StrategyDescriptor, StrategyKind, project};
use crate::queue::{WorkItem, WorkQueue};
use crate::strategies::Fetcher;

/// What happened to one work item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    /// The strategy ran and reported failure
    Failed,
    /// No strategy is registered for the scheme
    Unsupported,
    /// The URL could not be parsed or the strategy could not be built
    Rejected,
    /// The download task panicked
    Crashed,
}

/// Marks its work item done when dropped, including during unwinding
struct DoneGuard(Arc<WorkQueue>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

pub(super) struct Worker {
    id: usize,
    queue: Arc<WorkQueue>,
    context: Arc<WorkerContext>,
    /// Strategy instances owned by this worker, built on first use
    fetchers: HashMap<StrategyKind, Arc<dyn Fetcher>>,
}

impl Worker {
    pub(super) fn new(id: usize, queue: Arc<WorkQueue>, context: Arc<WorkerContext>) -> Self {
        Self {
            id,
            queue,
            context,
            fetchers: HashMap::new(),
        }
    }

    /// Process items until the queue is closed
    pub(super) async fn run(mut self) {
        debug!(worker = self.id, "Worker started");

        while let Some(item) = self.queue.dequeue().await {
            let _done = DoneGuard(Arc::clone(&self.queue));
            info!(worker = self.id, seq = item.seq, url = %item.url, "dequeued");

            let outcome = self.process(&item).await;
            self.record(outcome);
        }

        debug!(worker = self.id, "Worker stopped");
    }

    pub(super) async fn process(&mut self, item: &WorkItem) -> Outcome {
        let url = match Url::parse(&item.url) {
            Ok(url) => url,
            Err(e) => {
                error!(worker = self.id, url = %item.url, error = %e, "Cannot parse url");
                return Outcome::Rejected;
            }
        };

        let descriptor = match self.context.registry.lookup(url.scheme()) {
            Ok(descriptor) => *descriptor,
            Err(e) => {
                error!(worker = self.id, %url, scheme = url.scheme(), error = %e, "No implemented downloader for this protocol");
                return Outcome::Unsupported;
            }
        };

        let fetcher = match self.fetcher_for(&descriptor) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                error!(worker = self.id, %url, scheme = descriptor.scheme, error = %e, "Cannot build downloader");
                return Outcome::Rejected;
            }
        };

        // A panicking strategy only takes down its own task.
        let task = tokio::spawn(async move { fetcher.download(&url).await });
        match task.await {
            Ok(true) => Outcome::Downloaded,
            Ok(false) => Outcome::Failed,
            Err(e) => {
                error!(worker = self.id, url = %item.url, error = %e, "Download task aborted");
                Outcome::Crashed
            }
        }
    }

    fn fetcher_for(&mut self, descriptor: &StrategyDescriptor) -> Result<Arc<dyn Fetcher>, BuildError> {
        if let Some(fetcher) = self.fetchers.get(&descriptor.kind) {
            return Ok(Arc::clone(fetcher));
        }

        let params = project(&self.context.parameters, descriptor.parameters);
        let fetcher = descriptor.kind.build(params, &self.context.backends)?;
        debug!(worker = self.id, kind = %descriptor.kind, "Built downloader");

        self.fetchers.insert(descriptor.kind, Arc::clone(&fetcher));
        Ok(fetcher)
    }

    fn record(&self, outcome: Outcome) {
        let metrics = &self.context.metrics;
        match outcome {
            Outcome::Downloaded => metrics.download_succeeded(),
            Outcome::Unsupported => metrics.scheme_unsupported(),
            Outcome::Failed | Outcome::Rejected | Outcome::Crashed => metrics.download_failed(),
        }
        debug!(worker = self.id, ?outcome, "Item finished");
    }
}
