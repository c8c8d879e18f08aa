//! Run entry point: seed the queue, start the pool, wait for the drain

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::dispatch::{GlobalParameters, StrategyRegistry};
use crate::observability::MetricsSnapshot;
use crate::queue::WorkQueue;
use crate::strategies::Backends;
use crate::worker::{WorkerContext, WorkerPool};

/// Summary of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub elapsed: Duration,
    pub outcomes: MetricsSnapshot,
}

/// Download every URL with `worker_count` concurrent workers.
///
/// Returns once each URL has been accounted for, successfully or not.
/// Individual failures are only visible in the log and in the report.
pub async fn run(
    urls: impl IntoIterator<Item = String>,
    worker_count: usize,
    parameters: GlobalParameters,
    backends: Backends,
) -> RunReport {
    run_with_registry(urls, worker_count, parameters, backends, StrategyRegistry::with_defaults()).await
}

/// [`run`] against a caller-supplied registry
pub async fn run_with_registry(
    urls: impl IntoIterator<Item = String>,
    worker_count: usize,
    parameters: GlobalParameters,
    backends: Backends,
    registry: StrategyRegistry,
) -> RunReport {
    let run_id = Uuid::now_v7();
    let span = info_span!("run", %run_id);

    async move {
        let start = Instant::now();
        let queue = Arc::new(WorkQueue::new());
        let context = Arc::new(WorkerContext::new(registry, parameters, backends));

        // Workers are detached: the join barrier below is the completion signal.
        let pool = WorkerPool::spawn(worker_count, Arc::clone(&queue), Arc::clone(&context));
        info!(
            workers = pool.size(),
            schemes = ?context.registry.schemes().collect::<Vec<_>>(),
            "run started"
        );

        for url in urls {
            info!(%url, "enqueued");
            match queue.enqueue(url) {
                Ok(_) => context.metrics.item_enqueued(),
                Err(e) => error!(error = %e, "Cannot enqueue url"),
            }
        }

        queue.join().await;
        queue.close();

        let report = RunReport {
            elapsed: start.elapsed(),
            outcomes: context.metrics.snapshot(),
        };

        info!(
            elapsed = ?report.elapsed,
            succeeded = report.outcomes.succeeded,
            failed = report.outcomes.failed,
            unsupported = report.outcomes.unsupported,
            "run complete"
        );

        report
    }
    .instrument(span)
    .await
}
