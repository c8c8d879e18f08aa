//! Download worker pool
//!
//! A fixed number of workers pull URLs from a shared [`WorkQueue`], resolve
//! each to a strategy through the registry, download, and mark the item done
//! whatever the outcome. Workers never stop on a failed download; they exit
//! only when the queue is closed (or the runtime shuts down).

mod runner;

pub use runner::Outcome;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::dispatch::{GlobalParameters, StrategyRegistry};
use crate::observability::RunMetrics;
use crate::queue::WorkQueue;
use crate::strategies::Backends;
use runner::Worker;

/// Read-only state shared by every worker of a run
pub struct WorkerContext {
    pub registry: StrategyRegistry,
    pub parameters: GlobalParameters,
    pub backends: Backends,
    pub metrics: RunMetrics,
}

impl WorkerContext {
    pub fn new(registry: StrategyRegistry, parameters: GlobalParameters, backends: Backends) -> Self {
        Self {
            registry,
            parameters,
            backends,
            metrics: RunMetrics::new(),
        }
    }
}

/// Handles to the spawned workers
///
/// Dropping the pool detaches the workers; they keep serving the queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) on the current tokio runtime
    pub fn spawn(size: usize, queue: Arc<WorkQueue>, context: Arc<WorkerContext>) -> Self {
        let size = size.max(1);
        info!(workers = size, "Starting worker pool");

        let handles = (0..size)
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(&queue), Arc::clone(&context));
                tokio::spawn(worker.run())
            })
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }
}
