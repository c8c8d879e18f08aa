//! Logging setup and run counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when `verbose`.
/// Every line carries timestamp, level, target and message.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Per-run outcome counters shared by all workers
#[derive(Debug, Default)]
pub struct RunMetrics {
    enqueued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    unsupported: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn download_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "succeeded", "Metric incremented");
    }

    /// Any item that produced no file for a reason other than its scheme
    pub fn download_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "failed", "Metric incremented");
    }

    pub fn scheme_unsupported(&self) {
        self.unsupported.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "unsupported", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub enqueued: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub unsupported: u64,
}

impl MetricsSnapshot {
    /// Items accounted for, whatever their outcome
    pub fn processed(&self) -> u64 {
        self.succeeded + self.failed + self.unsupported
    }
}
