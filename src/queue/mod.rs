//! Work queue shared by the orchestrator and the worker pool

mod work_queue;

pub use work_queue::{QueueError, WorkItem, WorkQueue};
