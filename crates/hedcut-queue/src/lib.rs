//! Redis-backed render queue.
//!
//! Tasks are pushed onto a Redis stream and consumed through a
//! consumer group. Retries ride a sorted-set delay schedule with
//! exponential backoff, and terminal records are retained for a
//! bounded window so operators can inspect recent history.

pub mod error;
pub mod queue;
pub mod task;

pub use error::{QueueError, QueueResult};
pub use queue::{
    QueueConfig, RenderQueue, RetryDecision, BASE_BACKOFF_MS, COMPLETED_RETENTION_SECS,
    FAILED_RETENTION_SECS, MAX_ATTEMPTS,
};
pub use task::{QueueMetrics, RenderTask, TaskState, TaskStatus};
