//! Error types for the outer surfaces of the scheduler.
//!
//! The coordination core never fails on the cases it handles by design
//! (dropped submissions, unmatched results, stuck jobs). Errors only come
//! from spawning worker threads, posting to a worker whose inbox is gone,
//! and shutting the pool down.

use thiserror::Error;

/// Errors reported by the scheduler and its worker pool.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker's inbox was closed, so the message could not be delivered.
    #[error("worker {worker} is no longer accepting messages")]
    WorkerDisconnected { worker: usize },

    /// One or more worker threads panicked before they could be joined.
    #[error("{count} worker thread(s) panicked")]
    WorkerPanicked { count: usize },
}
