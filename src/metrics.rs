use serde::Serialize;
use std::time::Instant;

/// Counters maintained by the scheduler as it dispatches and completes jobs.
///
/// Only the driving thread touches these, so they are plain integers.
#[derive(Debug)]
pub struct Metrics {
    /// Jobs handed to a worker.
    pub jobs_submitted: u64,
    /// Jobs whose result came back and matched a callback.
    pub jobs_completed: u64,
    /// Submissions discarded because the pool was empty.
    pub jobs_dropped: u64,
    /// Results whose id had no callback registered.
    pub unmatched_results: u64,
    /// Frame barrier calls.
    pub frames_synced: u64,
    /// Barrier calls that had to wait for outstanding jobs.
    pub continuations_deferred: u64,
    /// Time when metrics collection started.
    pub start_time: Instant,
}

impl Metrics {
    /// Creates a new metrics instance.
    pub fn new() -> Self {
        Self {
            jobs_submitted: 0,
            jobs_completed: 0,
            jobs_dropped: 0,
            unmatched_results: 0,
            frames_synced: 0,
            continuations_deferred: 0,
            start_time: Instant::now(),
        }
    }

    /// Returns a snapshot of current metrics values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_submitted: self.jobs_submitted,
            jobs_completed: self.jobs_completed,
            jobs_dropped: self.jobs_dropped,
            unmatched_results: self.unmatched_results,
            frames_synced: self.frames_synced,
            continuations_deferred: self.continuations_deferred,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_dropped: u64,
    pub unmatched_results: u64,
    pub frames_synced: u64,
    pub continuations_deferred: u64,
    pub elapsed_seconds: f64,
}

impl MetricsSnapshot {
    /// Calculates completed jobs per second.
    pub fn jobs_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.jobs_completed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    /// Fraction of frames whose barrier had to wait on workers.
    pub fn deferred_ratio(&self) -> f64 {
        if self.frames_synced == 0 {
            0.0
        } else {
            self.continuations_deferred as f64 / self.frames_synced as f64
        }
    }
}
