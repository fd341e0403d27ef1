//! # RustOffload - Frame-Scoped Job Offload Scheduler
//!
//! Offloads per-frame numeric jobs (such as sorting particles by depth) to a
//! fixed pool of background workers, and lets the driving thread register a
//! continuation that runs as soon as every job of the frame has completed.
//!
//! ## Architecture
//!
//! - **Workers**: threads running a [`Kernel`] over payloads moved to them
//! - **Worker Pool**: fixed, ordered workers handed jobs in round-robin order
//! - **Job Table**: completion callbacks of the jobs currently in flight
//! - **Frame Barrier**: runs the frame's continuation once the table drains
//!
//! All coordination state is owned by one [`Scheduler`] on the driving
//! thread. Workers never share memory with it; payloads travel by move inside
//! [`Request`] and [`Response`] messages.
//!
//! ## Example
//!
//! ```no_run
//! use rustoffload::{DepthSort, SchedulerConfig, SortPayload, initialize_workers};
//! use std::time::Duration;
//!
//! let config = SchedulerConfig { worker_count: 2, ..SchedulerConfig::default() };
//! let mut scheduler = initialize_workers(&config, DepthSort).unwrap();
//!
//! scheduler
//!     .submit(SortPayload::new(vec![3.0, 1.0, 2.0]), |sorted| {
//!         println!("draw order: {:?}", sorted.order);
//!     })
//!     .unwrap();
//!
//! scheduler.on_frame_sync(|| println!("render"));
//! while scheduler.has_pending_continuation() {
//!     scheduler.poll_timeout(Duration::from_millis(1));
//! }
//! ```

pub mod counter;
pub mod error;
pub mod events;
pub mod job;
pub mod kernel;
pub mod message;
pub mod metrics;
pub mod scheduler;
pub mod worker;

pub use counter::Countdown;
pub use error::SchedulerError;
pub use events::{EventHandler, Subscription, WorkerEvent};
pub use job::JobId;
pub use kernel::{DepthSort, Kernel, SortPayload, sort_particles};
pub use message::{Request, Response};
pub use metrics::MetricsSnapshot;
pub use scheduler::{FrameSync, Scheduler, SchedulerConfig, Submission, ThreadScheduler};
pub use worker::{ChannelPort, ThreadWorker, WorkerPool, WorkerPort};

/// Spawns `config.worker_count` workers that all run a clone of `kernel`.
///
/// Each worker is sent its readiness probe immediately; the
/// [`WorkerEvent::InitComplete`] event fires from [`Scheduler::poll`] once
/// all of them have answered.
pub fn initialize_workers<K>(
    config: &SchedulerConfig,
    kernel: K,
) -> Result<ThreadScheduler<K>, SchedulerError>
where
    K: Kernel + Clone,
{
    Scheduler::spawn(config, |_| kernel.clone())
}
