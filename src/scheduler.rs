//! High-level scheduler interface.
//!
//! The [`Scheduler`] is the single owner of all coordination state: the job
//! table, the worker pool cursor, the readiness countdown and the pending
//! frame continuation. It is driven from one thread. Workers run in parallel
//! and only ever exchange moved payloads with it through messages.

use crate::counter::Countdown;
use crate::error::SchedulerError;
use crate::events::{EventHandler, WorkerEvent};
use crate::job::{JobId, JobIdCounter, JobTable};
use crate::kernel::Kernel;
use crate::message::{Request, Response};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::worker::{ThreadWorker, WorkerPool, WorkerPort};
use crossbeam::channel::{self, Receiver};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Configuration for the worker pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of workers to spawn. Zero is treated as one. Default: 1.
    pub worker_count: usize,
    /// Pin worker `i` to logical core `i`. Default: false.
    pub pin_to_core: bool,
    /// Prefix for worker thread names. Default: `offload-worker`.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            pin_to_core: false,
            thread_name: "offload-worker".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Configuration with one worker per CPU core.
    pub fn with_default_workers() -> Self {
        Self {
            worker_count: num_cpus::get(),
            ..Self::default()
        }
    }

    /// The number of workers actually spawned.
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.max(1)
    }
}

/// Outcome of [`Scheduler::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The job was posted to a worker under this id.
    Dispatched(JobId),
    /// The pool is empty. The callback was discarded without being called.
    Dropped,
}

/// Outcome of [`Scheduler::on_frame_sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSync {
    /// No jobs were outstanding; the continuation already ran.
    Immediate,
    /// The continuation runs when the last outstanding job completes.
    Deferred,
}

type Continuation = Box<dyn FnOnce() + 'static>;

/// Dispatches jobs to workers and resumes the driving thread once a frame's
/// jobs have all completed.
///
/// `W` is the worker handle type and `R` the result type handed to job
/// callbacks.
pub struct Scheduler<W: WorkerPort, R> {
    pool: WorkerPool<W>,
    jobs: JobTable<R>,
    ids: JobIdCounter,
    readiness: Countdown,
    pending: Option<Continuation>,
    events: EventHandler,
    metrics: Metrics,
    inbox: Option<Receiver<Response<R>>>,
}

/// Scheduler backed by [`ThreadWorker`]s running `K`.
pub type ThreadScheduler<K> = Scheduler<ThreadWorker<K>, <K as Kernel>::Output>;

impl<W: WorkerPort, R> Scheduler<W, R> {
    /// Creates a scheduler over `workers` and sends each its readiness probe.
    ///
    /// Responses are not collected automatically; feed them to
    /// [`handle_response`](Self::handle_response), or attach a channel with
    /// [`with_inbox`](Self::with_inbox) and call [`poll`](Self::poll).
    pub fn new(workers: Vec<W>) -> Result<Self, SchedulerError> {
        for (index, worker) in workers.iter().enumerate() {
            worker
                .post(Request::Init { worker: index })
                .map_err(|_| SchedulerError::WorkerDisconnected { worker: index })?;
        }

        Ok(Scheduler {
            readiness: Countdown::new(workers.len()),
            pool: WorkerPool::new(workers),
            jobs: JobTable::new(),
            ids: JobIdCounter::new(),
            pending: None,
            events: EventHandler::new(),
            metrics: Metrics::new(),
            inbox: None,
        })
    }

    /// Attaches the channel worker responses arrive on.
    pub fn with_inbox(mut self, inbox: Receiver<Response<R>>) -> Self {
        self.inbox = Some(inbox);
        self
    }

    /// Submits a job.
    ///
    /// The payload moves to the next worker in round-robin order and
    /// `callback` runs on the driving thread with the result. Against an
    /// empty pool the job is dropped and `callback` is never called.
    ///
    /// If the chosen worker no longer accepts messages the job is forgotten
    /// again and an error is returned.
    pub fn submit<F>(
        &mut self,
        payload: W::Payload,
        callback: F,
    ) -> Result<Submission, SchedulerError>
    where
        F: FnOnce(R) + 'static,
    {
        let Some((worker, port)) = self.pool.allocate() else {
            self.metrics.jobs_dropped += 1;
            tracing::debug!("no workers available, dropping job");
            return Ok(Submission::Dropped);
        };

        let id = self.ids.next_id();
        if self.jobs.insert(id, Box::new(callback)) {
            tracing::warn!(job = id, "job id reused while an older job is in flight");
        }

        if port.post(Request::Job { id, payload }).is_err() {
            tracing::error!(job = id, worker, "worker disconnected, job not dispatched");
            self.jobs.take(id);
            self.resume_if_drained();
            return Err(SchedulerError::WorkerDisconnected { worker });
        }

        self.metrics.jobs_submitted += 1;
        tracing::trace!(job = id, worker, "dispatched job");
        Ok(Submission::Dispatched(id))
    }

    /// Processes one message from a worker.
    pub fn handle_response(&mut self, response: Response<R>) {
        match response {
            Response::InitDone { worker } => {
                if self.readiness.decrement() {
                    tracing::info!(workers = self.pool.size(), "all workers ready");
                    self.events.fire(WorkerEvent::InitComplete);
                } else if self.readiness.is_complete() {
                    tracing::debug!(worker, "ready acknowledgment after pool became ready");
                }
            }
            Response::JobDone { id, payload } => {
                match self.jobs.take(id) {
                    Some(callback) => {
                        self.metrics.jobs_completed += 1;
                        callback(payload);
                    }
                    None => {
                        self.metrics.unmatched_results += 1;
                        tracing::debug!(job = id, "result for unknown job ignored");
                    }
                }
                self.resume_if_drained();
            }
        }
    }

    /// Frame barrier.
    ///
    /// Runs `continuation` right away if no jobs are outstanding, otherwise
    /// keeps it until the last outstanding job completes. Either way job ids
    /// start over from zero for the next frame.
    pub fn on_frame_sync<F>(&mut self, continuation: F) -> FrameSync
    where
        F: FnOnce() + 'static,
    {
        self.metrics.frames_synced += 1;
        self.ids.reset();

        if self.jobs.is_empty() {
            continuation();
            FrameSync::Immediate
        } else {
            if self.pending.replace(Box::new(continuation)).is_some() {
                tracing::warn!("frame barrier called again before the previous one resumed");
            }
            self.metrics.continuations_deferred += 1;
            FrameSync::Deferred
        }
    }

    /// Handles every response already waiting in the inbox without blocking.
    ///
    /// Returns the number of responses processed.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(response) = self.inbox.as_ref().and_then(|rx| rx.try_recv().ok()) else {
                break;
            };
            self.handle_response(response);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for a response, then drains the inbox.
    ///
    /// Returns the number of responses processed.
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        let first = match &self.inbox {
            Some(rx) => rx.recv_timeout(timeout),
            None => return 0,
        };
        match first {
            Ok(response) => {
                self.handle_response(response);
                1 + self.poll()
            }
            Err(_) => 0,
        }
    }

    fn resume_if_drained(&mut self) {
        if self.jobs.is_empty() {
            if let Some(continuation) = self.pending.take() {
                continuation();
            }
        }
    }

    /// Number of jobs dispatched but not yet completed.
    pub fn outstanding(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if a frame continuation is waiting on outstanding jobs.
    pub fn has_pending_continuation(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns true once every worker has acknowledged its readiness probe.
    pub fn is_ready(&self) -> bool {
        self.readiness.is_complete()
    }

    /// A shareable handle on the readiness countdown.
    pub fn readiness(&self) -> Countdown {
        self.readiness.clone()
    }

    /// Subscribers for scheduler events such as [`WorkerEvent::InitComplete`].
    pub fn events_mut(&mut self) -> &mut EventHandler {
        &mut self.events
    }

    /// Returns the number of workers in the pool.
    pub fn num_workers(&self) -> usize {
        self.pool.size()
    }

    /// Returns a snapshot of the dispatch counters.
    pub fn stats(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stops every worker and waits for them to finish.
    ///
    /// Jobs still in flight are abandoned and their callbacks never run.
    pub fn shutdown(self) -> Result<(), SchedulerError> {
        if !self.jobs.is_empty() {
            tracing::debug!(outstanding = self.jobs.len(), "shutting down with jobs in flight");
        }
        self.pool.shutdown()
    }
}

impl<K: Kernel> Scheduler<ThreadWorker<K>, K::Output> {
    /// Spawns `config.worker_count` thread workers, building each kernel with
    /// `factory(index)`.
    pub fn spawn<F>(config: &SchedulerConfig, mut factory: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(usize) -> K,
    {
        let count = config.effective_worker_count();
        let (replies, inbox) = channel::unbounded();

        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            workers.push(ThreadWorker::spawn(index, factory(index), replies.clone(), config)?);
        }

        tracing::debug!(workers = count, "worker pool started");
        Ok(Scheduler::new(workers)?.with_inbox(inbox))
    }
}

impl<W: WorkerPort, R> fmt::Debug for Scheduler<W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.pool.size())
            .field("jobs", &self.jobs)
            .field("next_id", &self.ids.peek())
            .field("ready", &self.readiness.is_complete())
            .field("pending_continuation", &self.pending.is_some())
            .finish()
    }
}
