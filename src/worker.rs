//! Workers and the pool that hands jobs out to them.
//!
//! The scheduler only ever talks to a worker through [`WorkerPort`]: it posts
//! a [`Request`] and expects a [`Response`](crate::message::Response) to show
//! up later on whatever channel the host wired up. [`ThreadWorker`] is the
//! stock implementation, one OS thread running a [`Kernel`].

use crate::error::SchedulerError;
use crate::kernel::Kernel;
use crate::message::{Request, Response};
use crate::scheduler::SchedulerConfig;
use crossbeam::channel::{self, Receiver, SendError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// The sending side of a worker.
pub trait WorkerPort {
    /// Payload type carried by `Job` requests.
    type Payload: Send + 'static;

    /// Posts a request to the worker. Ownership of the payload moves with it.
    ///
    /// On failure the undelivered request is handed back.
    fn post(
        &self,
        request: Request<Self::Payload>,
    ) -> Result<(), SendError<Request<Self::Payload>>>;

    /// Stops the worker and waits for it. Returns false if it died abnormally.
    fn terminate(self) -> bool
    where
        Self: Sized,
    {
        true
    }
}

/// A worker running a [`Kernel`] on its own thread.
pub struct ThreadWorker<K: Kernel> {
    id: usize,
    inbox: Sender<Request<K::Payload>>,
    handle: Option<JoinHandle<()>>,
}

impl<K: Kernel> ThreadWorker<K> {
    /// Spawns the worker thread.
    ///
    /// Every response is sent on `replies`. The thread exits when it receives
    /// [`Request::Shutdown`], when its inbox is dropped, or when nobody is
    /// left listening on `replies`.
    pub fn spawn(
        id: usize,
        kernel: K,
        replies: Sender<Response<K::Output>>,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let (inbox, requests) = channel::unbounded();
        let pin_to_core = config.pin_to_core;

        let handle = thread::Builder::new()
            .name(format!("{}-{}", config.thread_name, id))
            .spawn(move || {
                if pin_to_core {
                    pin_current_thread(id);
                }
                Self::run_loop(id, kernel, requests, replies);
            })?;

        tracing::debug!(worker = id, "spawned worker thread");

        Ok(ThreadWorker {
            id,
            inbox,
            handle: Some(handle),
        })
    }

    fn run_loop(
        id: usize,
        mut kernel: K,
        requests: Receiver<Request<K::Payload>>,
        replies: Sender<Response<K::Output>>,
    ) {
        for request in requests.iter() {
            let response = match request {
                Request::Init { worker } => Response::InitDone { worker },
                Request::Job { id: job, payload } => {
                    match panic::catch_unwind(AssertUnwindSafe(|| kernel.run(payload))) {
                        Ok(output) => Response::JobDone {
                            id: job,
                            payload: output,
                        },
                        Err(_) => {
                            // The job stays in flight on the driving side.
                            tracing::error!(worker = id, job, "kernel panicked");
                            continue;
                        }
                    }
                }
                Request::Shutdown => break,
            };

            if replies.send(response).is_err() {
                break;
            }
        }

        tracing::debug!(worker = id, "worker thread exiting");
    }

    /// Waits for the worker thread to finish.
    pub fn join(mut self) -> thread::Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.join()
        } else {
            Ok(())
        }
    }
}

impl<K: Kernel> WorkerPort for ThreadWorker<K> {
    type Payload = K::Payload;

    fn post(&self, request: Request<K::Payload>) -> Result<(), SendError<Request<K::Payload>>> {
        self.inbox.send(request)
    }

    fn terminate(self) -> bool {
        // A worker that already exited has dropped its receiver; that is fine.
        let _ = self.inbox.send(Request::Shutdown);
        let id = self.id;
        match self.join() {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(worker = id, "worker panicked during execution");
                false
            }
        }
    }
}

fn pin_current_thread(id: usize) {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if core_ids.is_empty() {
            return;
        }
        let core = core_ids[id % core_ids.len()];
        if !core_affinity::set_for_current(core) {
            tracing::warn!(worker = id, core = core.id, "failed to pin worker thread");
        }
    }
}

/// A port whose requests land on a channel the host reads itself.
///
/// Useful when the host runs the computation somewhere the scheduler does not
/// manage, and feeds replies back through
/// [`Scheduler::handle_response`](crate::Scheduler::handle_response).
#[derive(Debug, Clone)]
pub struct ChannelPort<P> {
    sender: Sender<Request<P>>,
}

impl<P> ChannelPort<P> {
    /// Creates a port and the receiver its requests are delivered to.
    pub fn new() -> (Self, Receiver<Request<P>>) {
        let (sender, receiver) = channel::unbounded();
        (ChannelPort { sender }, receiver)
    }
}

impl<P: Send + 'static> WorkerPort for ChannelPort<P> {
    type Payload = P;

    fn post(&self, request: Request<P>) -> Result<(), SendError<Request<P>>> {
        self.sender.send(request)
    }
}

/// Fixed, ordered set of workers with round-robin allocation.
#[derive(Debug)]
pub struct WorkerPool<W> {
    workers: Vec<W>,
    cursor: usize,
}

impl<W> WorkerPool<W> {
    /// Creates a pool over `workers`. Membership never changes afterwards.
    pub fn new(workers: Vec<W>) -> Self {
        WorkerPool { workers, cursor: 0 }
    }

    /// Returns the next worker and its index, advancing the cursor circularly.
    ///
    /// Returns `None` for an empty pool.
    pub fn allocate(&mut self) -> Option<(usize, &W)> {
        if self.workers.is_empty() {
            return None;
        }
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.workers.len();
        Some((index, &self.workers[index]))
    }

    /// Returns the number of workers in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Index the next [`allocate`](Self::allocate) call will return.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl<W: WorkerPort> WorkerPool<W> {
    /// Stops every worker and waits for them.
    ///
    /// Returns an error with the number of workers that panicked.
    pub fn shutdown(self) -> Result<(), SchedulerError> {
        let failed = self
            .workers
            .into_iter()
            .map(|worker| worker.terminate())
            .filter(|ok| !ok)
            .count();

        if failed > 0 {
            Err(SchedulerError::WorkerPanicked { count: failed })
        } else {
            Ok(())
        }
    }
}
