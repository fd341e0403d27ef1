//! Job bookkeeping.
//!
//! A job exists from the moment it is submitted until its result comes back.
//! The [`JobTable`] holds the completion callback of every job in flight, and
//! its size is the authoritative count of outstanding work for the frame.

use std::collections::HashMap;
use std::fmt;

/// Frame-scoped job identifier. Ids restart at zero after every frame barrier.
pub type JobId = u32;

/// Callback invoked on the driving thread with a job's result.
pub type JobCallback<R> = Box<dyn FnOnce(R) + 'static>;

/// Hands out sequential job ids for the current frame.
#[derive(Debug, Default, Clone)]
pub struct JobIdCounter {
    next: JobId,
}

impl JobIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id and advances the counter.
    pub fn next_id(&mut self) -> JobId {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Rewinds to the first id. Called at every frame barrier.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// The id the next submission will receive.
    pub fn peek(&self) -> JobId {
        self.next
    }
}

/// Mapping from job id to pending completion callback.
///
/// An id present in the table has been dispatched but not completed.
pub struct JobTable<R> {
    entries: HashMap<JobId, JobCallback<R>>,
}

impl<R> JobTable<R> {
    pub fn new() -> Self {
        JobTable {
            entries: HashMap::new(),
        }
    }

    /// Registers `callback` under `id`.
    ///
    /// Returns true if an older callback with the same id was replaced. That
    /// happens when a job from a previous frame is still in flight when its id
    /// is handed out again.
    pub fn insert(&mut self, id: JobId, callback: JobCallback<R>) -> bool {
        self.entries.insert(id, callback).is_some()
    }

    /// Removes and returns the callback for `id`, if any.
    pub fn take(&mut self, id: JobId) -> Option<JobCallback<R>> {
        self.entries.remove(&id)
    }

    /// Number of jobs in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R> Default for JobTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for JobTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("JobTable").field("in_flight", &ids).finish()
    }
}
