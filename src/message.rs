//! Worker protocol.
//!
//! Every message crossing the thread boundary is one of these variants.
//! Payloads are moved into the message, so the sender gives up the buffers
//! when it posts a job and gets them back only through [`Response::JobDone`].
//!
//! The serde representation uses an internal `type` tag with the wire names
//! `init`, `job`, `shutdown`, `initDone` and `jobDone`.

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// Driving thread to worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request<P> {
    /// Readiness probe. The worker answers with [`Response::InitDone`]
    /// carrying the same index.
    Init { worker: usize },
    /// A unit of work. The worker answers with [`Response::JobDone`]
    /// carrying the same id.
    Job { id: JobId, payload: P },
    /// Asks a thread worker to leave its loop.
    Shutdown,
}

/// Worker to driving thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response<R> {
    /// Readiness acknowledgment.
    InitDone { worker: usize },
    /// Result of a job, with the result buffers handed back.
    JobDone { id: JobId, payload: R },
}

impl<P> Request<P> {
    /// Returns the job id for `Job` requests.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Request::Job { id, .. } => Some(*id),
            Request::Init { .. } | Request::Shutdown => None,
        }
    }
}
