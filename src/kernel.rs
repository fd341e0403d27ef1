//! Computations run inside workers.
//!
//! A [`Kernel`] receives the payload of a job by value and returns the result
//! by value. It never sees the scheduler's state, and nothing is shared with
//! the driving thread while it runs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A pure computation executed on a worker thread.
pub trait Kernel: Send + 'static {
    /// Buffers handed to the worker with each job.
    type Payload: Send + 'static;
    /// Buffers handed back with the result.
    type Output: Send + 'static;

    fn run(&mut self, payload: Self::Payload) -> Self::Output;
}

/// Buffers for one depth sort.
///
/// `order` is overwritten by the sort; only its length matters on input.
/// Both vectors travel to the worker and back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortPayload {
    pub order: Vec<u32>,
    pub distance: Vec<f32>,
}

impl SortPayload {
    /// Builds a payload whose order buffer matches `distance` in length.
    pub fn new(distance: Vec<f32>) -> Self {
        SortPayload {
            order: vec![0; distance.len()],
            distance,
        }
    }
}

/// Sorts particle indices by ascending distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthSort;

impl Kernel for DepthSort {
    type Payload = SortPayload;
    type Output = SortPayload;

    fn run(&mut self, mut payload: SortPayload) -> SortPayload {
        sort_particles(&mut payload.order, &payload.distance);
        payload
    }
}

/// Fills `order` with `0..order.len()` and sorts it by `distance[index]`.
///
/// The sort is stable, so particles at equal distance keep index order.
/// `-0.0` and `0.0` are equal. Indices past the end of `distance` and NaN
/// distances of either sign sort after every other distance.
pub fn sort_particles(order: &mut [u32], distance: &[f32]) {
    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i as u32;
    }

    let key = |index: u32| distance.get(index as usize).copied().unwrap_or(f32::NAN);
    order.sort_by(|&a, &b| compare_distance(key(a), key(b)));
}

/// Orders by `partial_cmp`, with every NaN equal to every other NaN and
/// greater than any number.
fn compare_distance(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}
