//! Countdown used to track worker readiness.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A thread-safe countdown that reports reaching zero exactly once.
///
/// Clones share the same value, so a host can keep a handle and check
/// readiness from another thread while the scheduler owns the decrements.
#[derive(Clone, Debug)]
pub struct Countdown {
    inner: Arc<AtomicUsize>,
}

impl Countdown {
    /// Creates a countdown with the specified initial value.
    pub fn new(initial: usize) -> Self {
        Countdown {
            inner: Arc::new(AtomicUsize::new(initial)),
        }
    }

    /// Decrements the countdown by one.
    ///
    /// Returns true only for the decrement that moves the value from one to
    /// zero. Decrements once the value is already zero leave it at zero and
    /// return false.
    pub fn decrement(&self) -> bool {
        match self
            .inner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
        {
            Ok(previous) => previous == 1,
            Err(_) => false,
        }
    }

    /// Returns the current value of the countdown.
    pub fn value(&self) -> usize {
        self.inner.load(Ordering::Acquire)
    }

    /// Checks if the countdown has reached zero.
    pub fn is_complete(&self) -> bool {
        self.value() == 0
    }
}
