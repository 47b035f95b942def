// SPDX-License-Identifier: GPL-3.0-only

//! Single-value exchange cells between the pipeline threads
//!
//! Neither cell ever queues: a new value replaces the old one, so a slow
//! consumer sees the freshest value and never a backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest published value, readable without waiting on the producer
///
/// The lock is held only to swap or clone an `Arc`.
#[derive(Debug)]
pub struct LatestSlot<T> {
    value: Mutex<Option<Arc<T>>>,
    generation: AtomicU64,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current value
    pub fn publish(&self, value: Arc<T>) {
        *lock(&self.value) = Some(value);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn latest(&self) -> Option<Arc<T>> {
        lock(&self.value).clone()
    }

    pub fn clear(&self) {
        *lock(&self.value) = None;
    }

    /// Number of values published so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Depth-one handoff from the capture thread to the decode thread
///
/// `offer` never blocks: an undrained value is overwritten.
#[derive(Debug)]
pub struct FrameHandoff<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Default for FrameHandoff<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }
}

impl<T> FrameHandoff<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `value` in the slot, returning the older value it displaced
    pub fn offer(&self, value: T) -> Option<T> {
        let displaced = lock(&self.value).replace(value);
        self.ready.notify_one();
        displaced
    }

    /// Take the pending value, waiting up to `timeout` for one to arrive
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let guard = lock(&self.value);
        let (mut guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |value| value.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.take()
    }

    /// Drop any pending value
    pub fn clear(&self) {
        lock(&self.value).take();
    }

    /// Wake a waiting consumer without handing over a value
    pub fn wake(&self) {
        self.ready.notify_all();
    }
}
