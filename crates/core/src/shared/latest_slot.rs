use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Single-value rendezvous slot with latest-value-wins overwrite.
///
/// A producer `put`s values at its own pace; an unconsumed value is replaced
/// (and dropped) by the next one, so the consumer only ever observes the most
/// recent value and no backlog can build up. Handles are cheap clones sharing
/// the same slot.
pub struct LatestSlot<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Clone for LatestSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// Store `value`, replacing any unconsumed predecessor.
    ///
    /// Returns `true` when a stale value was displaced.
    pub fn put(&self, value: T) -> bool {
        let mut slot = self.inner.slot.lock().unwrap();
        let displaced = slot.replace(value).is_some();
        self.inner.ready.notify_one();
        displaced
    }

    /// Take the current value without blocking.
    pub fn take(&self) -> Option<T> {
        self.inner.slot.lock().unwrap().take()
    }

    /// Block until a value is available or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = std::time::Instant::now() + timeout;
        let mut slot = self.inner.slot.lock().unwrap();
        loop {
            if let Some(value) = slot.take() {
                return Some(value);
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, result) = self.inner.ready.wait_timeout(slot, remaining).unwrap();
            slot = guard;
            if result.timed_out() && slot.is_none() {
                return None;
            }
        }
    }
}
