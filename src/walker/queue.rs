//! Pending-work accounting for self-feeding worker pools
//!
//! A pool whose workers produce more work for themselves cannot tell it is
//! finished by looking at its queues: an empty queue with a busy worker may
//! still grow. Completion is tracked instead with a counter of outstanding
//! units. A unit is counted when it is reserved (before it is handed to a
//! queue) and uncounted exactly once when it has been fully processed, or
//! when its hand-off failed and the reservation is rolled back.
//!
//! When the count returns to zero the idle callback fires once; the
//! dispatcher uses it to close the pool's input channels.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Outstanding-unit counter for one search
pub struct PendingWork {
    pending: AtomicU64,
    idle: AtomicBool,
    on_idle: Box<dyn Fn() + Send + Sync>,
}

impl PendingWork {
    /// Create a counter with no outstanding units
    pub fn new<F>(on_idle: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            pending: AtomicU64::new(0),
            idle: AtomicBool::new(false),
            on_idle: Box::new(on_idle),
        }
    }

    /// Count one more outstanding unit
    pub fn reserve(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Uncount one unit, firing the idle callback if none remain
    ///
    /// Returns true for the call that brought the count to zero.
    pub fn complete_one(&self) -> bool {
        let previous = self.pending.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "pending-work counter underflow");

        if previous == 1 && !self.idle.swap(true, Ordering::SeqCst) {
            (self.on_idle)();
            return true;
        }
        false
    }

    /// Mark the start of processing a dequeued unit
    ///
    /// The unit's reservation is released when the guard drops.
    pub fn begin(&self) -> WorkGuard<'_> {
        WorkGuard { work: self }
    }
}

impl std::fmt::Debug for PendingWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWork")
            .field("pending", &self.pending.load(Ordering::SeqCst))
            .field("idle", &self.idle.load(Ordering::SeqCst))
            .finish()
    }
}

/// RAII guard releasing one unit's reservation
pub struct WorkGuard<'a> {
    work: &'a PendingWork,
}

impl<'a> Drop for WorkGuard<'a> {
    fn drop(&mut self) {
        self.work.complete_one();
    }
}
