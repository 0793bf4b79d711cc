//! Bounded-channel combinators with cooperative cancellation
//!
//! Every stage here runs on named scoped threads, reads and writes bounded
//! `crossbeam-channel` channels, and races each blocking operation against a
//! shared [`Done`] token. Cancelling the token unblocks every stage at its
//! next suspension point; stages then drop their senders and the channels
//! downstream close in order.
//!
//! - [`fan_out`]: broadcast one channel to N
//! - [`fan_in`]: merge N channels into one
//! - [`pipeline`] / [`pipeline_multi`]: transform stages
//! - [`send_to_any`]: non-blocking hand-off to whichever channel has room
//! - [`proc_recursively`]: self-feeding worker pool built from the above

pub mod fan_in;
pub mod fan_out;
pub mod pipeline;
pub mod recursive;

pub use fan_in::fan_in;
pub use fan_out::fan_out;
pub use pipeline::{pipeline, pipeline_multi};
pub use recursive::{proc_recursively, Resubmit};

use crate::error::WorkerError;
use crossbeam_channel::{after, bounded, select, Receiver, Select, Sender};
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Cancellation token shared by every stage of a search
///
/// Cloning is cheap; all clones observe the same cancellation. The token
/// carries a channel that never receives a message and disconnects when the
/// token is cancelled, so it can sit in a `select` next to real channels.
#[derive(Clone)]
pub struct Done {
    inner: Arc<DoneInner>,
}

struct DoneInner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Done {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(DoneInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Cancel; idempotent
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Search cancelled");
        }
        self.inner.trigger.lock().take();
    }

    /// Check if cancellation has fired
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Channel that becomes ready (disconnected) once cancelled
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Cancel after `timeout`, unless cancelled earlier
    ///
    /// The timer runs until it fires, the token is cancelled, or the
    /// returned [`Deadline`] is dropped.
    pub fn cancel_after(&self, timeout: Duration) -> Result<Deadline, WorkerError> {
        let done = self.clone();
        let (stop, stopped) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("deadline".to_string())
            .spawn(move || {
                select! {
                    recv(done.signal()) -> _ => {}
                    recv(stopped) -> _ => {}
                    recv(after(timeout)) -> _ => {
                        debug!(timeout_ms = timeout.as_millis() as u64, "Deadline reached");
                        done.cancel();
                    }
                }
            })
            .map_err(|e| WorkerError::SpawnFailed {
                name: "deadline".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Deadline {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

/// Running deadline timer; dropping it stops the timer without cancelling
#[must_use = "dropping a Deadline stops its timer"]
pub struct Deadline {
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for Deadline {
    fn drop(&mut self) {
        // Disconnecting the stop channel wakes the timer thread
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("Deadline thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deadline")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl Default for Done {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Why a blocking send did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The cancellation token fired first
    Cancelled,

    /// Every receiver is gone
    Disconnected,
}

/// Outcome of a non-blocking hand-off; the value comes back when not sent
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// Taken by the destination at this index
    Sent(usize),

    /// Every destination was full
    Full(T),

    /// The destinations are closed
    Closed(T),

    /// The cancellation token fired
    Cancelled(T),
}

impl<T> Dispatch<T> {
    /// Recover the value of a failed hand-off
    pub fn into_inner(self) -> Option<T> {
        match self {
            Dispatch::Sent(_) => None,
            Dispatch::Full(v) | Dispatch::Closed(v) | Dispatch::Cancelled(v) => Some(v),
        }
    }
}

/// Send, blocking until the channel has room or `done` fires
pub fn send_blocking<T>(tx: &Sender<T>, value: T, done: &Done) -> Result<(), Interrupted> {
    if done.is_cancelled() {
        return Err(Interrupted::Cancelled);
    }

    let mut sel = Select::new();
    let send_index = sel.send(tx);
    sel.recv(done.signal());

    let oper = sel.select();
    if oper.index() == send_index {
        oper.send(tx, value).map_err(|_| Interrupted::Disconnected)
    } else {
        let _ = oper.recv(done.signal());
        Err(Interrupted::Cancelled)
    }
}

/// Receive, blocking until a value arrives, the channel closes, or `done` fires
pub fn recv_or_done<T>(rx: &Receiver<T>, done: &Done) -> Option<T> {
    if done.is_cancelled() {
        return None;
    }

    select! {
        recv(rx) -> msg => msg.ok(),
        recv(done.signal()) -> _ => None,
    }
}

/// Hand `value` to any one destination that has room right now
///
/// Never blocks. Cancellation is reported separately from "all full".
pub fn send_to_any<T>(targets: &[Sender<T>], value: T, done: &Done) -> Dispatch<T> {
    if done.is_cancelled() {
        return Dispatch::Cancelled(value);
    }
    if targets.is_empty() {
        return Dispatch::Closed(value);
    }

    let mut sel = Select::new();
    for tx in targets {
        sel.send(tx);
    }
    let done_index = sel.recv(done.signal());

    match sel.try_select() {
        Err(_) => Dispatch::Full(value),
        Ok(oper) if oper.index() == done_index => {
            let _ = oper.recv(done.signal());
            Dispatch::Cancelled(value)
        }
        Ok(oper) => {
            let index = oper.index();
            match oper.send(&targets[index], value) {
                Ok(()) => Dispatch::Sent(index),
                Err(err) => Dispatch::Closed(err.into_inner()),
            }
        }
    }
}

/// Blocking sender handed to stage callbacks
///
/// Remembers the first interruption so the stage loop can stop reading.
pub struct Emitter<'a, T> {
    tx: &'a Sender<T>,
    done: &'a Done,
    stopped: Cell<Option<Interrupted>>,
}

impl<'a, T> Emitter<'a, T> {
    pub fn new(tx: &'a Sender<T>, done: &'a Done) -> Self {
        Self {
            tx,
            done,
            stopped: Cell::new(None),
        }
    }

    /// Send downstream, blocking on backpressure, racing cancellation
    pub fn emit(&self, value: T) -> Result<(), Interrupted> {
        if let Some(reason) = self.stopped.get() {
            return Err(reason);
        }
        send_blocking(self.tx, value, self.done).map_err(|reason| {
            self.stopped.set(Some(reason));
            reason
        })
    }

    /// The interruption that stopped this emitter, if any
    pub fn stopped(&self) -> Option<Interrupted> {
        self.stopped.get()
    }

    pub fn done(&self) -> &'a Done {
        self.done
    }
}

/// Named scoped threads spawned for one search
///
/// Every stage registers its threads here; [`Workers::join`] waits for all
/// of them and reports the first one that panicked.
pub struct Workers<'scope, 'env> {
    scope: &'scope Scope<'scope, 'env>,
    handles: RefCell<Vec<(String, ScopedJoinHandle<'scope, ()>)>>,
}

impl<'scope, 'env> Workers<'scope, 'env> {
    pub fn new(scope: &'scope Scope<'scope, 'env>) -> Self {
        Self {
            scope,
            handles: RefCell::new(Vec::new()),
        }
    }

    /// Spawn a named thread in the search scope
    pub fn spawn<F>(&self, name: String, f: F) -> Result<(), WorkerError>
    where
        F: FnOnce() + Send + 'scope,
    {
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn_scoped(self.scope, f)
            .map_err(|e| WorkerError::SpawnFailed {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        trace!(worker = %name, "Spawned");
        self.handles.borrow_mut().push((name, handle));
        Ok(())
    }

    /// Threads spawned so far
    pub fn len(&self) -> usize {
        self.handles.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.borrow().is_empty()
    }

    /// Wait for every thread; report the first panic
    pub fn join(self) -> Result<(), WorkerError> {
        let mut first_panic = None;
        for (name, handle) in self.handles.into_inner() {
            if handle.join().is_err() && first_panic.is_none() {
                first_panic = Some(WorkerError::Panicked { name });
            }
        }
        match first_panic {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
