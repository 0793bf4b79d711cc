//! Self-feeding worker pool
//!
//! N workers each drain one bounded input channel. Processing a value may
//! discover more values of the same kind; the worker offers them back to the
//! pool through [`Resubmit`], which never blocks. When every input is full
//! the offer is refused and the worker must process the value itself. A
//! worker blocking on its own, possibly saturated, input set would deadlock
//! the pool.
//!
//! Completion is tracked with a [`PendingWork`] counter: the seed counts as
//! one unit, every accepted resubmission adds one, every fully processed
//! value removes one. At zero all inputs are closed and the workers drain
//! out.

use super::{pipeline_multi, send_blocking, send_to_any, Dispatch, Done, Emitter, Workers};
use crate::error::WorkerError;
use crate::walker::PendingWork;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

type Inputs<I> = Arc<RwLock<Option<Vec<Sender<I>>>>>;

/// Hands newly discovered work back to the pool
pub struct Resubmit<'a, I> {
    inputs: &'a RwLock<Option<Vec<Sender<I>>>>,
    pending: &'a PendingWork,
    done: &'a Done,
}

impl<'a, I> Resubmit<'a, I> {
    /// Offer `value` to any worker with room, without blocking
    ///
    /// On anything but `Sent` the value comes back and the caller must
    /// process it synchronously (or drop it, when cancelled).
    pub fn submit(&self, value: I) -> Dispatch<I> {
        // Count the unit before a peer can receive and finish it
        self.pending.reserve();

        let outcome = {
            let inputs = self.inputs.read();
            match inputs.as_deref() {
                Some(targets) => send_to_any(targets, value, self.done),
                None => Dispatch::Closed(value),
            }
        };

        if !matches!(outcome, Dispatch::Sent(_)) {
            self.pending.complete_one();
        }
        outcome
    }

    pub fn is_cancelled(&self) -> bool {
        self.done.is_cancelled()
    }
}

/// Start a self-feeding pool of `count` workers seeded with `root`
///
/// `process` runs once per value, with a [`Resubmit`] handle for discovered
/// work and an [`Emitter`] for results. Returns one output channel per
/// worker; each closes when its worker exits.
///
/// The seed is sent with a blocking send once the workers are running, so it
/// is delivered even when `capacity` is zero.
pub fn proc_recursively<'scope, I, O, P>(
    workers: &Workers<'scope, '_>,
    name: &str,
    root: I,
    count: usize,
    capacity: usize,
    done: &Done,
    process: P,
) -> Result<Vec<Receiver<O>>, WorkerError>
where
    I: Send + 'static,
    O: Send + 'scope,
    P: Fn(I, &Resubmit<'_, I>, &Emitter<'_, O>) + Send + Sync + 'scope,
{
    let count = count.max(1);
    let (senders, receivers): (Vec<Sender<I>>, Vec<Receiver<I>>) =
        (0..count).map(|_| bounded(capacity)).unzip();

    let inputs: Inputs<I> = Arc::new(RwLock::new(Some(senders)));
    let pending = {
        let inputs = Arc::clone(&inputs);
        Arc::new(PendingWork::new(move || {
            trace!("Pending work reached zero, closing inputs");
            inputs.write().take();
        }))
    };

    // The seed's reservation
    pending.reserve();

    let outputs = {
        let inputs = Arc::clone(&inputs);
        let pending = Arc::clone(&pending);
        pipeline_multi(workers, name, receivers, capacity, done, move |value, emitter| {
            let _guard = pending.begin();
            let resubmit = Resubmit {
                inputs: &inputs,
                pending: &pending,
                done: emitter.done(),
            };
            process(value, &resubmit, emitter);
        })
    };

    let outputs = match outputs {
        Ok(outputs) => outputs,
        Err(err) => {
            // Workers already started exit once their inputs close
            inputs.write().take();
            return Err(err);
        }
    };

    let seed = inputs.read().as_ref().and_then(|senders| senders.first().cloned());
    let seeded = match seed {
        Some(tx) => send_blocking(&tx, root, done).is_ok(),
        None => false,
    };
    if !seeded {
        debug!("Seed not delivered, search cancelled before start");
        pending.complete_one();
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::fan_in;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Expand n into its children 2n+1 and 2n+2 below `limit`, emitting every
    /// value processed. Refused resubmissions are processed inline.
    fn run_tree(count: usize, capacity: usize, limit: u32) -> (Vec<u32>, usize) {
        let done = Done::new();
        let inline = AtomicUsize::new(0);

        let values = thread::scope(|scope| {
            let workers = Workers::new(scope);
            let outputs = proc_recursively(
                &workers,
                "tree",
                0u32,
                count,
                capacity,
                &done,
                |root: u32, resubmit: &Resubmit<'_, u32>, emit: &Emitter<'_, u32>| {
                    let mut stack = vec![root];
                    while let Some(n) = stack.pop() {
                        if emit.emit(n).is_err() {
                            return;
                        }
                        for child in [2 * n + 1, 2 * n + 2] {
                            if child >= limit {
                                continue;
                            }
                            if let Some(child) = resubmit.submit(child).into_inner() {
                                inline.fetch_add(1, Ordering::Relaxed);
                                stack.push(child);
                            }
                        }
                    }
                },
            )
            .unwrap();

            let merged = fan_in(&workers, "tree-merge", outputs, capacity, &done).unwrap();
            let values: Vec<u32> = merged.iter().collect();
            workers.join().unwrap();
            values
        });

        (values, inline.load(Ordering::Relaxed))
    }

    #[test]
    fn test_every_value_processed_once() {
        for (count, capacity) in [(1, 0), (1, 1), (2, 1), (4, 4), (8, 64)] {
            let (mut values, _) = run_tree(count, capacity, 500);
            values.sort_unstable();
            assert_eq!(
                values,
                (0..500).collect::<Vec<_>>(),
                "count={count} capacity={capacity}"
            );
        }
    }

    #[test]
    fn test_saturated_pool_processes_inline() {
        // One worker with no buffer can never accept its own resubmissions
        let (values, inline) = run_tree(1, 0, 100);
        assert_eq!(values.len(), 100);
        assert_eq!(inline, 99);
    }

    #[test]
    fn test_single_value_terminates() {
        let (values, inline) = run_tree(3, 2, 1);
        assert_eq!(values, vec![0]);
        assert_eq!(inline, 0);
    }

    #[test]
    fn test_cancelled_before_seed() {
        let done = Done::new();
        done.cancel();

        thread::scope(|scope| {
            let workers = Workers::new(scope);
            let outputs = proc_recursively(
                &workers,
                "cancelled",
                1u32,
                2,
                1,
                &done,
                |v: u32, _: &Resubmit<'_, u32>, emit: &Emitter<'_, u32>| {
                    let _ = emit.emit(v);
                },
            )
            .unwrap();
            for out in outputs {
                assert!(out.recv().is_err());
            }
            workers.join().unwrap();
        });
    }

    #[test]
    fn test_cancel_mid_run_unwinds() {
        let done = Done::new();
        let seen = thread::scope(|scope| {
            let workers = Workers::new(scope);
            let outputs = proc_recursively(
                &workers,
                "endless",
                0u64,
                4,
                2,
                &done,
                |n: u64, resubmit: &Resubmit<'_, u64>, emit: &Emitter<'_, u64>| {
                    let mut stack = vec![n];
                    while let Some(n) = stack.pop() {
                        if resubmit.is_cancelled() || emit.emit(n).is_err() {
                            return;
                        }
                        if let Some(next) = resubmit.submit(n + 1).into_inner() {
                            stack.push(next);
                        }
                    }
                },
            )
            .unwrap();
            let merged = fan_in(&workers, "endless-merge", outputs, 2, &done).unwrap();

            let mut seen = HashSet::new();
            for value in merged.iter() {
                seen.insert(value);
                if seen.len() == 50 {
                    done.cancel();
                }
            }
            workers.join().unwrap();
            seen
        });

        assert!(seen.len() >= 50);
    }
}
