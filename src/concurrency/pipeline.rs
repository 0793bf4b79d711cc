//! Transform stages

use super::{recv_or_done, Done, Emitter, Workers};
use crate::error::WorkerError;
use crossbeam_channel::{bounded, Receiver};
use std::sync::Arc;

/// Run `transform` over every value of `source` on one named thread
///
/// The transform may emit any number of outputs per input. The output
/// closes when `source` is exhausted, when `done` fires, or when the
/// downstream receiver is gone.
pub fn pipeline<'scope, I, O, F>(
    workers: &Workers<'scope, '_>,
    name: &str,
    source: Receiver<I>,
    capacity: usize,
    done: &Done,
    mut transform: F,
) -> Result<Receiver<O>, WorkerError>
where
    I: Send + 'scope,
    O: Send + 'scope,
    F: FnMut(I, &Emitter<'_, O>) + Send + 'scope,
{
    let (tx, rx) = bounded(capacity);
    let done = done.clone();

    workers.spawn(name.to_string(), move || {
        let emitter = Emitter::new(&tx, &done);
        while let Some(value) = recv_or_done(&source, &done) {
            transform(value, &emitter);
            if emitter.stopped().is_some() {
                break;
            }
        }
    })?;

    Ok(rx)
}

/// Run one [`pipeline`] per source, sharing one transform
///
/// Outputs are returned in source order. Sources may be clones of the same
/// receiver, in which case the stages compete for its values.
pub fn pipeline_multi<'scope, I, O, F>(
    workers: &Workers<'scope, '_>,
    name: &str,
    sources: Vec<Receiver<I>>,
    capacity: usize,
    done: &Done,
    transform: F,
) -> Result<Vec<Receiver<O>>, WorkerError>
where
    I: Send + 'scope,
    O: Send + 'scope,
    F: Fn(I, &Emitter<'_, O>) + Send + Sync + 'scope,
{
    let transform = Arc::new(transform);

    sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            let transform = Arc::clone(&transform);
            pipeline(
                workers,
                &format!("{}-{}", name, i),
                source,
                capacity,
                done,
                move |value, emitter: &Emitter<'_, O>| (*transform)(value, emitter),
            )
        })
        .collect()
}
