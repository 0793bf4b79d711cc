//! Broadcast one channel to several

use super::{recv_or_done, send_blocking, Done, Interrupted, Workers};
use crate::error::WorkerError;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Forward every value from `source` to all `n` returned channels
///
/// One dispatcher thread clones each value into every output in turn, so the
/// slowest consumer sets the pace. An output whose receiver is dropped is
/// left out from then on. All outputs close when `source` closes, when every
/// output is gone, or when `done` fires.
pub fn fan_out<'scope, T>(
    workers: &Workers<'scope, '_>,
    name: &str,
    source: Receiver<T>,
    n: usize,
    capacity: usize,
    done: &Done,
) -> Result<Vec<Receiver<T>>, WorkerError>
where
    T: Clone + Send + 'scope,
{
    let (mut outputs, receivers): (Vec<Sender<T>>, Vec<Receiver<T>>) =
        (0..n).map(|_| bounded(capacity)).unzip();

    let done = done.clone();
    workers.spawn(name.to_string(), move || {
        while let Some(value) = recv_or_done(&source, &done) {
            let mut cancelled = false;
            outputs.retain(|tx| {
                if cancelled {
                    return true;
                }
                match send_blocking(tx, value.clone(), &done) {
                    Ok(()) => true,
                    Err(Interrupted::Disconnected) => false,
                    Err(Interrupted::Cancelled) => {
                        cancelled = true;
                        true
                    }
                }
            });

            if cancelled || outputs.is_empty() {
                break;
            }
        }
    })?;

    Ok(receivers)
}
