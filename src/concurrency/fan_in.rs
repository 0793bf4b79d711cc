//! Merge several channels into one

use super::{recv_or_done, send_blocking, Done, Workers};
use crate::error::WorkerError;
use crossbeam_channel::{bounded, Receiver};

/// Merge `sources` into one channel of `capacity`
///
/// One forwarder thread per source. The merged channel closes when the last
/// forwarder exits and drops its sender, so a consumer never sees the end of
/// the stream while any source is still live.
pub fn fan_in<'scope, T>(
    workers: &Workers<'scope, '_>,
    name: &str,
    sources: Vec<Receiver<T>>,
    capacity: usize,
    done: &Done,
) -> Result<Receiver<T>, WorkerError>
where
    T: Send + 'scope,
{
    let (tx, rx) = bounded(capacity);

    for (i, source) in sources.into_iter().enumerate() {
        let tx = tx.clone();
        let done = done.clone();
        workers.spawn(format!("{}-{}", name, i), move || {
            while let Some(value) = recv_or_done(&source, &done) {
                if send_blocking(&tx, value, &done).is_err() {
                    break;
                }
            }
        })?;
    }

    Ok(rx)
}
