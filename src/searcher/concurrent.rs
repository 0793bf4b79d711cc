//! Two-stage worker pool searcher
//!
//! The directory stage is a self-feeding pool: each worker walks one
//! directory, offering every subdirectory back to the pool and descending
//! into it itself when no peer has room. Files go to the file stage over a
//! bounded channel with blocking sends, so discovery is throttled to the
//! speed of scanning. Matches are merged into one stream and handed to the
//! sink on the calling thread.

use super::{report_unit_error, Counters, SearchStats, Searcher};
use crate::concurrency::{
    fan_in, pipeline_multi, proc_recursively, Dispatch, Done, Emitter, Resubmit, Workers,
};
use crate::error::{Result, SearchError, WorkerError};
use crate::filter::SkipPolicy;
use crate::sink::Sink;
use crate::source::EntrySource;
use crate::types::{Control, Entry, Match, WorkUnit};
use crate::walker::Walker;
use crossbeam_channel::Receiver;
use regex::Regex;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Default channel capacity between stages
pub const DEFAULT_CAPACITY: usize = 1024;

/// Searcher running a directory pool and a file pool
pub struct ConcurrentSearcher<S, P> {
    walker: Walker<S>,
    policy: P,
    concurrency: usize,
    capacity: usize,
}

/// Split total concurrency into directory and file workers, at least one each
pub fn stage_sizes(concurrency: usize) -> (usize, usize) {
    let dirs = (concurrency / 2).max(1);
    let files = concurrency.saturating_sub(dirs).max(1);
    (dirs, files)
}

impl<S: EntrySource, P: SkipPolicy> ConcurrentSearcher<S, P> {
    pub fn new(walker: Walker<S>, policy: P, concurrency: usize) -> Self {
        Self {
            walker,
            policy,
            concurrency,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the capacity of every channel between stages
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Walk one work unit, handing subdirectories to peers where possible
    fn walk_unit(
        &self,
        unit: WorkUnit,
        resubmit: &Resubmit<'_, WorkUnit>,
        files: &Emitter<'_, Entry>,
        counters: &Counters,
    ) {
        let result = self.walker.walk(
            &unit.path,
            unit.depth,
            |entry| {
                if resubmit.is_cancelled() {
                    return Control::SkipAll;
                }

                if !entry.is_dir {
                    if self.policy.skip_file(entry) {
                        counters.record_skip();
                        return Control::SkipItem;
                    }
                    return match files.emit(entry.clone()) {
                        Ok(()) => Control::Continue,
                        Err(_) => Control::SkipAll,
                    };
                }

                if self.policy.skip_directory(entry) {
                    counters.record_skip();
                    return Control::SkipItem;
                }

                // The unit's own directory is listed here
                if entry.depth == unit.depth {
                    counters.record_dir();
                    return Control::Continue;
                }

                match resubmit.submit(WorkUnit::new(entry.path.clone(), entry.depth)) {
                    Dispatch::Sent(_) => {
                        counters.record_handoff();
                        Control::SkipItem
                    }
                    Dispatch::Full(_) | Dispatch::Closed(_) => {
                        counters.record_inline();
                        counters.record_dir();
                        Control::Continue
                    }
                    // The next step observes the cancellation
                    Dispatch::Cancelled(_) => Control::Continue,
                }
            },
            |err| report_unit_error(counters, &err),
        );

        if let Err(err) = result {
            report_unit_error(counters, &err);
        }
    }

    /// Scan one file, forwarding matches that pass the policy
    fn scan_entry(
        &self,
        entry: Entry,
        pattern: &Regex,
        matches: &Emitter<'_, Match>,
        counters: &Counters,
    ) {
        counters.record_file(entry.size);

        let result = self.walker.scan_file(&entry, pattern, |found| {
            if self.policy.skip_match(&found) {
                counters.record_skip();
                return Control::SkipItem;
            }
            match matches.emit(found) {
                Ok(()) => Control::Continue,
                Err(_) => Control::SkipAll,
            }
        });

        if let Err(err) = result {
            report_unit_error(counters, &err);
        }
    }

    /// Start every stage; returns the merged match stream
    fn start<'scope, 'env>(
        &'env self,
        workers: &Workers<'scope, 'env>,
        root: WorkUnit,
        pattern: &'env Regex,
        done: &Done,
        counters: &'env Counters,
    ) -> std::result::Result<Receiver<Match>, WorkerError>
    where
        'env: 'scope,
    {
        let (dir_workers, file_workers) = stage_sizes(self.concurrency);

        let dir_outputs = proc_recursively(
            workers,
            "dir-worker",
            root,
            dir_workers,
            self.capacity,
            done,
            move |unit: WorkUnit, resubmit: &Resubmit<'_, WorkUnit>, files: &Emitter<'_, Entry>| {
                self.walk_unit(unit, resubmit, files, counters)
            },
        )?;
        let files = fan_in(workers, "file-merge", dir_outputs, self.capacity, done)?;

        let file_outputs = pipeline_multi(
            workers,
            "file-worker",
            vec![files; file_workers],
            self.capacity,
            done,
            move |entry: Entry, matches: &Emitter<'_, Match>| {
                self.scan_entry(entry, pattern, matches, counters)
            },
        )?;

        fan_in(workers, "match-merge", file_outputs, self.capacity, done)
    }
}

impl<S: EntrySource, P: SkipPolicy> Searcher for ConcurrentSearcher<S, P> {
    fn search(
        &self,
        root: &Path,
        pattern: &Regex,
        done: &Done,
        sink: &mut dyn Sink,
    ) -> Result<SearchStats> {
        let start = Instant::now();
        let root_entry = self
            .walker
            .source()
            .resolve_root(root, 0)
            .map_err(SearchError::Root)?;

        let (dir_workers, file_workers) = stage_sizes(self.concurrency);
        debug!(
            root = %root.display(),
            dir_workers,
            file_workers,
            capacity = self.capacity,
            "Starting search"
        );

        let counters = Counters::default();

        thread::scope(|scope| -> Result<()> {
            let workers = Workers::new(scope);

            let started = self.start(
                &workers,
                WorkUnit::new(root_entry.path.clone(), root_entry.depth),
                pattern,
                done,
                &counters,
            );

            match started {
                Ok(matches) => {
                    debug!(threads = workers.len(), "Stages running");
                    // Drain to the end even after cancellation: whatever
                    // reached the merge stage is delivered
                    for found in matches.iter() {
                        counters.record_match();
                        sink.handle(found);
                    }
                    workers.join()?;
                    Ok(())
                }
                Err(err) => {
                    // Unwind whatever was already started
                    done.cancel();
                    let _ = workers.join();
                    Err(err.into())
                }
            }
        })?;

        let stats = counters.snapshot(start.elapsed(), !done.is_cancelled());
        debug!(
            matches = stats.matches,
            files = stats.files,
            dirs = stats.dirs,
            errors = stats.errors,
            handoffs = stats.handoffs,
            inline = stats.inline,
            duration_ms = stats.duration.as_millis() as u64,
            completed = stats.completed,
            "Search finished"
        );
        Ok(stats)
    }
}
