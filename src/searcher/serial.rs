//! Single-threaded searcher, used when concurrency is zero

use super::{report_unit_error, Counters, SearchStats, Searcher};
use crate::concurrency::Done;
use crate::error::{Result, SearchError};
use crate::filter::SkipPolicy;
use crate::sink::Sink;
use crate::source::EntrySource;
use crate::types::Control;
use crate::walker::Walker;
use regex::Regex;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Walks, scans and delivers on the calling thread
///
/// Cancellation is checked before every entry and every match.
pub struct SerialSearcher<S, P> {
    walker: Walker<S>,
    policy: P,
}

impl<S: EntrySource, P: SkipPolicy> SerialSearcher<S, P> {
    pub fn new(walker: Walker<S>, policy: P) -> Self {
        Self { walker, policy }
    }
}

impl<S: EntrySource, P: SkipPolicy> Searcher for SerialSearcher<S, P> {
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

        debug!(root = %root.display(), "Starting serial search");

        let counters = Counters::default();
        let walker = &self.walker;
        let policy = &self.policy;

        let result = walker.walk_entry(
            &root_entry,
            |entry| {
                if done.is_cancelled() {
                    return Control::SkipAll;
                }

                if entry.is_dir {
                    if policy.skip_directory(entry) {
                        counters.record_skip();
                        return Control::SkipItem;
                    }
                    counters.record_dir();
                    return Control::Continue;
                }

                if policy.skip_file(entry) {
                    counters.record_skip();
                    return Control::SkipItem;
                }

                counters.record_file(entry.size);
                let scanned = walker.scan_file(entry, pattern, |found| {
                    if done.is_cancelled() {
                        return Control::SkipAll;
                    }
                    if policy.skip_match(&found) {
                        counters.record_skip();
                        return Control::SkipItem;
                    }
                    counters.record_match();
                    sink.handle(found);
                    Control::Continue
                });
                if let Err(err) = scanned {
                    report_unit_error(&counters, &err);
                }

                Control::Continue
            },
            |err| report_unit_error(&counters, &err),
        );

        if let Err(err) = result {
            report_unit_error(&counters, &err);
        }

        let stats = counters.snapshot(start.elapsed(), !done.is_cancelled());
        debug!(
            matches = stats.matches,
            files = stats.files,
            dirs = stats.dirs,
            errors = stats.errors,
            duration_ms = stats.duration.as_millis() as u64,
            completed = stats.completed,
            "Search finished"
        );
        Ok(stats)
    }
}
