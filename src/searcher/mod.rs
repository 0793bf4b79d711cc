//! Searchers - run a whole search from a root path to a sink
//!
//! Two implementations share one contract:
//!
//! - [`SerialSearcher`]: walk, scan and delivery on the calling thread
//! - [`ConcurrentSearcher`]: a directory pool feeding a file pool feeding a
//!   merge stage, delivered to the sink on the calling thread
//!
//! # Architecture
//!
//! ```text
//!        root ──seed──▶ ┌──────────────┐  resubmit (non-blocking)
//!                       │ dir-worker×D │◀──────────────┐
//!                       │  walk level  │───────────────┘
//!                       └──────┬───────┘
//!                              │ files (blocking, bounded)
//!                       ┌──────▼───────┐
//!                       │file-worker×F │
//!                       │  scan_file   │
//!                       └──────┬───────┘
//!                              │ matches
//!                       ┌──────▼───────┐
//!                       │ match-merge  │──▶ Sink (calling thread)
//!                       └──────────────┘
//! ```
//!
//! Per-unit failures are logged and counted; only a root that cannot be
//! resolved fails the search. Cancellation is not an error: the search
//! returns normally with `completed == false`.

pub mod concurrent;
pub mod serial;
pub mod stats;

pub use concurrent::ConcurrentSearcher;
pub use serial::SerialSearcher;
pub use stats::{Counters, SearchStats};

use crate::concurrency::Done;
use crate::error::{Result, ScanError};
use crate::sink::Sink;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

/// Runs one search to completion or cancellation
pub trait Searcher {
    /// Deliver every match below `root` to `sink`
    ///
    /// Returns once the sink has received the last match. Fails only when
    /// the root cannot be resolved or the workers cannot be run.
    fn search(&self, root: &Path, pattern: &Regex, done: &Done, sink: &mut dyn Sink)
        -> Result<SearchStats>;
}

impl<T: Searcher + ?Sized> Searcher for Box<T> {
    fn search(
        &self,
        root: &Path,
        pattern: &Regex,
        done: &Done,
        sink: &mut dyn Sink,
    ) -> Result<SearchStats> {
        (**self).search(root, pattern, done, sink)
    }
}

/// Count and log a failure contained to one file or directory
pub(crate) fn report_unit_error(counters: &Counters, err: &ScanError) {
    counters.record_error();

    if err.is_not_found() {
        debug!(path = %err.path().display(), error = %err, "Entry vanished during search");
    } else if err.is_content() {
        debug!(path = %err.path().display(), error = %err, "Skipping file content");
    } else {
        warn!(path = %err.path().display(), error = %err, "Skipping unreadable entry");
    }
}
