//! Search counters and the final statistics snapshot

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by the workers of one search
#[derive(Debug, Default)]
pub struct Counters {
    /// Directories listed
    pub dirs: AtomicU64,

    /// Files scanned
    pub files: AtomicU64,

    /// Bytes in scanned files
    pub bytes: AtomicU64,

    /// Matches delivered to the sink
    pub matches: AtomicU64,

    /// Per-unit failures (files or directories abandoned)
    pub errors: AtomicU64,

    /// Directories, files and matches dropped by the skip policy
    pub skipped: AtomicU64,

    /// Subdirectories handed to another directory worker
    pub handoffs: AtomicU64,

    /// Subdirectories descended synchronously because no worker had room
    pub inline: AtomicU64,
}

impl Counters {
    pub(crate) fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_file(&self, bytes: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handoff(&self) {
        self.handoffs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inline(&self) {
        self.inline.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the counters into a snapshot
    pub fn snapshot(&self, duration: Duration, completed: bool) -> SearchStats {
        SearchStats {
            dirs: self.dirs.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            handoffs: self.handoffs.load(Ordering::Relaxed),
            inline: self.inline.load(Ordering::Relaxed),
            duration,
            completed,
        }
    }
}

/// Statistics for a finished search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub matches: u64,
    pub errors: u64,
    pub skipped: u64,
    pub handoffs: u64,
    pub inline: u64,
    pub duration: Duration,

    /// False when the search was cancelled before it finished
    pub completed: bool,
}

impl SearchStats {
    pub fn files_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }

    /// Scan throughput in bytes per second
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}
