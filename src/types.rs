//! Value types shared by every stage of a search
//!
//! `Entry` and `Match` are plain values: they are cloned or moved across
//! channel boundaries and never shared mutably.

use crate::error::ScanError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Metadata for one filesystem node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Full path to the entry
    pub path: PathBuf,

    /// Depth from the search root (root = 0)
    pub depth: usize,

    /// Whether the entry is a directory
    pub is_dir: bool,

    /// Size in bytes (0 for directories on most sources)
    pub size: u64,

    /// Last modification time, when the source knows it
    pub modified: Option<DateTime<Utc>>,
}

impl Entry {
    /// Create a directory entry
    pub fn dir(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self {
            path: path.into(),
            depth,
            is_dir: true,
            size: 0,
            modified: None,
        }
    }

    /// Create a file entry
    pub fn file(path: impl Into<PathBuf>, depth: usize, size: u64) -> Self {
        Self {
            path: path.into(),
            depth,
            is_dir: false,
            size,
            modified: None,
        }
    }
}

/// One reported occurrence of the search pattern
///
/// Only the first occurrence on a line is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Path to the file
    pub path: PathBuf,

    /// Line number, 1-based
    pub line_number: usize,

    /// Byte offset where the match starts, 0-based
    pub start: usize,

    /// Byte offset where the match ends (exclusive)
    pub end: usize,

    /// Full text of the line, without its terminator
    pub line: String,
}

impl Match {
    /// The matched part of the line
    pub fn matched(&self) -> &str {
        &self.line[self.start..self.end]
    }
}

/// A directory queued for the directory-worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Full path to the directory
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: usize,
}

impl WorkUnit {
    /// Create a new work unit
    pub fn new(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self {
            path: path.into(),
            depth,
        }
    }
}

/// Outcome of processing one item, returned by every step callback
///
/// `SkipItem` and `SkipAll` are traversal control, not failures: they are
/// never logged or surfaced as errors.
#[derive(Debug)]
pub enum Control {
    /// Keep going (descend into a directory, keep scanning a file)
    Continue,

    /// Prune this subtree or abandon this file/line, keep walking siblings
    SkipItem,

    /// Stop the current walk or scan cleanly
    SkipAll,

    /// Abort the current walk or scan and surface the cause
    Failure(ScanError),
}
