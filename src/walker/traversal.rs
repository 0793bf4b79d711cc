//! Traversal engine - depth-first walk and line scanning
//!
//! Both operations are synchronous and reentrant. All mutable state they
//! touch (the stack of open listings, the line reader) belongs to one call,
//! so independent worker threads can walk and scan through the same
//! `Walker` at the same time.

use crate::error::{ScanError, ScanResult};
use crate::source::{EntrySource, Listing};
use crate::types::{Control, Entry, Match};
use regex::Regex;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

/// Longest line the scanner will buffer (1 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Walks entry trees and scans files from an [`EntrySource`]
#[derive(Debug, Clone)]
pub struct Walker<S> {
    source: S,
    max_line_bytes: usize,
}

impl<S: EntrySource> Walker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Set the longest line `scan_file` accepts before failing the file
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    /// Get the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Walk the tree below `root` depth-first
    ///
    /// `step` is invoked for the root, then for every entry reached. For a
    /// directory, `Continue` descends into it and `SkipItem` prunes it. For a
    /// file, `Continue` and `SkipItem` both move on to the next sibling.
    /// `SkipAll` ends the walk successfully; `Failure` ends it with the cause.
    ///
    /// A child that cannot be read is passed to `on_error` and its siblings
    /// are still visited. A listing that breaks below the root is passed to
    /// `on_error` too, and the walk carries on with the broken directory's
    /// siblings. Failures to resolve or list the root itself are returned.
    pub fn walk<F, E>(&self, root: &Path, depth: usize, step: F, on_error: E) -> ScanResult<()>
    where
        F: FnMut(&Entry) -> Control,
        E: FnMut(ScanError),
    {
        let root = self.source.resolve_root(root, depth)?;
        self.walk_entry(&root, step, on_error)
    }

    /// Walk below an entry that is already resolved
    pub fn walk_entry<F, E>(&self, root: &Entry, mut step: F, mut on_error: E) -> ScanResult<()>
    where
        F: FnMut(&Entry) -> Control,
        E: FnMut(ScanError),
    {
        match step(root) {
            Control::Continue if root.is_dir => {}
            Control::Failure(err) => return Err(err),
            _ => return Ok(()),
        }

        let mut stack: Vec<Listing<'_>> = vec![self.source.list_children(root)?];

        loop {
            let next = match stack.last_mut() {
                Some(listing) => listing.next(),
                None => break,
            };

            match next {
                None => {
                    stack.pop();
                }
                // A broken listing ends after its error; a failed child does not
                Some(Err(err)) if err.is_listing_failure() && stack.len() == 1 => {
                    return Err(err);
                }
                Some(Err(err)) => on_error(err),
                Some(Ok(entry)) => match step(&entry) {
                    Control::Continue if entry.is_dir => match self.source.list_children(&entry) {
                        Ok(children) => stack.push(children),
                        Err(err) => on_error(err),
                    },
                    Control::Continue | Control::SkipItem => {}
                    Control::SkipAll => return Ok(()),
                    Control::Failure(err) => return Err(err),
                },
            }
        }

        Ok(())
    }

    /// Scan a file line by line, invoking `step` for the first match on each line
    ///
    /// `SkipItem` moves on to the next line, `SkipAll` stops the scan
    /// successfully, `Failure` stops it with the cause. A line that is not
    /// valid UTF-8, or longer than the line limit, fails the file.
    pub fn scan_file<F>(&self, file: &Entry, pattern: &Regex, mut step: F) -> ScanResult<()>
    where
        F: FnMut(Match) -> Control,
    {
        let reader = self.source.open_file(file)?;
        let mut lines = LineReader::new(reader, self.max_line_bytes);
        let mut line_number = 0usize;

        loop {
            line_number += 1;
            let bytes = match lines.next_line() {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Ok(()),
                Err(LineError::TooLong) => {
                    return Err(ScanError::LineTooLong {
                        path: file.path.clone(),
                        line: line_number,
                        limit: self.max_line_bytes,
                    })
                }
                Err(LineError::Io(source)) => {
                    return Err(ScanError::Read {
                        path: file.path.clone(),
                        line: line_number,
                        source,
                    })
                }
            };

            let text = std::str::from_utf8(bytes).map_err(|_| ScanError::Decode {
                path: file.path.clone(),
                line: line_number,
            })?;

            let Some(found) = pattern.find(text) else {
                continue;
            };

            let matched = Match {
                path: file.path.clone(),
                line_number,
                start: found.start(),
                end: found.end(),
                line: text.to_string(),
            };

            match step(matched) {
                Control::Continue | Control::SkipItem => {}
                Control::SkipAll => return Ok(()),
                Control::Failure(err) => return Err(err),
            }
        }
    }
}

enum LineError {
    TooLong,
    Io(std::io::Error),
}

/// Splits a byte stream on `\n`, dropping the terminator and a trailing `\r`
struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max: usize,
}

impl<R: Read> LineReader<R> {
    fn new(reader: R, max: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max,
        }
    }

    fn next_line(&mut self) -> Result<Option<&[u8]>, LineError> {
        self.buf.clear();

        // Allow the terminator on top of a line of exactly `max` bytes
        let limit = self.max as u64 + 2;
        let read = loop {
            match (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(LineError::Io(e)),
            }
        };

        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        if self.buf.len() > self.max {
            return Err(LineError::TooLong);
        }

        Ok(Some(self.buf.as_slice()))
    }
}
