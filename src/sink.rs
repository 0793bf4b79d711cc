//! Result sinks - consumers of the final match stream
//!
//! A sink is always driven from a single thread (the delivery loop of a
//! search), so implementations need no synchronization of their own.

use crate::types::Match;
use console::Style;
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// Consumer of delivered matches
pub trait Sink {
    /// Take one match; must not block indefinitely
    fn handle(&mut self, found: Match);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn handle(&mut self, found: Match) {
        (**self).handle(found)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn handle(&mut self, found: Match) {
        (**self).handle(found)
    }
}

/// Collects every match
impl Sink for Vec<Match> {
    fn handle(&mut self, found: Match) {
        self.push(found);
    }
}

/// Discards every match
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn handle(&mut self, _found: Match) {}
}

/// Logs every match through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn handle(&mut self, found: Match) {
        info!(
            path = %found.path.display(),
            line = found.line_number,
            column = found.start + 1,
            text = %found.line,
            "Match"
        );
    }
}

/// Writes `path[line,column]:text` lines, optionally highlighting the match
pub struct WriterSink<W: Write> {
    writer: W,
    highlight: Option<Style>,
    written: u64,
    failed: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            highlight: None,
            written: 0,
            failed: false,
        }
    }

    /// Highlight the matched span in bold bright yellow
    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.highlight = enabled.then(|| Style::new().yellow().bright().bold().force_styling(true));
        self
    }

    /// Matches written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_match(&mut self, found: &Match) -> io::Result<()> {
        let before = &found.line[..found.start];
        let matched = found.matched();
        let after = &found.line[found.end..];

        write!(
            self.writer,
            "{}[{},{}]:{}",
            found.path.display(),
            found.line_number,
            found.start + 1,
            before
        )?;
        match &self.highlight {
            Some(style) => write!(self.writer, "{}", style.apply_to(matched))?,
            None => self.writer.write_all(matched.as_bytes())?,
        }
        writeln!(self.writer, "{}", after)
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn handle(&mut self, found: Match) {
        if self.failed {
            return;
        }
        match self.write_match(&found) {
            Ok(()) => self.written += 1,
            Err(e) => {
                // A closed pipe is the reader going away, not a failure
                if e.kind() == io::ErrorKind::BrokenPipe {
                    debug!("Output closed, discarding further matches");
                } else {
                    warn!(error = %e, "Failed to write match, output disabled");
                }
                self.failed = true;
            }
        }
    }
}
