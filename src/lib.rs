//! mgrep - recursive, concurrent content search
//!
//! Walks a directory tree and reports every line matching a regular
//! expression, using a fixed budget of worker threads and bounded memory,
//! with cooperative cancellation.
//!
//! # Features
//!
//! - **Two-Stage Worker Pool**: one pool lists directories, another scans
//!   files, connected by bounded channels so discovery never outruns
//!   scanning.
//!
//! - **Self-Feeding Directory Pool**: workers hand subdirectories to idle
//!   peers without blocking, and descend into them themselves when every
//!   peer is busy, so a saturated pool cannot deadlock.
//!
//! - **Lazy Listings**: directories are read one entry at a time; huge or
//!   half-readable directories never need to be buffered.
//!
//! - **Cancellation**: a shared token unblocks every stage; matches already
//!   found are still delivered.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       EntrySource                               │
//! │               (FsSource / MemorySource)                         │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ lazy listings, readers
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Directory Workers (D)                         │
//! │  ┌─────────┐  ┌─────────┐         ┌─────────┐                   │
//! │  │ walk    │  │ walk    │  ...    │ walk    │◀── resubmit       │
//! │  └────┬────┘  └────┬────┘         └────┬────┘    (send_to_any)  │
//! │       └────────────┼───────────────────┘                        │
//! │                    ▼  fan-in                                    │
//! │            ┌──────────────────────────┐                         │
//! │            │     File Channel         │                         │
//! │            │  (crossbeam bounded)     │                         │
//! │            └────────────┬─────────────┘                         │
//! │                         ▼                                       │
//! │                File Workers (F)                                 │
//! │                  scan_file ──▶ SkipPolicy                       │
//! │                         │  fan-in                               │
//! └─────────────────────────┼───────────────────────────────────────┘
//!                           ▼
//!                    ┌──────────────────┐
//!                    │  Sink (caller)   │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Case-insensitive search of the current directory
//! mgrep 'todo' .
//!
//! # Rust sources only, 16 workers, with a summary
//! mgrep -c 16 --include '\.rs$' --stats 'unsafe' ~/src
//! ```

pub mod concurrency;
pub mod config;
pub mod error;
pub mod filter;
pub mod searcher;
pub mod sink;
pub mod source;
pub mod summary;
pub mod types;
pub mod walker;

pub use concurrency::{Deadline, Done};
pub use config::{CliArgs, SearchConfig};
pub use error::{ConfigError, Result, ScanError, SearchError, WorkerError};
pub use filter::{ConfigurableFilter, NoopFilter, OptionsFilter, SkipPolicy};
pub use searcher::{ConcurrentSearcher, SearchStats, Searcher, SerialSearcher};
pub use sink::{LogSink, NoopSink, Sink, WriterSink};
pub use source::{EntrySource, FsSource, MemorySource, TreeShape};
pub use types::{Control, Entry, Match, WorkUnit};
pub use walker::Walker;
