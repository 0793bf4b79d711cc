//! Traversal engine and work accounting
//!
//! [`Walker`] does the per-unit work: a depth-first walk below one path and a
//! line scan of one file, each driven by a step callback returning
//! [`Control`](crate::types::Control). [`PendingWork`] tracks when a pool of
//! walkers that feed themselves has run out of work.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │          Walker          │
//!                    │  walk(root, depth, step) │
//!                    │  scan_file(entry, step)  │
//!                    └────────────┬─────────────┘
//!                                 │ lazy listings, line reader
//!                    ┌────────────▼─────────────┐
//!                    │       EntrySource        │
//!                    │  FsSource / MemorySource │
//!                    └──────────────────────────┘
//! ```

pub mod queue;
pub mod traversal;

pub use queue::{PendingWork, WorkGuard};
pub use traversal::{Walker, DEFAULT_MAX_LINE_BYTES};
