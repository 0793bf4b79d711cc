//! Entry sources - where the walker gets entries and file content from
//!
//! A source resolves a root path to an [`Entry`], lists the children of a
//! directory lazily, and opens files for reading. Listings are pull-based
//! and finite: they yield entries one at a time, so a huge directory never
//! has to be buffered. A child that cannot be described is yielded as an
//! `Err` in its place and the listing goes on; a directory read that breaks
//! part way yields its [`ScanError::ReadDir`](crate::error::ScanError) last.

pub mod local;
pub mod memory;

pub use local::FsSource;
pub use memory::{MemorySource, TreeShape};

use crate::error::ScanResult;
use crate::types::Entry;
use std::io::Read;
use std::path::Path;

/// Lazy listing of a directory's children
///
/// Per-child failures may appear anywhere. A failure for which
/// [`ScanError::is_listing_failure`](crate::error::ScanError::is_listing_failure)
/// holds is always the last item.
pub type Listing<'a> = Box<dyn Iterator<Item = ScanResult<Entry>> + 'a>;

/// Provides entries and file content to the traversal engine
///
/// Implementations must be safe to call from many worker threads at once;
/// per-call state (listing cursors, readers) is owned by the returned values.
pub trait EntrySource: Send + Sync {
    /// Resolve a root path to its entry, assigning it the given depth
    fn resolve_root(&self, path: &Path, depth: usize) -> ScanResult<Entry>;

    /// List the children of a directory entry, one at a time
    fn list_children(&self, dir: &Entry) -> ScanResult<Listing<'_>>;

    /// Open a file entry for reading
    fn open_file(&self, file: &Entry) -> ScanResult<Box<dyn Read + '_>>;
}

impl<S: EntrySource + ?Sized> EntrySource for &S {
    fn resolve_root(&self, path: &Path, depth: usize) -> ScanResult<Entry> {
        (**self).resolve_root(path, depth)
    }

    fn list_children(&self, dir: &Entry) -> ScanResult<Listing<'_>> {
        (**self).list_children(dir)
    }

    fn open_file(&self, file: &Entry) -> ScanResult<Box<dyn Read + '_>> {
        (**self).open_file(file)
    }
}
