//! Local filesystem source backed by `std::fs`

use crate::error::{ScanError, ScanResult};
use crate::source::{EntrySource, Listing};
use crate::types::Entry;
use chrono::{DateTime, Utc};
use std::fs::{self, File, Metadata, ReadDir};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Reads entries from the local filesystem
///
/// The root is resolved following symlinks; children are described by their
/// own metadata, so a symlinked child is reported as a non-directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl FsSource {
    pub fn new() -> Self {
        Self
    }
}

fn entry_from_metadata(path: PathBuf, depth: usize, metadata: &Metadata) -> Entry {
    Entry {
        path,
        depth,
        is_dir: metadata.is_dir(),
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    }
}

impl EntrySource for FsSource {
    fn resolve_root(&self, path: &Path, depth: usize) -> ScanResult<Entry> {
        let metadata = fs::metadata(path).map_err(|source| ScanError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(entry_from_metadata(path.to_path_buf(), depth, &metadata))
    }

    fn list_children(&self, dir: &Entry) -> ScanResult<Listing<'_>> {
        let read_dir = fs::read_dir(&dir.path).map_err(|source| ScanError::ReadDir {
            path: dir.path.clone(),
            source,
        })?;

        Ok(Box::new(FsListing {
            parent: dir.path.clone(),
            depth: dir.depth + 1,
            inner: Some(read_dir),
        }))
    }

    fn open_file(&self, file: &Entry) -> ScanResult<Box<dyn Read + '_>> {
        let handle = File::open(&file.path).map_err(|source| ScanError::Open {
            path: file.path.clone(),
            source,
        })?;
        Ok(Box::new(handle))
    }
}

/// Cursor over one `read_dir` call
///
/// A child whose metadata cannot be read (typically removed since `readdir`
/// returned it) is yielded as an error and the cursor moves on. A failure of
/// `read_dir` itself ends the listing.
struct FsListing {
    parent: PathBuf,
    depth: usize,
    inner: Option<ReadDir>,
}

impl Iterator for FsListing {
    type Item = ScanResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.as_mut()?.next();

        match next {
            None => {
                self.inner = None;
                None
            }
            Some(Ok(dir_entry)) => {
                let path = dir_entry.path();
                match dir_entry.metadata() {
                    Ok(metadata) => Some(Ok(entry_from_metadata(path, self.depth, &metadata))),
                    Err(source) => Some(Err(ScanError::Stat { path, source })),
                }
            }
            Some(Err(source)) => {
                self.inner = None;
                Some(Err(ScanError::ReadDir {
                    path: self.parent.clone(),
                    source,
                }))
            }
        }
    }
}
