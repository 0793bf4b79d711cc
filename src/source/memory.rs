//! In-memory entry source
//!
//! Holds a tree of directories and text files keyed by path, with optional
//! per-path failures. Used to drive the engine deterministically in tests and
//! benchmarks, including failure cases a real filesystem makes awkward to set
//! up (a child that vanishes under its listing, a directory whose listing
//! breaks half way, a file that cannot be read).

use crate::error::{ScanError, ScanResult};
use crate::source::{EntrySource, Listing};
use crate::types::Entry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::iter;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// One node of the in-memory tree
#[derive(Debug, Clone, Default)]
pub struct MemoryNode {
    /// File content; `None` marks a directory
    pub content: Option<String>,

    /// Failure reported when this node is resolved, listed, reached by a
    /// listing, or opened
    pub error: Option<String>,

    /// Listing of this directory breaks after this many children
    pub broken_listing: Option<(usize, String)>,

    /// Modification time reported for the node
    pub modified: Option<DateTime<Utc>>,
}

impl MemoryNode {
    fn entry(&self, path: &Path, depth: usize) -> Entry {
        Entry {
            path: path.to_path_buf(),
            depth,
            is_dir: self.content.is_none(),
            size: self.content.as_ref().map(|c| c.len() as u64).unwrap_or(0),
            modified: self.modified,
        }
    }

    fn check(&self, path: &Path) -> ScanResult<()> {
        match &self.error {
            Some(reason) => Err(ScanError::Unavailable {
                path: path.to_path_buf(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Entry source backed by an ordered map of paths
///
/// Children are listed in path order. A failing child is yielded as an
/// error in its place and its siblings follow, like an entry removed between
/// `readdir` and `stat`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    nodes: BTreeMap<PathBuf, MemoryNode>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.insert_dir(path);
        self
    }

    /// Add a text file
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert_file(path, content);
        self
    }

    /// Make an existing node fail, or add a failing directory
    pub fn with_error(mut self, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        self.nodes.entry(path.into()).or_default().error = Some(reason.into());
        self
    }

    /// Make the listing of a directory fail after `after` children
    pub fn with_broken_listing(
        mut self,
        path: impl Into<PathBuf>,
        after: usize,
        reason: impl Into<String>,
    ) -> Self {
        self.nodes.entry(path.into()).or_default().broken_listing = Some((after, reason.into()));
        self
    }

    pub fn insert_dir(&mut self, path: impl Into<PathBuf>) {
        self.nodes.insert(path.into(), MemoryNode::default());
    }

    pub fn insert_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.nodes.insert(
            path.into(),
            MemoryNode {
                content: Some(content.into()),
                ..MemoryNode::default()
            },
        );
    }

    /// Number of nodes, directories included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a regular tree below `root`
    pub fn generate(root: impl Into<PathBuf>, shape: &TreeShape) -> Self {
        let root = root.into();
        let mut source = Self::new();
        source.insert_dir(root.clone());
        let mut counter = 0usize;
        source.generate_level(&root, 0, shape, &mut counter);
        source
    }

    fn generate_level(&mut self, dir: &Path, depth: usize, shape: &TreeShape, counter: &mut usize) {
        for i in 0..shape.files {
            let lines: Vec<&str> = (0..shape.lines)
                .map(|line| {
                    *counter += 1;
                    TEXT_LINES[(*counter * 7 + line) % TEXT_LINES.len()]
                })
                .collect();
            self.insert_file(dir.join(format!("file{i}.txt")), lines.join("\n"));
        }

        if depth >= shape.depth {
            return;
        }

        for i in 0..shape.dirs {
            let child = dir.join(format!("dir{i}"));
            self.insert_dir(child.clone());
            self.generate_level(&child, depth + 1, shape, counter);
        }
    }
}

/// Shape of a generated tree
#[derive(Debug, Clone, Copy)]
pub struct TreeShape {
    /// Levels of subdirectories below the root
    pub depth: usize,

    /// Subdirectories per directory
    pub dirs: usize,

    /// Files per directory
    pub files: usize,

    /// Lines per file
    pub lines: usize,
}

const TEXT_LINES: &[&str] = &[
    "the quick brown fox jumps over the lazy dog",
    "pack my box with five dozen liquor jugs",
    "sphinx of black quartz, judge my vow",
    "how vexingly quick daft zebras jump",
    "a wizard's job is to vex chumps quickly in fog",
    "waltz, bad nymph, for quick jigs vex",
    "lorem ipsum dolor sit amet and consectetur",
    "jackdaws love my big sphinx of quartz",
];

impl EntrySource for MemorySource {
    fn resolve_root(&self, path: &Path, depth: usize) -> ScanResult<Entry> {
        let node = self.nodes.get(path).ok_or_else(|| ScanError::NotFound {
            path: path.to_path_buf(),
        })?;
        node.check(path)?;
        Ok(node.entry(path, depth))
    }

    fn list_children(&self, dir: &Entry) -> ScanResult<Listing<'_>> {
        let node = self.nodes.get(&dir.path).ok_or_else(|| ScanError::NotFound {
            path: dir.path.clone(),
        })?;
        node.check(&dir.path)?;
        if node.content.is_some() {
            return Err(ScanError::Unavailable {
                path: dir.path.clone(),
                reason: "not a directory".into(),
            });
        }

        let parent = dir.path.clone();
        let direct_parent = dir.path.clone();
        let depth = dir.depth + 1;

        let children = self
            .nodes
            .range::<Path, _>((Bound::Excluded(dir.path.as_path()), Bound::Unbounded))
            .take_while(move |(path, _)| path.starts_with(&parent))
            .filter(move |(path, _)| path.parent() == Some(direct_parent.as_path()))
            .map(move |(path, node)| node.check(path).map(|()| node.entry(path, depth)));

        match &node.broken_listing {
            Some((after, reason)) => {
                let broken = ScanError::ReadDir {
                    path: dir.path.clone(),
                    source: io::Error::new(io::ErrorKind::Other, reason.clone()),
                };
                Ok(Box::new(children.take(*after).chain(iter::once(Err(broken)))))
            }
            None => Ok(Box::new(children)),
        }
    }

    fn open_file(&self, file: &Entry) -> ScanResult<Box<dyn Read + '_>> {
        let node = self.nodes.get(&file.path).ok_or_else(|| ScanError::NotFound {
            path: file.path.clone(),
        })?;
        node.check(&file.path)?;
        match &node.content {
            Some(content) => Ok(Box::new(Cursor::new(content.as_bytes()))),
            None => Err(ScanError::Unavailable {
                path: file.path.clone(),
                reason: "not a file".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemorySource {
        MemorySource::new()
            .with_dir("aaa")
            .with_dir("aaa/bbb")
            .with_file("aaa/bbb/x.txt", "hello\nworld")
            .with_file("aaa/c.txt", "c")
            .with_dir("aaa-z")
    }

    #[test]
    fn test_resolve_root() {
        let source = sample();
        let root = source.resolve_root(Path::new("aaa"), 0).unwrap();
        assert!(root.is_dir);

        let file = source.resolve_root(Path::new("aaa/bbb/x.txt"), 2).unwrap();
        assert!(!file.is_dir);
        assert_eq!(file.size, 11);
        assert_eq!(file.depth, 2);

        assert!(source
            .resolve_root(Path::new("missing"), 0)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_list_direct_children_only() {
        let source = sample();
        let root = source.resolve_root(Path::new("aaa"), 0).unwrap();
        let children: Vec<PathBuf> = source
            .list_children(&root)
            .unwrap()
            .map(|e| e.unwrap().path)
            .collect();
        assert_eq!(
            children,
            vec![PathBuf::from("aaa/bbb"), PathBuf::from("aaa/c.txt")]
        );
    }

    #[test]
    fn test_listing_continues_past_failed_child() {
        let source = MemorySource::new()
            .with_dir("r")
            .with_file("r/a.txt", "a")
            .with_file("r/b.txt", "b")
            .with_file("r/c.txt", "c")
            .with_error("r/b.txt", "device gone");
        let root = source.resolve_root(Path::new("r"), 0).unwrap();

        let items: Vec<ScanResult<Entry>> = source.list_children(&root).unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ScanError::Unavailable { .. })));
        assert!(!items[1].as_ref().unwrap_err().is_listing_failure());
        assert_eq!(items[2].as_ref().unwrap().path, PathBuf::from("r/c.txt"));
    }

    #[test]
    fn test_broken_listing_ends_with_error() {
        let source = MemorySource::new()
            .with_dir("r")
            .with_file("r/a.txt", "a")
            .with_file("r/b.txt", "b")
            .with_file("r/c.txt", "c")
            .with_broken_listing("r", 1, "I/O error");
        let root = source.resolve_root(Path::new("r"), 0).unwrap();

        let items: Vec<ScanResult<Entry>> = source.list_children(&root).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().path, PathBuf::from("r/a.txt"));
        let err = items[1].as_ref().unwrap_err();
        assert!(err.is_listing_failure());
        assert_eq!(err.path(), Path::new("r"));
    }

    #[test]
    fn test_generate() {
        let shape = TreeShape {
            depth: 2,
            dirs: 2,
            files: 3,
            lines: 4,
        };
        let source = MemorySource::generate("root", &shape);
        // root + 2 dirs + 4 dirs, each of the 7 holding 3 files
        assert_eq!(source.len(), 7 + 21);
        let root = source.resolve_root(Path::new("root"), 0).unwrap();
        let children: Vec<Entry> = source
            .list_children(&root)
            .unwrap()
            .collect::<ScanResult<Vec<_>>>()
            .unwrap();
        assert_eq!(children.iter().filter(|e| e.is_dir).count(), 2);
        assert_eq!(children.iter().filter(|e| !e.is_dir).count(), 3);
        assert!(source
            .resolve_root(Path::new("root/dir1/dir0/file2.txt"), 0)
            .is_ok());
    }
}
