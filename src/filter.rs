//! Skip policies - decide what the search prunes, ignores, or drops
//!
//! A policy answers three pure questions: should this directory be pruned,
//! should this file be left unscanned, should this match be dropped. The
//! searchers turn the answers into `Control::SkipItem` at the right stage.

use crate::types::{Entry, Match};
use regex::Regex;

/// Pure skip predicates consulted at every stage boundary
pub trait SkipPolicy: Send + Sync {
    /// Prune this directory: none of its children are listed
    fn skip_directory(&self, dir: &Entry) -> bool;

    /// Do not read this file
    fn skip_file(&self, file: &Entry) -> bool;

    /// Do not report this match
    fn skip_match(&self, found: &Match) -> bool;
}

impl<P: SkipPolicy + ?Sized> SkipPolicy for Box<P> {
    fn skip_directory(&self, dir: &Entry) -> bool {
        (**self).skip_directory(dir)
    }

    fn skip_file(&self, file: &Entry) -> bool {
        (**self).skip_file(file)
    }

    fn skip_match(&self, found: &Match) -> bool {
        (**self).skip_match(found)
    }
}

/// Skips nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFilter;

impl SkipPolicy for NoopFilter {
    fn skip_directory(&self, _dir: &Entry) -> bool {
        false
    }

    fn skip_file(&self, _file: &Entry) -> bool {
        false
    }

    fn skip_match(&self, _found: &Match) -> bool {
        false
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Policy assembled from three closures
pub struct ConfigurableFilter {
    skip_directory: Predicate<Entry>,
    skip_file: Predicate<Entry>,
    skip_match: Predicate<Match>,
}

impl ConfigurableFilter {
    pub fn new<D, F, M>(skip_directory: D, skip_file: F, skip_match: M) -> Self
    where
        D: Fn(&Entry) -> bool + Send + Sync + 'static,
        F: Fn(&Entry) -> bool + Send + Sync + 'static,
        M: Fn(&Match) -> bool + Send + Sync + 'static,
    {
        Self {
            skip_directory: Box::new(skip_directory),
            skip_file: Box::new(skip_file),
            skip_match: Box::new(skip_match),
        }
    }
}

impl SkipPolicy for ConfigurableFilter {
    fn skip_directory(&self, dir: &Entry) -> bool {
        (self.skip_directory)(dir)
    }

    fn skip_file(&self, file: &Entry) -> bool {
        (self.skip_file)(file)
    }

    fn skip_match(&self, found: &Match) -> bool {
        (self.skip_match)(found)
    }
}

/// Rules for the command-line search
#[derive(Debug, Clone)]
pub struct OptionsFilter {
    /// Directories deeper than this are pruned
    pub max_depth: usize,

    /// Files larger than this (bytes) are not scanned
    pub max_size: u64,

    /// Matches on lines longer than this (characters) are dropped
    pub max_length: usize,

    /// Only files whose path matches are scanned
    pub include: Option<Regex>,

    /// Files whose path matches any of these are not scanned
    pub exclude: Vec<Regex>,
}

impl OptionsFilter {
    /// Check if a path is rejected by the include/exclude rules
    pub fn is_excluded(&self, path: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return true;
            }
        }
        self.exclude.iter().any(|re| re.is_match(path))
    }
}

impl SkipPolicy for OptionsFilter {
    fn skip_directory(&self, dir: &Entry) -> bool {
        dir.depth > self.max_depth
    }

    fn skip_file(&self, file: &Entry) -> bool {
        // Empty files cannot match
        if file.size == 0 || file.size > self.max_size {
            return true;
        }
        self.is_excluded(&file.path.to_string_lossy())
    }

    fn skip_match(&self, found: &Match) -> bool {
        found.line.chars().count() > self.max_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> OptionsFilter {
        OptionsFilter {
            max_depth: 2,
            max_size: 100,
            max_length: 10,
            include: Some(Regex::new(r"\.txt$").unwrap()),
            exclude: vec![Regex::new(r"/target/").unwrap()],
        }
    }

    fn found(line: &str) -> Match {
        Match {
            path: "a.txt".into(),
            line_number: 1,
            start: 0,
            end: 1,
            line: line.into(),
        }
    }

    #[test]
    fn test_noop_filter() {
        let filter = NoopFilter;
        assert!(!filter.skip_directory(&Entry::dir("a", 1000)));
        assert!(!filter.skip_file(&Entry::file("a", 0, 0)));
        assert!(!filter.skip_match(&found("x")));
    }

    #[test]
    fn test_configurable_filter() {
        let filter = ConfigurableFilter::new(
            |dir| dir.depth > 1,
            |file| file.size > 5,
            |m| m.line_number > 3,
        );
        assert!(!filter.skip_directory(&Entry::dir("a", 1)));
        assert!(filter.skip_directory(&Entry::dir("a", 2)));
        assert!(filter.skip_file(&Entry::file("a", 0, 6)));
        assert!(!filter.skip_match(&found("x")));
    }

    #[test]
    fn test_options_depth() {
        let filter = options();
        assert!(!filter.skip_directory(&Entry::dir("root", 0)));
        assert!(!filter.skip_directory(&Entry::dir("root/a/b", 2)));
        assert!(filter.skip_directory(&Entry::dir("root/a/b/c", 3)));
    }

    #[test]
    fn test_options_file_rules() {
        let filter = options();
        assert!(!filter.skip_file(&Entry::file("src/a.txt", 1, 10)));
        assert!(filter.skip_file(&Entry::file("src/empty.txt", 1, 0)));
        assert!(filter.skip_file(&Entry::file("src/big.txt", 1, 101)));
        assert!(filter.skip_file(&Entry::file("src/a.rs", 1, 10)));
        assert!(filter.skip_file(&Entry::file("x/target/a.txt", 2, 10)));
    }

    #[test]
    fn test_options_line_length_counts_chars() {
        let filter = options();
        assert!(!filter.skip_match(&found("0123456789")));
        assert!(filter.skip_match(&found("0123456789a")));
        // 10 characters, 20 bytes
        assert!(!filter.skip_match(&found("éééééééééé")));
    }
}
