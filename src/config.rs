//! Configuration types for mgrep
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Construction of the searcher the configuration asks for

use crate::error::ConfigError;
use crate::filter::{NoopFilter, OptionsFilter, SkipPolicy};
use crate::searcher::{ConcurrentSearcher, Searcher, SerialSearcher};
use crate::source::EntrySource;
use crate::walker::Walker;
use clap::Parser;
use regex::{Regex, RegexBuilder};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Maximum channel capacity between stages
const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Recursive regular-expression search through file contents
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mgrep",
    version,
    about = "Recursive regular-expression search through file contents",
    long_about = "Walks a directory tree and prints every line matching PATTERN.\n\n\
                  Directories are listed by one pool of workers and files are scanned by another.\n\
                  Output lines have the form path[line,column]:text.",
    after_help = "EXAMPLES:\n    \
        mgrep 'fn main' src\n    \
        mgrep -c 16 --include '\\.rs$' --exclude '/target/' TODO .\n    \
        mgrep --match-case --max-depth 2 Error /var/log\n    \
        mgrep -c 0 needle haystack  # serial search"
)]
pub struct CliArgs {
    /// Regular expression to search for
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    /// Directory or file to search
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Skip files larger than this many bytes
    #[arg(long, default_value = "1048576", value_name = "BYTES")]
    pub max_size: u64,

    /// Skip matches on lines longer than this many characters
    #[arg(long, default_value = "1024", value_name = "CHARS")]
    pub max_length: usize,

    /// Only scan files whose path matches this pattern
    #[arg(long, value_name = "PATTERN")]
    pub include: Option<String>,

    /// Skip files whose path matches pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Case-sensitive matching
    #[arg(long)]
    pub match_case: bool,

    /// Do not descend into subdirectories
    #[arg(long)]
    pub no_subdirs: bool,

    /// Number of worker threads (0 for a serial search)
    #[arg(
        short = 'c',
        long,
        default_value_t = default_concurrency(),
        value_name = "NUM"
    )]
    pub concurrency: usize,

    /// Capacity of the channels between stages
    #[arg(long, default_value = "1024", value_name = "NUM")]
    pub buf_size: usize,

    /// Maximum directory depth
    #[arg(long, default_value = "100", value_name = "NUM")]
    pub max_depth: usize,

    /// Disable every skip rule
    #[arg(long)]
    pub no_skip: bool,

    /// Stop the search after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not highlight matches
    #[arg(long)]
    pub no_color: bool,

    /// Print a summary to stderr when done
    #[arg(long)]
    pub stats: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Root of the search
    pub root: PathBuf,

    /// Compiled search pattern
    pub pattern: Regex,

    /// Depth, size, path and line-length rules
    pub options: OptionsFilter,

    /// Ignore `options` entirely
    pub no_skip: bool,

    /// Total worker threads; 0 selects the serial searcher
    pub concurrency: usize,

    /// Channel capacity between stages
    pub buffer_size: usize,

    /// Caller-side deadline
    pub timeout: Option<Duration>,

    /// Highlight matches in the output
    pub highlight: bool,

    /// Print a summary when done
    pub show_stats: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl SearchConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate worker count
        if args.concurrency > MAX_WORKERS {
            return Err(ConfigError::InvalidConcurrency {
                count: args.concurrency,
                max: MAX_WORKERS,
            });
        }

        // Validate channel capacity
        if args.buf_size > MAX_BUFFER_SIZE {
            return Err(ConfigError::InvalidBufferSize {
                size: args.buf_size,
                max: MAX_BUFFER_SIZE,
            });
        }

        if args.max_size == 0 {
            return Err(ConfigError::InvalidLimit {
                name: "max-size",
                value: 0,
            });
        }
        if args.max_length == 0 {
            return Err(ConfigError::InvalidLimit {
                name: "max-length",
                value: 0,
            });
        }

        let pattern = RegexBuilder::new(&args.pattern)
            .case_insensitive(!args.match_case)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: args.pattern.clone(),
                reason: e.to_string(),
            })?;

        let include = args
            .include
            .as_deref()
            .map(|p| compile_path_pattern("include", p))
            .transpose()?;

        // Compile exclude patterns
        let exclude = args
            .exclude_patterns
            .iter()
            .map(|p| compile_path_pattern("exclude", p))
            .collect::<Result<Vec<_>, _>>()?;

        let max_depth = if args.no_subdirs { 0 } else { args.max_depth };

        Ok(Self {
            root: args.path,
            pattern,
            options: OptionsFilter {
                max_depth,
                max_size: args.max_size,
                max_length: args.max_length,
                include,
                exclude,
            },
            no_skip: args.no_skip,
            concurrency: args.concurrency,
            buffer_size: args.buf_size,
            timeout: args.timeout.map(Duration::from_secs),
            highlight: !args.no_color,
            show_stats: args.stats,
            verbose: args.verbose,
        })
    }

    /// Skip policy for this configuration
    pub fn policy(&self) -> Box<dyn SkipPolicy> {
        if self.no_skip {
            Box::new(NoopFilter)
        } else {
            Box::new(self.options.clone())
        }
    }

    /// Build the searcher over `source`: serial for zero concurrency,
    /// the worker-pool searcher otherwise
    pub fn build_searcher<S>(&self, source: S) -> Box<dyn Searcher>
    where
        S: EntrySource + 'static,
    {
        let walker = Walker::new(source);
        if self.concurrency == 0 {
            Box::new(SerialSearcher::new(walker, self.policy()))
        } else {
            Box::new(
                ConcurrentSearcher::new(walker, self.policy(), self.concurrency)
                    .with_capacity(self.buffer_size),
            )
        }
    }
}

fn compile_path_pattern(kind: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPathPattern {
        kind,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<SearchConfig, ConfigError> {
        let mut argv = vec!["mgrep"];
        argv.extend_from_slice(args);
        SearchConfig::from_args(CliArgs::parse_from(argv))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["needle"]).unwrap();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.options.max_size, 1024 * 1024);
        assert_eq!(config.options.max_length, 1024);
        assert_eq!(config.options.max_depth, 100);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.concurrency, num_cpus::get());
        assert!(config.highlight);
        assert!(config.timeout.is_none());
        assert!(config.pattern.is_match("NEEDLE"));
    }

    #[test]
    fn test_match_case() {
        let config = parse(&["--match-case", "needle"]).unwrap();
        assert!(!config.pattern.is_match("NEEDLE"));
        assert!(config.pattern.is_match("needle"));
    }

    #[test]
    fn test_no_subdirs_sets_depth() {
        let config = parse(&["--no-subdirs", "--max-depth", "7", "x", "/tmp"]).unwrap();
        assert_eq!(config.options.max_depth, 0);
        assert_eq!(config.root, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_include_exclude() {
        let config = parse(&[
            "--include",
            r"\.rs$",
            "--exclude",
            "/target/",
            "--exclude",
            "/vendor/",
            "x",
        ])
        .unwrap();
        assert_eq!(config.options.exclude.len(), 2);
        assert!(config.options.is_excluded("a/target/b.rs"));
        assert!(config.options.is_excluded("a/b.txt"));
        assert!(!config.options.is_excluded("a/b.rs"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse(&["-c", "1000", "x"]),
            Err(ConfigError::InvalidConcurrency { count: 1000, .. })
        ));
        assert!(matches!(
            parse(&["--buf-size", "2000000", "x"]),
            Err(ConfigError::InvalidBufferSize { .. })
        ));
        assert!(matches!(
            parse(&["--max-size", "0", "x"]),
            Err(ConfigError::InvalidLimit { name: "max-size", .. })
        ));
        assert!(matches!(
            parse(&["("]),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            parse(&["--exclude", "[", "x"]),
            Err(ConfigError::InvalidPathPattern { kind: "exclude", .. })
        ));
    }

    #[test]
    fn test_policy_selection() {
        let config = parse(&["--no-skip", "--max-depth", "0", "x"]).unwrap();
        let policy = config.policy();
        assert!(!policy.skip_directory(&crate::types::Entry::dir("a/b", 5)));

        let config = parse(&["--max-depth", "0", "x"]).unwrap();
        assert!(config.policy().skip_directory(&crate::types::Entry::dir("a/b", 1)));
    }

    #[test]
    fn test_timeout() {
        let config = parse(&["--timeout", "5", "x"]).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
