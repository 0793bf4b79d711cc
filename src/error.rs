//! Error types for mgrep
//!
//! This module defines the error hierarchy that covers:
//! - Per-unit scan failures (one file or directory)
//! - Configuration and CLI errors
//! - Worker thread errors
//!
//! Per-unit failures are contained by the stage that detected them. Only a
//! failure to resolve the search root reaches the caller of a search.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a search
#[derive(Error, Debug)]
pub enum SearchError {
    /// The root path could not be resolved, the walk never started
    #[error("Failed to resolve search root: {0}")]
    Root(#[source] ScanError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Failure to read or scan a single file or directory
#[derive(Error, Debug)]
pub enum ScanError {
    /// Metadata read failed
    #[error("Failed to stat '{path}': {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing failed
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be opened
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File read failed part way through
    #[error("Failed to read '{path}' at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    /// Line is not valid UTF-8
    #[error("Line {line} of '{path}' is not valid UTF-8")]
    Decode { path: PathBuf, line: usize },

    /// Line is longer than the reader buffer allows
    #[error("Line {line} of '{path}' exceeds {limit} bytes")]
    LineTooLong {
        path: PathBuf,
        line: usize,
        limit: usize,
    },

    /// Path not found
    #[error("Path not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Entry exists but cannot be used for the requested operation
    #[error("Cannot read '{path}': {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

impl ScanError {
    /// Path of the file or directory that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            ScanError::Stat { path, .. }
            | ScanError::ReadDir { path, .. }
            | ScanError::Open { path, .. }
            | ScanError::Read { path, .. }
            | ScanError::Decode { path, .. }
            | ScanError::LineTooLong { path, .. }
            | ScanError::NotFound { path }
            | ScanError::Unavailable { path, .. } => path,
        }
    }

    /// Check if the entry vanished (common on filesystems that change during a search)
    pub fn is_not_found(&self) -> bool {
        match self {
            ScanError::NotFound { .. } => true,
            ScanError::Stat { source, .. }
            | ScanError::ReadDir { source, .. }
            | ScanError::Open { source, .. }
            | ScanError::Read { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if a directory listing itself broke, rather than one of its children
    pub fn is_listing_failure(&self) -> bool {
        matches!(self, ScanError::ReadDir { .. })
    }

    /// Check if the failure is about file content rather than file access
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            ScanError::Decode { .. } | ScanError::LineTooLong { .. }
        )
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid concurrency {count}: must be at most {max}")]
    InvalidConcurrency { count: usize, max: usize },

    /// Invalid channel buffer size
    #[error("Invalid buffer size {size}: must be at most {max}")]
    InvalidBufferSize { size: usize, max: usize },

    /// Zero or otherwise unusable limit
    #[error("Invalid {name} {value}: must be at least 1")]
    InvalidLimit { name: &'static str, value: u64 },

    /// Search pattern does not compile
    #[error("Invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Include or exclude pattern does not compile
    #[error("Invalid {kind} pattern '{pattern}': {reason}")]
    InvalidPathPattern {
        kind: &'static str,
        pattern: String,
        reason: String,
    },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread could not be spawned
    #[error("Failed to spawn worker '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    /// Worker panicked
    #[error("Worker '{name}' panicked")]
    Panicked { name: String },
}

/// Result type alias for SearchError
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for ScanError
pub type ScanResult<T> = std::result::Result<T, ScanError>;
