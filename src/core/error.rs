// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for roboindex.
//!
//! Errors fall into two groups:
//! - Per-file errors ([`ReindexError::BackendOpen`], [`ReindexError::PerFileRead`])
//!   are recoverable: the orchestrator skips the file and keeps going.
//! - Everything else aborts the whole operation and nothing is persisted.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::io::metadata::TopicDefinition;

/// A single disagreement between two files about a topic's definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConflict {
    /// Topic name both files claim
    pub topic: String,
    /// File that first defined the topic
    pub canonical_file: String,
    /// File whose definition disagrees
    pub conflicting_file: String,
    /// Definition recorded on first sight
    pub canonical: TopicDefinition,
    /// Definition found in `conflicting_file`
    pub conflicting: TopicDefinition,
}

impl fmt::Display for TopicConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topic '{}': '{}' declares {} but '{}' declares {}",
            self.topic, self.canonical_file, self.canonical, self.conflicting_file, self.conflicting
        )
    }
}

/// A file that was skipped during reindexing, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedFile {
    /// Absolute path of the skipped file
    pub path: PathBuf,
    /// Human-readable failure reason
    pub reason: String,
}

/// Errors that can occur while recovering a bag index.
#[derive(Debug, thiserror::Error)]
pub enum ReindexError {
    /// Bag folder is missing or not a directory
    #[error("Invalid base folder '{}': {reason}", .path.display())]
    InvalidBaseFolder {
        /// Offending path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Discovery found no files with the backend's extension
    #[error("No data files with extension '.{extension}' found in '{}'", .uri.display())]
    NoDataFiles {
        /// Bag directory that was listed
        uri: PathBuf,
        /// Extension that was searched for
        extension: String,
    },

    /// No plugin claims the storage id, or the file could not be opened
    #[error("Failed to open '{}' with storage '{storage_id}': {reason}", .path.display())]
    BackendOpen {
        /// File being opened
        path: PathBuf,
        /// Requested storage plugin
        storage_id: String,
        /// Underlying failure
        reason: String,
    },

    /// File opened but its contents could not be read
    #[error("Failed to read '{}': {reason}", .path.display())]
    PerFileRead {
        /// File being read
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Two or more files disagree on a topic's type or serialization format
    #[error("{} topic definition conflict(s), first: {}", .conflicts.len(), first_conflict(.conflicts))]
    TopicDefinitionConflict {
        /// Every conflict found during aggregation
        conflicts: Vec<TopicConflict>,
    },

    /// The primary file of the bag could not be opened
    #[error("No storage could be initialized for '{}': {reason}", .path.display())]
    StorageUnavailable {
        /// Primary file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// `reindex()` was called before `open()`
    #[error("Bag is not open. Call open() before reindex()")]
    NotOpen,

    /// Operation not allowed in the reindexer's current state
    #[error("Invalid reindexer state: expected {expected}, found {actual}")]
    InvalidState {
        /// Required state
        expected: &'static str,
        /// Current state
        actual: &'static str,
    },

    /// Every file failed; nothing could be recovered
    #[error("Reindex failed: none of the {} file(s) could be processed", .failures.len())]
    ReindexFailed {
        /// Per-file failures, in processing order
        failures: Vec<SkippedFile>,
    },

    /// Cancellation was requested between files
    #[error("Reindex cancelled after {processed} file(s)")]
    Cancelled {
        /// Files finished before cancellation was observed
        processed: usize,
    },

    /// The caller-supplied deadline passed between files
    #[error("Reindex deadline exceeded after {processed} file(s)")]
    DeadlineExceeded {
        /// Files finished before the deadline was observed
        processed: usize,
    },

    /// I/O failure while reading or persisting the index file
    #[error("I/O error ({context}): {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Index file could not be parsed or serialized
    #[error("Malformed index '{}': {reason}", .path.display())]
    IndexFormat {
        /// Index file path
        path: PathBuf,
        /// Parser or serializer message
        reason: String,
    },

    /// Configuration could not be loaded
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong
        reason: String,
    },
}

fn first_conflict(conflicts: &[TopicConflict]) -> String {
    conflicts
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<none>".to_string())
}

impl ReindexError {
    /// Create an invalid base folder error.
    pub fn invalid_base_folder(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        ReindexError::InvalidBaseFolder {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a backend open error.
    pub fn backend_open(
        path: impl AsRef<Path>,
        storage_id: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        ReindexError::BackendOpen {
            path: path.as_ref().to_path_buf(),
            storage_id: storage_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a per-file read error.
    pub fn read(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        ReindexError::PerFileRead {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ReindexError::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an index format error.
    pub fn index_format(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        ReindexError::IndexFormat {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error only affects one file and the run may continue.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            ReindexError::BackendOpen { .. } | ReindexError::PerFileRead { .. }
        )
    }

    /// The file this error is attached to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ReindexError::InvalidBaseFolder { path, .. }
            | ReindexError::BackendOpen { path, .. }
            | ReindexError::PerFileRead { path, .. }
            | ReindexError::StorageUnavailable { path, .. }
            | ReindexError::IndexFormat { path, .. } => Some(path),
            ReindexError::NoDataFiles { uri, .. } => Some(uri),
            _ => None,
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ReindexError::InvalidBaseFolder { path, reason } => vec![
                ("path", path.display().to_string()),
                ("reason", reason.clone()),
            ],
            ReindexError::NoDataFiles { uri, extension } => vec![
                ("uri", uri.display().to_string()),
                ("extension", extension.clone()),
            ],
            ReindexError::BackendOpen {
                path,
                storage_id,
                reason,
            } => vec![
                ("path", path.display().to_string()),
                ("storage_id", storage_id.clone()),
                ("reason", reason.clone()),
            ],
            ReindexError::PerFileRead { path, reason }
            | ReindexError::StorageUnavailable { path, reason }
            | ReindexError::IndexFormat { path, reason } => vec![
                ("path", path.display().to_string()),
                ("reason", reason.clone()),
            ],
            ReindexError::TopicDefinitionConflict { conflicts } => conflicts
                .iter()
                .map(|c| ("topic", c.topic.clone()))
                .collect(),
            ReindexError::NotOpen => vec![],
            ReindexError::InvalidState { expected, actual } => vec![
                ("expected", expected.to_string()),
                ("actual", actual.to_string()),
            ],
            ReindexError::ReindexFailed { failures } => {
                vec![("failures", failures.len().to_string())]
            }
            ReindexError::Cancelled { processed } | ReindexError::DeadlineExceeded { processed } => {
                vec![("processed", processed.to_string())]
            }
            ReindexError::Io { context, source } => {
                vec![("context", context.clone()), ("source", source.to_string())]
            }
            ReindexError::InvalidConfig { reason } => vec![("reason", reason.clone())],
        }
    }
}

/// Result type for roboindex operations.
pub type Result<T> = std::result::Result<T, ReindexError>;
