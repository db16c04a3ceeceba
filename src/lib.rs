// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Roboindex
//!
//! Index recovery for multi-file rosbag2 recordings.
//!
//! When a bag's `metadata.yaml` is missing, stale or untrusted, roboindex
//! rebuilds it from the data files: it finds the segments in order, reads
//! per-file topic statistics, checks that every file agrees on each topic's
//! definition and writes one authoritative index.
//!
//! ## Architecture
//!
//! - `core/` - error type, options and configuration, cancellation
//! - `io/` - data model, storage plugins (`sqlite3`, `mcap`, ROS1 `bag`),
//!   plugin registry, format detection, index persistence
//! - `reindex/` - path resolution, file discovery, extraction, aggregation
//!   and the [`Reindexer`] that drives them
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use roboindex::{RecordOptions, ReindexOutcome, Reindexer, StorageOptions};
//!
//! let mut reindexer = Reindexer::builder().build();
//! reindexer.open(&StorageOptions::new("/data/bags/run_42"), &RecordOptions::default())?;
//!
//! let report = reindexer.reindex()?;
//! println!("{} messages on {} topics", report.index.message_count, report.index.topics.len());
//! if report.outcome() == ReindexOutcome::Partial {
//!     eprintln!("{} file(s) skipped", report.skipped.len());
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{
    CancellationToken, RecordOptions, ReindexConfig, ReindexError, ReindexOptions, Result,
    SkippedFile, StorageOptions, TopicConflict,
};

// I/O types (metadata, storage plugins, index persistence)
pub mod io;

// Re-export key I/O types
pub use io::metadata::{BagIndex, FileMetadata, TopicRecord};
pub use io::metadata_io::{MetadataIo, YamlMetadataIo};
pub use io::registry::StorageRegistry;
pub use io::traits::{StorageBackend, StorageFactory};

// Reindexing
pub mod reindex;

pub use reindex::{
    reindex_bag, ReindexOutcome, ReindexReport, Reindexer, ReindexerBuilder, ReindexerState,
};
