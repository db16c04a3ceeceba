// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout roboindex.
//!
//! - [`ReindexError`] - error handling
//! - [`StorageOptions`], [`RecordOptions`], [`ReindexOptions`], [`ReindexConfig`] - run configuration
//! - [`CancellationToken`] - cooperative cancellation

pub mod cancel;
pub mod error;
pub mod options;

pub use cancel::CancellationToken;
pub use error::{ReindexError, Result, SkippedFile, TopicConflict};
pub use options::{RecordOptions, ReindexConfig, ReindexOptions, StorageOptions};
