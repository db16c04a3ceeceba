// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core traits for storage plugins.
//!
//! A storage plugin is a [`StorageFactory`] registered under a string
//! identifier. Each call to [`StorageFactory::open_read_only`] yields one
//! [`StorageBackend`] handle bound to one physical file; dropping the handle
//! releases the file.

use std::path::Path;

use crate::Result;

use super::metadata::{FileMetadata, StorageMessage, TopicMetadata};

/// Read-only access to one physical storage file.
///
/// # Example
///
/// ```no_run
/// use roboindex::io::traits::StorageBackend;
///
/// fn count(backend: &mut dyn StorageBackend) -> roboindex::Result<u64> {
///     let mut total = 0;
///     backend.read_messages(&mut |_msg| total += 1)?;
///     Ok(total)
/// }
/// ```
pub trait StorageBackend: Send {
    /// Identifier of the plugin that opened this file (e.g., "sqlite3").
    fn storage_identifier(&self) -> &str;

    /// Path of the opened file.
    fn path(&self) -> &Path;

    /// Metadata persisted inside the file, if the format keeps any.
    ///
    /// Returns `Ok(None)` when the caller has to scan the messages instead.
    fn get_metadata(&self) -> Result<Option<FileMetadata>>;

    /// Topics the file declares, with or without messages.
    ///
    /// A scan starts from these, so a topic that never received a message
    /// is listed the same way embedded metadata lists it.
    fn declared_topics(&self) -> Vec<TopicMetadata> {
        Vec::new()
    }

    /// Visit every message in storage order.
    ///
    /// Any error means the file could not be read to the end.
    fn read_messages(&mut self, visit: &mut dyn FnMut(StorageMessage<'_>)) -> Result<()>;
}

/// Factory that opens files of one storage format.
pub trait StorageFactory: Send + Sync {
    /// Identifier this plugin is registered under.
    fn storage_identifier(&self) -> &str;

    /// Data-file extension without the leading dot (e.g., "db3").
    fn extension(&self) -> &str;

    /// Open a file read-only.
    ///
    /// Fails with [`crate::ReindexError::BackendOpen`] when the file is
    /// missing or not in this plugin's format.
    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StorageBackend>>;
}
