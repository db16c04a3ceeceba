// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Storage plugin registry.
//!
//! Maps a storage identifier to the factory that opens files of that
//! format, so the reindexer never names a concrete backend.
//!
//! # Example
//!
//! ```no_run
//! use roboindex::io::StorageRegistry;
//!
//! let registry = StorageRegistry::with_defaults();
//! let backend = registry.open_read_only("bag/bag_0.db3".as_ref(), "sqlite3")?;
//! # Ok::<(), roboindex::ReindexError>(())
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::{ReindexError, Result};

use super::formats::{BagStorageFactory, McapStorageFactory, Sqlite3StorageFactory};
use super::traits::{StorageBackend, StorageFactory};

/// Registry of storage plugins keyed by identifier.
#[derive(Default)]
pub struct StorageRegistry {
    factories: RwLock<HashMap<String, Arc<dyn StorageFactory>>>,
}

impl StorageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `sqlite3`, `mcap` and `bag` plugins.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(Sqlite3StorageFactory));
        registry.register(Arc::new(McapStorageFactory));
        registry.register(Arc::new(BagStorageFactory));
        registry
    }

    /// Register a plugin under its own identifier, replacing any previous one.
    pub fn register(&self, factory: Arc<dyn StorageFactory>) {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert(factory.storage_identifier().to_string(), factory);
    }

    /// Remove a plugin.
    ///
    /// Returns `true` if a plugin was removed.
    pub fn unregister(&self, storage_id: &str) -> bool {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.remove(storage_id).is_some()
    }

    /// Look up a plugin by identifier.
    pub fn get(&self, storage_id: &str) -> Option<Arc<dyn StorageFactory>> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.get(storage_id).cloned()
    }

    /// Check if an identifier is registered.
    pub fn contains(&self, storage_id: &str) -> bool {
        self.get(storage_id).is_some()
    }

    /// Data-file extension of a registered plugin.
    pub fn extension_for(&self, storage_id: &str) -> Option<String> {
        self.get(storage_id).map(|f| f.extension().to_string())
    }

    /// Identifier of the plugin owning a file extension.
    pub fn storage_id_for_extension(&self, extension: &str) -> Option<String> {
        let extension = extension.trim_start_matches('.');
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut matches: Vec<&str> = factories
            .values()
            .filter(|f| f.extension().eq_ignore_ascii_case(extension))
            .map(|f| f.storage_identifier())
            .collect();
        matches.sort_unstable();
        matches.first().map(|s| s.to_string())
    }

    /// All registered identifiers, sorted.
    pub fn storage_ids(&self) -> Vec<String> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ids: Vec<String> = factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Data-file extensions of all registered plugins, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut extensions: Vec<String> =
            factories.values().map(|f| f.extension().to_string()).collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Open a file with the plugin registered under `storage_id`.
    pub fn open_read_only(&self, path: &Path, storage_id: &str) -> Result<Box<dyn StorageBackend>> {
        let factory = self.get(storage_id).ok_or_else(|| {
            ReindexError::backend_open(
                path,
                storage_id,
                format!("no storage plugin registered for '{storage_id}'"),
            )
        })?;
        factory.open_read_only(path)
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("storage_ids", &self.storage_ids())
            .finish()
    }
}
