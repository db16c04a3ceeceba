// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer: the bag data model, storage plugins and index persistence.

pub mod detection;
pub mod formats;
pub mod metadata;
pub mod metadata_io;

// Re-exports
pub use detection::{detect_bag_storage, detect_storage_id};
pub use metadata::{
    BagIndex, FileInformation, FileMetadata, StorageMessage, TimeBounds, TopicDefinition,
    TopicMetadata, TopicRecord, TopicStats, CURRENT_INDEX_VERSION,
};
pub use metadata_io::{MetadataIo, YamlMetadataIo, METADATA_FILENAME};

// Storage capability traits and the plugin registry
pub mod registry;
pub mod traits;
pub use registry::StorageRegistry;
pub use traits::{StorageBackend, StorageFactory};
