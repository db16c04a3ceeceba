// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-file metadata extraction.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::io::metadata::FileMetadata;
use crate::io::registry::StorageRegistry;
use crate::io::traits::StorageBackend;
use crate::Result;

/// Opens one file at a time and summarizes its contents.
#[derive(Debug, Clone)]
pub struct FileMetadataExtractor {
    registry: Arc<StorageRegistry>,
    prefer_embedded: bool,
}

impl FileMetadataExtractor {
    /// Create an extractor that uses embedded metadata when available.
    pub fn new(registry: Arc<StorageRegistry>) -> Self {
        Self {
            registry,
            prefer_embedded: true,
        }
    }

    /// Choose between embedded metadata and a full scan.
    pub fn with_prefer_embedded(mut self, prefer_embedded: bool) -> Self {
        self.prefer_embedded = prefer_embedded;
        self
    }

    /// Extract metadata from one file.
    ///
    /// The backend handle lives only for this call and is closed on every
    /// return path. Errors carry the file's path so the caller can decide
    /// whether to skip it.
    pub fn extract(&self, path: &Path, storage_id: &str) -> Result<FileMetadata> {
        let start = Instant::now();
        let mut backend = self.registry.open_read_only(path, storage_id)?;

        let (mut metadata, source) = match self.embedded(backend.as_ref()) {
            Some(metadata) => (metadata, "embedded"),
            None => (scan(backend.as_mut())?, "scan"),
        };
        metadata.path = path.to_path_buf();

        debug!(
            context = "FileMetadataExtractor",
            path = %path.display(),
            source,
            topics = metadata.topics.len(),
            messages = metadata.message_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extracted file metadata"
        );

        Ok(metadata)
    }

    fn embedded(&self, backend: &dyn StorageBackend) -> Option<FileMetadata> {
        if !self.prefer_embedded {
            return None;
        }
        match backend.get_metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    context = "FileMetadataExtractor",
                    path = %backend.path().display(),
                    error = %e,
                    "Embedded metadata unreadable, falling back to a full scan"
                );
                None
            }
        }
    }
}

/// Tally every message of an open backend.
///
/// Declared topics are listed first; a topic seen only in the message
/// stream takes its type and serialization format from its first message.
pub fn scan(backend: &mut dyn StorageBackend) -> Result<FileMetadata> {
    let mut metadata = FileMetadata::new(backend.path());
    for topic in backend.declared_topics() {
        metadata.declare_topic(&topic);
    }
    backend.read_messages(&mut |message| metadata.record(&message))?;
    Ok(metadata)
}
