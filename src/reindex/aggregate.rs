// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Merging per-file metadata into one bag index.
//!
//! Files are folded in the order given. The first file that mentions a topic
//! fixes its type, serialization format and QoS. A later file that disagrees
//! on type or serialization format is a conflict; QoS differences are not.
//! Every conflict is collected before failing so a single run reports them
//! all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::TopicConflict;
use crate::io::metadata::{
    merge_bounds, BagIndex, FileInformation, FileMetadata, TimeBounds, TopicDefinition,
    TopicRecord,
};
use crate::{ReindexError, Result};

use super::paths::relative_to;

/// Builds a [`BagIndex`] from per-file metadata.
#[derive(Debug)]
pub struct MetadataAggregator {
    base_folder: PathBuf,
    index: BagIndex,
    bounds: Option<TimeBounds>,
    /// File that first declared each topic
    owners: HashMap<String, String>,
    conflicts: Vec<TopicConflict>,
}

impl MetadataAggregator {
    /// Start an empty index for files under `base_folder`.
    pub fn new(base_folder: impl Into<PathBuf>, storage_identifier: impl Into<String>) -> Self {
        Self {
            base_folder: base_folder.into(),
            index: BagIndex::new(storage_identifier),
            bounds: None,
            owners: HashMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// Aggregate a whole sequence in one call.
    pub fn aggregate<'a, I>(
        base_folder: &Path,
        storage_identifier: &str,
        files: I,
    ) -> Result<BagIndex>
    where
        I: IntoIterator<Item = &'a FileMetadata>,
    {
        let mut aggregator = Self::new(base_folder, storage_identifier);
        for file in files {
            aggregator.push(file);
        }
        aggregator.finish()
    }

    /// Fold in the next file.
    pub fn push(&mut self, file: &FileMetadata) {
        let relative = relative_to(&self.base_folder, &file.path);

        for (name, stats) in &file.topics {
            match self.index.topics.get_mut(name) {
                None => {
                    self.index.topics.insert(
                        name.clone(),
                        TopicRecord {
                            type_name: stats.type_name.clone(),
                            serialization_format: stats.serialization_format.clone(),
                            offered_qos_profiles: stats.offered_qos_profiles.clone(),
                            message_count: stats.message_count,
                        },
                    );
                    self.owners.insert(name.clone(), relative.clone());
                }
                Some(record) => {
                    let canonical = record.definition();
                    let found = stats.definition();
                    if canonical != found {
                        self.conflicts.push(conflict(
                            name,
                            self.owners.get(name).cloned().unwrap_or_default(),
                            relative.clone(),
                            canonical,
                            found,
                        ));
                    }
                    record.message_count += stats.message_count;
                }
            }
        }

        let file_count = file.message_count();
        self.index.message_count += file_count;
        self.bounds = merge_bounds(self.bounds, file.time_bounds);

        let (starting_time, duration) = file
            .time_bounds
            .map(|b| (b.start, b.duration()))
            .unwrap_or((0, 0));
        self.index.files.push(FileInformation {
            path: relative.clone(),
            starting_time,
            duration,
            message_count: file_count,
        });
        self.index.relative_file_paths.push(relative);
    }

    /// Conflicts found so far.
    pub fn conflicts(&self) -> &[TopicConflict] {
        &self.conflicts
    }

    /// Finish the index, failing if any topic definitions conflict.
    pub fn finish(mut self) -> Result<BagIndex> {
        if !self.conflicts.is_empty() {
            return Err(ReindexError::TopicDefinitionConflict {
                conflicts: self.conflicts,
            });
        }

        if let Some(bounds) = self.bounds {
            self.index.starting_time = bounds.start;
            self.index.duration = bounds.duration();
        }

        debug!(
            context = "MetadataAggregator",
            files = self.index.relative_file_paths.len(),
            topics = self.index.topics.len(),
            messages = self.index.message_count,
            "Aggregated bag index"
        );

        Ok(self.index)
    }
}

fn conflict(
    topic: &str,
    canonical_file: String,
    conflicting_file: String,
    canonical: TopicDefinition,
    conflicting: TopicDefinition,
) -> TopicConflict {
    TopicConflict {
        topic: topic.to_string(),
        canonical_file,
        conflicting_file,
        canonical,
        conflicting,
    }
}
