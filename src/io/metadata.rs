// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Shared metadata types for bag reindexing.
//!
//! - [`FileMetadata`] is the transient, per-segment summary produced by
//!   extraction.
//! - [`BagIndex`] is the authoritative bag-wide record produced by
//!   aggregation and persisted as the index file.
//!
//! All timestamps are nanoseconds since the Unix epoch.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Index format version written by this crate.
///
/// Versions below 4 stored relative file paths prefixed with the bag folder name.
pub const CURRENT_INDEX_VERSION: u32 = 5;

/// Inclusive time range covered by a set of messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBounds {
    /// Earliest timestamp (nanoseconds)
    pub start: u64,
    /// Latest timestamp (nanoseconds)
    pub end: u64,
}

impl TimeBounds {
    /// Bounds covering a single instant.
    pub fn at(timestamp: u64) -> Self {
        Self {
            start: timestamp,
            end: timestamp,
        }
    }

    /// Create bounds from a start and end, swapping them if reversed.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Widen the bounds to include `timestamp`.
    pub fn include(&mut self, timestamp: u64) {
        self.start = self.start.min(timestamp);
        self.end = self.end.max(timestamp);
    }

    /// Smallest bounds covering both.
    pub fn union(self, other: TimeBounds) -> TimeBounds {
        TimeBounds {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Duration in nanoseconds.
    pub fn duration(&self) -> u64 {
        self.end - self.start
    }
}

/// Merge two optional bounds.
pub fn merge_bounds(a: Option<TimeBounds>, b: Option<TimeBounds>) -> Option<TimeBounds> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// The parts of a topic that every file must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TopicDefinition {
    /// Message type name (e.g., "sensor_msgs/msg/Imu")
    pub type_name: String,
    /// Serialization format (e.g., "cdr")
    pub serialization_format: String,
}

impl fmt::Display for TopicDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.type_name, self.serialization_format)
    }
}

/// Static description of a topic as declared by a storage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    /// Topic name (e.g., "/imu")
    pub name: String,
    /// Message type name
    pub type_name: String,
    /// Serialization format
    pub serialization_format: String,
    /// Offered QoS profiles, stored verbatim
    pub offered_qos_profiles: String,
}

impl TopicMetadata {
    /// Create a new TopicMetadata.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        serialization_format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            serialization_format: serialization_format.into(),
            offered_qos_profiles: String::new(),
        }
    }

    /// Set the offered QoS profiles.
    pub fn with_qos(mut self, qos: impl Into<String>) -> Self {
        self.offered_qos_profiles = qos.into();
        self
    }

    /// The definition part that is checked for consistency.
    pub fn definition(&self) -> TopicDefinition {
        TopicDefinition {
            type_name: self.type_name.clone(),
            serialization_format: self.serialization_format.clone(),
        }
    }
}

/// One message as seen by a sequential scan.
///
/// Payloads are never decoded, so only the envelope is exposed.
#[derive(Debug, Clone, Copy)]
pub struct StorageMessage<'a> {
    /// Topic the message was recorded on
    pub topic: &'a TopicMetadata,
    /// Receive timestamp (nanoseconds)
    pub timestamp: u64,
}

/// Per-file statistics for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStats {
    /// Message type name
    pub type_name: String,
    /// Serialization format
    pub serialization_format: String,
    /// Offered QoS profiles
    pub offered_qos_profiles: String,
    /// Messages on this topic in this file
    pub message_count: u64,
    /// Time range of this topic's messages (None if unknown or empty)
    pub time_bounds: Option<TimeBounds>,
}

impl TopicStats {
    /// Empty stats for a topic declared by `metadata`.
    pub fn from_metadata(metadata: &TopicMetadata) -> Self {
        Self {
            type_name: metadata.type_name.clone(),
            serialization_format: metadata.serialization_format.clone(),
            offered_qos_profiles: metadata.offered_qos_profiles.clone(),
            message_count: 0,
            time_bounds: None,
        }
    }

    /// Set the message count.
    pub fn with_message_count(mut self, count: u64) -> Self {
        self.message_count = count;
        self
    }

    /// Set the time bounds.
    pub fn with_time_bounds(mut self, bounds: TimeBounds) -> Self {
        self.time_bounds = Some(bounds);
        self
    }

    /// The definition part that is checked for consistency.
    pub fn definition(&self) -> TopicDefinition {
        TopicDefinition {
            type_name: self.type_name.clone(),
            serialization_format: self.serialization_format.clone(),
        }
    }
}

/// Metadata extracted from one physical storage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Topics present in this file, keyed by name
    pub topics: BTreeMap<String, TopicStats>,
    /// Time range of all messages in this file (None if the file is empty)
    pub time_bounds: Option<TimeBounds>,
}

impl FileMetadata {
    /// Create empty metadata for a file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            topics: BTreeMap::new(),
            time_bounds: None,
        }
    }

    /// Declare a topic without counting any messages.
    ///
    /// Topics that exist but carry no messages still belong in the index.
    pub fn declare_topic(&mut self, metadata: &TopicMetadata) {
        self.topics
            .entry(metadata.name.clone())
            .or_insert_with(|| TopicStats::from_metadata(metadata));
    }

    /// Insert precomputed statistics for a topic.
    pub fn with_topic(mut self, name: impl Into<String>, stats: TopicStats) -> Self {
        self.time_bounds = merge_bounds(self.time_bounds, stats.time_bounds);
        self.topics.insert(name.into(), stats);
        self
    }

    /// Tally one scanned message.
    ///
    /// The topic's type and serialization format are taken from the first
    /// message seen on it.
    pub fn record(&mut self, message: &StorageMessage<'_>) {
        let stats = self
            .topics
            .entry(message.topic.name.clone())
            .or_insert_with(|| TopicStats::from_metadata(message.topic));
        stats.message_count += 1;
        match stats.time_bounds.as_mut() {
            Some(bounds) => bounds.include(message.timestamp),
            None => stats.time_bounds = Some(TimeBounds::at(message.timestamp)),
        }
        match self.time_bounds.as_mut() {
            Some(bounds) => bounds.include(message.timestamp),
            None => self.time_bounds = Some(TimeBounds::at(message.timestamp)),
        }
    }

    /// Total messages across all topics in this file.
    pub fn message_count(&self) -> u64 {
        self.topics.values().map(|t| t.message_count).sum()
    }

    /// Get the file name component of the path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Bag-wide record for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicRecord {
    /// Message type name
    pub type_name: String,
    /// Serialization format
    pub serialization_format: String,
    /// Offered QoS profiles from the first file declaring the topic
    pub offered_qos_profiles: String,
    /// Messages on this topic across all files
    pub message_count: u64,
}

impl TopicRecord {
    /// The definition part that is checked for consistency.
    pub fn definition(&self) -> TopicDefinition {
        TopicDefinition {
            type_name: self.type_name.clone(),
            serialization_format: self.serialization_format.clone(),
        }
    }
}

/// Per-file entry of the index (version 5 and later).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInformation {
    /// Path relative to the bag folder
    pub path: String,
    /// Earliest message in the file (nanoseconds)
    pub starting_time: u64,
    /// Span of the file's messages (nanoseconds)
    pub duration: u64,
    /// Messages in the file
    pub message_count: u64,
}

/// The authoritative index of a bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BagIndex {
    /// Index format version
    pub version: u32,
    /// Storage plugin that produced the files
    pub storage_identifier: String,
    /// Data files in recording order
    pub relative_file_paths: Vec<String>,
    /// Earliest message timestamp (nanoseconds)
    pub starting_time: u64,
    /// Span from the first to the last message (nanoseconds)
    pub duration: u64,
    /// Total messages across all files and topics
    pub message_count: u64,
    /// Topics keyed by name
    pub topics: BTreeMap<String, TopicRecord>,
    /// Compression format (empty when uncompressed)
    pub compression_format: String,
    /// Compression mode (empty when uncompressed)
    pub compression_mode: String,
    /// Per-file summaries, in the same order as `relative_file_paths`
    pub files: Vec<FileInformation>,
}

impl BagIndex {
    /// Create an empty index for a storage plugin.
    pub fn new(storage_identifier: impl Into<String>) -> Self {
        Self {
            version: CURRENT_INDEX_VERSION,
            storage_identifier: storage_identifier.into(),
            relative_file_paths: Vec::new(),
            starting_time: 0,
            duration: 0,
            message_count: 0,
            topics: BTreeMap::new(),
            compression_format: String::new(),
            compression_mode: String::new(),
            files: Vec::new(),
        }
    }

    /// Timestamp of the last message (nanoseconds).
    pub fn end_time(&self) -> u64 {
        self.starting_time + self.duration
    }

    /// Check if the index lists a specific topic.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Sum of per-topic message counts.
    pub fn topic_message_total(&self) -> u64 {
        self.topics.values().map(|t| t.message_count).sum()
    }

    /// Resolve the listed files against a bag folder.
    pub fn absolute_file_paths(&self, bag_folder: &Path) -> Vec<PathBuf> {
        self.relative_file_paths
            .iter()
            .map(|p| bag_folder.join(p))
            .collect()
    }
}
