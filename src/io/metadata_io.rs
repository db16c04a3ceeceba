// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Index file persistence.
//!
//! The index lives next to the data files as `metadata.yaml`:
//!
//! ```yaml
//! rosbag2_bagfile_information:
//!   version: 5
//!   storage_identifier: sqlite3
//!   relative_file_paths:
//!     - run_0.db3
//!   duration:
//!     nanoseconds: 1500
//!   starting_time:
//!     nanoseconds_since_epoch: 1000
//!   message_count: 3
//!   topics_with_message_count:
//!     - topic_metadata:
//!         name: /imu
//!         type: sensor_msgs/msg/Imu
//!         serialization_format: cdr
//!         offered_qos_profiles: ""
//!       message_count: 3
//!   compression_format: ""
//!   compression_mode: ""
//!   files:
//!     - path: run_0.db3
//!       starting_time:
//!         nanoseconds_since_epoch: 1000
//!       duration:
//!         nanoseconds: 1500
//!       message_count: 3
//! ```
//!
//! Older versions omit `files` and `offered_qos_profiles`; both default on read.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ReindexError, Result};

use super::metadata::{BagIndex, FileInformation, TopicRecord};

/// File name of the index inside a bag folder.
pub const METADATA_FILENAME: &str = "metadata.yaml";

/// Reads and writes the index file of a bag folder.
pub trait MetadataIo: Send + Sync {
    /// Path of the index file for a bag folder.
    fn metadata_path(&self, bag_dir: &Path) -> PathBuf;

    /// Check if an index file exists in a bag folder.
    fn metadata_file_exists(&self, bag_dir: &Path) -> bool {
        self.metadata_path(bag_dir).is_file()
    }

    /// Load the index of a bag folder.
    fn read_metadata(&self, bag_dir: &Path) -> Result<BagIndex>;

    /// Persist an index into a bag folder, returning the written path.
    ///
    /// Either the whole index is written or the previous file is left intact.
    fn write_metadata(&self, bag_dir: &Path, index: &BagIndex) -> Result<PathBuf>;
}

/// YAML index format compatible with rosbag2's `metadata.yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMetadataIo;

impl YamlMetadataIo {
    /// Parse an index from YAML text.
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<BagIndex> {
        let document: MetadataDocument =
            serde_yaml::from_str(text).map_err(|e| ReindexError::index_format(origin, e))?;
        Ok(document.info.into())
    }

    /// Render an index as YAML text.
    pub fn to_yaml_string(index: &BagIndex, origin: &Path) -> Result<String> {
        let document = MetadataDocument {
            info: BagInformation::from(index),
        };
        serde_yaml::to_string(&document).map_err(|e| ReindexError::index_format(origin, e))
    }
}

impl MetadataIo for YamlMetadataIo {
    fn metadata_path(&self, bag_dir: &Path) -> PathBuf {
        bag_dir.join(METADATA_FILENAME)
    }

    fn read_metadata(&self, bag_dir: &Path) -> Result<BagIndex> {
        let path = self.metadata_path(bag_dir);
        let text = fs::read_to_string(&path)
            .map_err(|e| ReindexError::io(format!("reading {}", path.display()), e))?;
        Self::from_yaml_str(&text, &path)
    }

    fn write_metadata(&self, bag_dir: &Path, index: &BagIndex) -> Result<PathBuf> {
        let path = self.metadata_path(bag_dir);
        let text = Self::to_yaml_string(index, &path)?;

        let tmp_path = bag_dir.join(format!(".{METADATA_FILENAME}.tmp"));
        let write_tmp = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()
        };
        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp_path);
            return Err(ReindexError::io(
                format!("writing {}", tmp_path.display()),
                e,
            ));
        }
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ReindexError::io(format!("replacing {}", path.display()), e)
        })?;

        debug!(
            context = "YamlMetadataIo",
            path = %path.display(),
            bytes = text.len(),
            "Wrote bag index"
        );
        Ok(path)
    }
}

// On-disk schema. Kept separate from BagIndex so the persisted field names
// can follow the established format without leaking into the API.

#[derive(Debug, Serialize, Deserialize)]
struct MetadataDocument {
    #[serde(rename = "rosbag2_bagfile_information")]
    info: BagInformation,
}

#[derive(Debug, Serialize, Deserialize)]
struct BagInformation {
    version: u32,
    storage_identifier: String,
    #[serde(default)]
    relative_file_paths: Vec<String>,
    #[serde(default)]
    duration: Nanoseconds,
    #[serde(default)]
    starting_time: NanosecondsSinceEpoch,
    #[serde(default)]
    message_count: u64,
    #[serde(default)]
    topics_with_message_count: Vec<TopicInformation>,
    #[serde(default)]
    compression_format: String,
    #[serde(default)]
    compression_mode: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    files: Vec<FileEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Nanoseconds {
    nanoseconds: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NanosecondsSinceEpoch {
    nanoseconds_since_epoch: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicInformation {
    topic_metadata: TopicMetadataEntry,
    #[serde(default)]
    message_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicMetadataEntry {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    serialization_format: String,
    #[serde(default)]
    offered_qos_profiles: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    path: String,
    #[serde(default)]
    starting_time: NanosecondsSinceEpoch,
    #[serde(default)]
    duration: Nanoseconds,
    #[serde(default)]
    message_count: u64,
}

impl From<&BagIndex> for BagInformation {
    fn from(index: &BagIndex) -> Self {
        Self {
            version: index.version,
            storage_identifier: index.storage_identifier.clone(),
            relative_file_paths: index.relative_file_paths.clone(),
            duration: Nanoseconds {
                nanoseconds: index.duration,
            },
            starting_time: NanosecondsSinceEpoch {
                nanoseconds_since_epoch: index.starting_time,
            },
            message_count: index.message_count,
            topics_with_message_count: index
                .topics
                .iter()
                .map(|(name, record)| TopicInformation {
                    topic_metadata: TopicMetadataEntry {
                        name: name.clone(),
                        type_name: record.type_name.clone(),
                        serialization_format: record.serialization_format.clone(),
                        offered_qos_profiles: record.offered_qos_profiles.clone(),
                    },
                    message_count: record.message_count,
                })
                .collect(),
            compression_format: index.compression_format.clone(),
            compression_mode: index.compression_mode.clone(),
            files: index
                .files
                .iter()
                .map(|f| FileEntry {
                    path: f.path.clone(),
                    starting_time: NanosecondsSinceEpoch {
                        nanoseconds_since_epoch: f.starting_time,
                    },
                    duration: Nanoseconds {
                        nanoseconds: f.duration,
                    },
                    message_count: f.message_count,
                })
                .collect(),
        }
    }
}

impl From<BagInformation> for BagIndex {
    fn from(info: BagInformation) -> Self {
        let mut topics = BTreeMap::new();
        for entry in info.topics_with_message_count {
            topics.insert(
                entry.topic_metadata.name,
                TopicRecord {
                    type_name: entry.topic_metadata.type_name,
                    serialization_format: entry.topic_metadata.serialization_format,
                    offered_qos_profiles: entry.topic_metadata.offered_qos_profiles,
                    message_count: entry.message_count,
                },
            );
        }

        Self {
            version: info.version,
            storage_identifier: info.storage_identifier,
            relative_file_paths: info.relative_file_paths,
            starting_time: info.starting_time.nanoseconds_since_epoch,
            duration: info.duration.nanoseconds,
            message_count: info.message_count,
            topics,
            compression_format: info.compression_format,
            compression_mode: info.compression_mode,
            files: info
                .files
                .into_iter()
                .map(|f| FileInformation {
                    path: f.path,
                    starting_time: f.starting_time.nanoseconds_since_epoch,
                    duration: f.duration.nanoseconds,
                    message_count: f.message_count,
                })
                .collect(),
        }
    }
}
