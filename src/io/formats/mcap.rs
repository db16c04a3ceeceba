// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP storage plugin (`.mcap` segments) using the mcap crate.
//!
//! When a file carries a summary section with a statistics record, per-file
//! metadata is taken from it directly. Otherwise the message stream is
//! scanned.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::io::metadata::{FileMetadata, StorageMessage, TimeBounds, TopicMetadata, TopicStats};
use crate::io::traits::{StorageBackend, StorageFactory};
use crate::{ReindexError, Result};

/// Identifier of the MCAP plugin.
pub const MCAP_STORAGE_ID: &str = "mcap";

/// Leading magic bytes of every MCAP file.
const MCAP_MAGIC: &[u8] = b"\x89MCAP0\r\n";

/// Channel metadata key rosbag2 uses for QoS profiles.
const QOS_METADATA_KEY: &str = "offered_qos_profiles";

/// Plugin factory for `.mcap` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct McapStorageFactory;

impl StorageFactory for McapStorageFactory {
    fn storage_identifier(&self) -> &str {
        MCAP_STORAGE_ID
    }

    fn extension(&self) -> &str {
        "mcap"
    }

    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StorageBackend>> {
        Ok(Box::new(McapStorage::open(path)?))
    }
}

/// One memory-mapped `.mcap` file.
pub struct McapStorage {
    path: PathBuf,
    mmap: memmap2::Mmap,
}

impl McapStorage {
    /// Open and memory-map an MCAP file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(|e| {
            ReindexError::backend_open(&path, MCAP_STORAGE_ID, format!("Failed to open file: {e}"))
        })?;

        // SAFETY: bags are assumed closed while being reindexed, so the file
        // is not truncated underneath the mapping.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| {
            ReindexError::backend_open(&path, MCAP_STORAGE_ID, format!("Failed to mmap file: {e}"))
        })?;

        if !mmap.starts_with(MCAP_MAGIC) {
            return Err(ReindexError::backend_open(
                &path,
                MCAP_STORAGE_ID,
                "missing MCAP magic",
            ));
        }

        Ok(Self { path, mmap })
    }

    fn topic_from_channel(channel: &mcap::Channel<'_>) -> TopicMetadata {
        let type_name = channel
            .schema
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let qos = channel
            .metadata
            .get(QOS_METADATA_KEY)
            .cloned()
            .unwrap_or_default();
        TopicMetadata::new(channel.topic.clone(), type_name, channel.message_encoding.clone())
            .with_qos(qos)
    }
}

impl StorageBackend for McapStorage {
    fn storage_identifier(&self) -> &str {
        MCAP_STORAGE_ID
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_metadata(&self) -> Result<Option<FileMetadata>> {
        let summary = match mcap::Summary::read(&self.mmap) {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                debug!(
                    context = "McapStorage",
                    path = %self.path.display(),
                    "MCAP file has no summary section, scan required"
                );
                return Ok(None);
            }
            Err(e) => {
                warn!(
                    context = "McapStorage",
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read summary, scan required"
                );
                return Ok(None);
            }
        };

        let Some(stats) = summary.stats.as_ref() else {
            return Ok(None);
        };

        let mut meta = FileMetadata::new(&self.path);
        let mut channel_ids: Vec<&u16> = summary.channels.keys().collect();
        channel_ids.sort();

        for id in channel_ids {
            let topic = Self::topic_from_channel(&summary.channels[id]);
            let count = stats.channel_message_counts.get(id).copied().unwrap_or(0);
            // Several channels may share one topic name.
            let entry = meta
                .topics
                .entry(topic.name.clone())
                .or_insert_with(|| TopicStats::from_metadata(&topic));
            entry.message_count += count;
        }

        if stats.message_count > 0 {
            meta.time_bounds = Some(TimeBounds::new(
                stats.message_start_time,
                stats.message_end_time,
            ));
        }

        Ok(Some(meta))
    }

    fn declared_topics(&self) -> Vec<TopicMetadata> {
        let Ok(Some(summary)) = mcap::Summary::read(&self.mmap) else {
            return Vec::new();
        };
        let mut ids: Vec<&u16> = summary.channels.keys().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| Self::topic_from_channel(&summary.channels[id]))
            .collect()
    }

    fn read_messages(&mut self, visit: &mut dyn FnMut(StorageMessage<'_>)) -> Result<()> {
        let stream = mcap::MessageStream::new(&self.mmap).map_err(|e| {
            ReindexError::read(&self.path, format!("Failed to create message stream: {e}"))
        })?;

        let mut topics: HashMap<u16, TopicMetadata> = HashMap::new();
        for result in stream {
            let message =
                result.map_err(|e| ReindexError::read(&self.path, format!("Read error: {e}")))?;
            let topic = topics
                .entry(message.channel.id)
                .or_insert_with(|| Self::topic_from_channel(&message.channel));
            visit(StorageMessage {
                topic,
                timestamp: message.log_time,
            });
        }

        Ok(())
    }
}
