// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag storage plugin (`.bag` segments) using the rosbag crate.
//!
//! ROS1 bags keep no per-topic statistics, so metadata always comes from a
//! scan of the chunk records.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::io::metadata::{FileMetadata, StorageMessage, TopicMetadata};
use crate::io::traits::{StorageBackend, StorageFactory};
use crate::{ReindexError, Result};

/// Identifier of the ROS1 bag plugin.
pub const BAG_STORAGE_ID: &str = "bag";

/// Serialization format of every ROS1 message.
const ROS1_SERIALIZATION: &str = "ros1";

/// Plugin factory for `.bag` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct BagStorageFactory;

impl StorageFactory for BagStorageFactory {
    fn storage_identifier(&self) -> &str {
        BAG_STORAGE_ID
    }

    fn extension(&self) -> &str {
        "bag"
    }

    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StorageBackend>> {
        Ok(Box::new(BagStorage::open(path)?))
    }
}

/// One open ROS1 bag file.
pub struct BagStorage {
    path: PathBuf,
    bag: rosbag::RosBag,
    /// Connections from the index section keyed by connection id
    connections: HashMap<u32, TopicMetadata>,
}

impl BagStorage {
    /// Open a bag file and read its connection index.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let bag = rosbag::RosBag::new(&path).map_err(|e| {
            ReindexError::backend_open(&path, BAG_STORAGE_ID, format!("Failed to open bag: {e}"))
        })?;

        let mut connections = HashMap::new();
        for record in bag.index_records() {
            let record = record.map_err(|e| {
                ReindexError::backend_open(
                    &path,
                    BAG_STORAGE_ID,
                    format!("Failed to read index: {e}"),
                )
            })?;
            if let rosbag::IndexRecord::Connection(conn) = record {
                connections
                    .entry(conn.id)
                    .or_insert_with(|| connection_topic(conn.topic, conn.tp));
            }
        }

        debug!(
            context = "BagStorage",
            path = %path.display(),
            connections = connections.len(),
            "Opened ROS1 bag"
        );

        Ok(Self {
            path,
            bag,
            connections,
        })
    }
}

fn connection_topic(topic: &str, message_type: &str) -> TopicMetadata {
    TopicMetadata::new(topic, message_type, ROS1_SERIALIZATION)
}

impl StorageBackend for BagStorage {
    fn storage_identifier(&self) -> &str {
        BAG_STORAGE_ID
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_metadata(&self) -> Result<Option<FileMetadata>> {
        Ok(None)
    }

    fn declared_topics(&self) -> Vec<TopicMetadata> {
        let mut ids: Vec<&u32> = self.connections.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| self.connections[id].clone()).collect()
    }

    fn read_messages(&mut self, visit: &mut dyn FnMut(StorageMessage<'_>)) -> Result<()> {
        for record in self.bag.chunk_records() {
            let record = record
                .map_err(|e| ReindexError::read(&self.path, format!("Failed to read chunk: {e}")))?;
            let rosbag::ChunkRecord::Chunk(chunk) = record else {
                continue;
            };
            for msg in chunk.messages() {
                let msg = msg.map_err(|e| {
                    ReindexError::read(&self.path, format!("Failed to read message: {e}"))
                })?;
                match msg {
                    rosbag::MessageRecord::Connection(conn) => {
                        // Connections can appear inside chunks before the index.
                        self.connections
                            .entry(conn.id)
                            .or_insert_with(|| connection_topic(conn.topic, conn.tp));
                    }
                    rosbag::MessageRecord::MessageData(data) => {
                        if let Some(topic) = self.connections.get(&data.conn_id) {
                            visit(StorageMessage {
                                topic,
                                timestamp: data.time,
                            });
                        }
                    }
                    #[allow(unreachable_patterns)]
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
