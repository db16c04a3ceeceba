// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use roboindex::io::metadata::{FileMetadata, StorageMessage, TopicMetadata};
use roboindex::{ReindexError, Result, StorageBackend, StorageFactory, StorageRegistry};
use rusqlite::Connection;

// ============================================================================
// sqlite3 bags
// ============================================================================

/// A topic row of a `.db3` file.
#[derive(Debug, Clone)]
pub struct Db3Topic {
    pub id: i64,
    pub name: &'static str,
    pub type_name: &'static str,
    pub serialization_format: &'static str,
}

impl Db3Topic {
    pub fn cdr(id: i64, name: &'static str, type_name: &'static str) -> Self {
        Self {
            id,
            name,
            type_name,
            serialization_format: "cdr",
        }
    }

    pub fn with_format(mut self, format: &'static str) -> Self {
        self.serialization_format = format;
        self
    }
}

/// Write a rosbag2 sqlite3 segment with the given topics and
/// `(topic_id, timestamp)` messages.
pub fn write_db3(path: &Path, topics: &[Db3Topic], messages: &[(i64, i64)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE topics(id INTEGER PRIMARY KEY, name TEXT NOT NULL, type TEXT NOT NULL, \
         serialization_format TEXT NOT NULL, offered_qos_profiles TEXT NOT NULL);
         CREATE TABLE messages(id INTEGER PRIMARY KEY, topic_id INTEGER NOT NULL, \
         timestamp INTEGER NOT NULL, data BLOB NOT NULL);",
    )
    .unwrap();
    for topic in topics {
        conn.execute(
            "INSERT INTO topics VALUES (?1, ?2, ?3, ?4, '')",
            rusqlite::params![
                topic.id,
                topic.name,
                topic.type_name,
                topic.serialization_format
            ],
        )
        .unwrap();
    }
    for &(topic_id, timestamp) in messages {
        conn.execute(
            "INSERT INTO messages(topic_id, timestamp, data) VALUES (?1, ?2, x'00010203')",
            rusqlite::params![topic_id, timestamp],
        )
        .unwrap();
    }
}

/// Topics used by [`standard_bag`].
pub fn standard_topics() -> Vec<Db3Topic> {
    vec![
        Db3Topic::cdr(1, "/imu", "sensor_msgs/msg/Imu"),
        Db3Topic::cdr(2, "/tf", "tf2_msgs/msg/TFMessage"),
    ]
}

/// Create `<root>/<name>/` with `files` sqlite3 segments named
/// `<name>_<i>.db3`. Segment `i` holds `i + 2` `/imu` messages and one `/tf`
/// message, all timestamped after the previous segment.
pub fn standard_bag(root: &Path, name: &str, files: usize) -> PathBuf {
    let bag = root.join(name);
    std::fs::create_dir_all(&bag).unwrap();
    for i in 0..files {
        let base = 1_000_000_000 * (i as i64 + 1);
        let mut messages: Vec<(i64, i64)> =
            (0..i as i64 + 2).map(|k| (1, base + k * 10)).collect();
        messages.push((2, base + 5));
        write_db3(
            &bag.join(format!("{name}_{i}.db3")),
            &standard_topics(),
            &messages,
        );
    }
    bag
}

/// Messages written by [`standard_bag`] into segment `i`.
pub fn standard_file_count(i: usize) -> u64 {
    i as u64 + 3
}

/// Overwrite a file with bytes no plugin accepts.
pub fn corrupt(path: &Path) {
    std::fs::write(path, b"this segment was truncated by a power loss").unwrap();
}

/// Write a `metadata.yaml` by hand.
pub fn write_index(bag: &Path, version: u32, storage_id: &str, files: &[&str]) {
    let mut text = format!(
        "rosbag2_bagfile_information:\n  version: {version}\n  storage_identifier: {storage_id}\n  relative_file_paths:\n"
    );
    for file in files {
        text.push_str(&format!("    - {file}\n"));
    }
    text.push_str("  message_count: 12345\n");
    std::fs::write(bag.join("metadata.yaml"), text).unwrap();
}

pub fn read_index_text(bag: &Path) -> String {
    std::fs::read_to_string(bag.join("metadata.yaml")).unwrap()
}

// ============================================================================
// In-memory storage plugin
// ============================================================================

/// Behavior of one in-memory file.
#[derive(Debug, Clone)]
pub enum MemoryFile {
    /// Serves these `(topic, timestamp)` messages
    Messages(Vec<(TopicMetadata, u64)>),
    /// Refuses to open
    OpenFails,
    /// Opens, then fails after yielding this many messages
    ReadFails(Vec<(TopicMetadata, u64)>),
}

/// Storage plugin `mem` (`.mem` files) whose contents live in memory.
///
/// The files must still exist on disk so discovery finds them; only their
/// names matter.
#[derive(Default)]
pub struct MemoryStorageFactory {
    files: Mutex<HashMap<String, MemoryFile>>,
    opened: Mutex<Vec<String>>,
}

impl MemoryStorageFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create `<dir>/<name>` on disk and attach contents to it.
    pub fn add(&self, dir: &Path, name: &str, file: MemoryFile) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"mem").unwrap();
        self.files.lock().unwrap().insert(name.to_string(), file);
        path
    }

    /// File names in the order they were opened.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn registry(self: &Arc<Self>) -> Arc<StorageRegistry> {
        let registry = StorageRegistry::with_defaults();
        registry.register(self.clone());
        Arc::new(registry)
    }
}

impl StorageFactory for MemoryStorageFactory {
    fn storage_identifier(&self) -> &str {
        "mem"
    }

    fn extension(&self) -> &str {
        "mem"
    }

    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StorageBackend>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.opened.lock().unwrap().push(name.clone());
        let file = self.files.lock().unwrap().get(&name).cloned();
        match file {
            None => Err(ReindexError::backend_open(path, "mem", "no such file")),
            Some(MemoryFile::OpenFails) => {
                Err(ReindexError::backend_open(path, "mem", "corrupt header"))
            }
            Some(MemoryFile::Messages(messages)) => Ok(Box::new(MemoryBackend {
                path: path.to_path_buf(),
                messages,
                fail_after: false,
            })),
            Some(MemoryFile::ReadFails(messages)) => Ok(Box::new(MemoryBackend {
                path: path.to_path_buf(),
                messages,
                fail_after: true,
            })),
        }
    }
}

struct MemoryBackend {
    path: PathBuf,
    messages: Vec<(TopicMetadata, u64)>,
    fail_after: bool,
}

impl StorageBackend for MemoryBackend {
    fn storage_identifier(&self) -> &str {
        "mem"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_metadata(&self) -> Result<Option<FileMetadata>> {
        Ok(None)
    }

    fn read_messages(&mut self, visit: &mut dyn FnMut(StorageMessage<'_>)) -> Result<()> {
        for (topic, timestamp) in &self.messages {
            visit(StorageMessage {
                topic,
                timestamp: *timestamp,
            });
        }
        if self.fail_after {
            return Err(ReindexError::read(&self.path, "unexpected end of record"));
        }
        Ok(())
    }
}

pub fn topic(name: &str, type_name: &str, format: &str) -> TopicMetadata {
    TopicMetadata::new(name, type_name, format)
}

/// `count` messages on `topic` starting at `start`, 1 ns apart.
pub fn messages(topic: &TopicMetadata, start: u64, count: u64) -> Vec<(TopicMetadata, u64)> {
    (0..count).map(|k| (topic.clone(), start + k)).collect()
}
