// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! SQLite3 storage plugin (`.db3` segments).
//!
//! Reads the rosbag2 sqlite schema:
//! - `topics(id, name, type, serialization_format[, offered_qos_profiles])`
//! - `messages(id, topic_id, timestamp, data)`
//!
//! Per-file metadata is computed with aggregate queries, so the message
//! table is never walked row by row unless a scan is forced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::io::metadata::{FileMetadata, StorageMessage, TimeBounds, TopicMetadata, TopicStats};
use crate::io::traits::{StorageBackend, StorageFactory};
use crate::{ReindexError, Result};

/// Identifier of the sqlite3 plugin.
pub const SQLITE3_STORAGE_ID: &str = "sqlite3";

/// Plugin factory for `.db3` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite3StorageFactory;

impl StorageFactory for Sqlite3StorageFactory {
    fn storage_identifier(&self) -> &str {
        SQLITE3_STORAGE_ID
    }

    fn extension(&self) -> &str {
        "db3"
    }

    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StorageBackend>> {
        Ok(Box::new(Sqlite3Storage::open(path)?))
    }
}

/// One open `.db3` file.
pub struct Sqlite3Storage {
    path: PathBuf,
    conn: Connection,
    /// Topic rows keyed by their primary key
    topics: HashMap<i64, TopicMetadata>,
}

impl Sqlite3Storage {
    /// Open a `.db3` file read-only and load its topic table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ReindexError::backend_open(
                &path,
                SQLITE3_STORAGE_ID,
                "file does not exist",
            ));
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ReindexError::backend_open(&path, SQLITE3_STORAGE_ID, e))?;

        let topics = load_topics(&conn)
            .map_err(|e| ReindexError::backend_open(&path, SQLITE3_STORAGE_ID, e))?;

        debug!(
            context = "Sqlite3Storage",
            path = %path.display(),
            topics = topics.len(),
            "Opened sqlite3 storage"
        );

        Ok(Self { path, conn, topics })
    }

    /// Topics declared in this file, ordered by row id.
    pub fn topics(&self) -> Vec<&TopicMetadata> {
        let mut ids: Vec<&i64> = self.topics.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| &self.topics[id]).collect()
    }

    fn aggregate_metadata(&self) -> rusqlite::Result<FileMetadata> {
        let mut meta = FileMetadata::new(&self.path);
        for topic in self.topics() {
            meta.declare_topic(topic);
        }

        let mut stmt = self.conn.prepare(
            "SELECT topic_id, COUNT(*), MIN(timestamp), MAX(timestamp) \
             FROM messages GROUP BY topic_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        for row in rows {
            let (topic_id, count, min_ts, max_ts) = row?;
            let Some(topic) = self.topics.get(&topic_id) else {
                warn!(
                    context = "Sqlite3Storage",
                    path = %self.path.display(),
                    topic_id,
                    count,
                    "Messages reference an undeclared topic id, ignoring them"
                );
                continue;
            };
            let stats = TopicStats::from_metadata(topic)
                .with_message_count(count.max(0) as u64)
                .with_time_bounds(TimeBounds::new(to_nanos(min_ts), to_nanos(max_ts)));
            meta = meta.with_topic(topic.name.clone(), stats);
        }

        Ok(meta)
    }

    fn scan(&self, visit: &mut dyn FnMut(StorageMessage<'_>)) -> rusqlite::Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT topic_id, timestamp FROM messages ORDER BY timestamp, id")?;
        let mut rows = stmt.query([])?;
        let mut orphaned = 0u64;

        while let Some(row) = rows.next()? {
            let topic_id: i64 = row.get(0)?;
            let timestamp: i64 = row.get(1)?;
            match self.topics.get(&topic_id) {
                Some(topic) => visit(StorageMessage {
                    topic,
                    timestamp: to_nanos(timestamp),
                }),
                None => orphaned += 1,
            }
        }

        if orphaned > 0 {
            warn!(
                context = "Sqlite3Storage",
                path = %self.path.display(),
                orphaned,
                "Skipped messages referencing undeclared topic ids"
            );
        }
        Ok(())
    }
}

impl StorageBackend for Sqlite3Storage {
    fn storage_identifier(&self) -> &str {
        SQLITE3_STORAGE_ID
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get_metadata(&self) -> Result<Option<FileMetadata>> {
        self.aggregate_metadata()
            .map(Some)
            .map_err(|e| ReindexError::read(&self.path, e))
    }

    fn declared_topics(&self) -> Vec<TopicMetadata> {
        self.topics().into_iter().cloned().collect()
    }

    fn read_messages(&mut self, visit: &mut dyn FnMut(StorageMessage<'_>)) -> Result<()> {
        self.scan(visit).map_err(|e| ReindexError::read(&self.path, e))
    }
}

fn load_topics(conn: &Connection) -> rusqlite::Result<HashMap<i64, TopicMetadata>> {
    // Bags recorded before QoS support have no offered_qos_profiles column.
    let has_qos = {
        let mut stmt = conn.prepare("PRAGMA table_info(topics)")?;
        let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut found = false;
        for column in columns {
            if column? == "offered_qos_profiles" {
                found = true;
            }
        }
        found
    };

    let sql = if has_qos {
        "SELECT id, name, type, serialization_format, offered_qos_profiles FROM topics"
    } else {
        "SELECT id, name, type, serialization_format, '' FROM topics"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        let id: i64 = row.get(0)?;
        let topic = TopicMetadata::new(
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        )
        .with_qos(row.get::<_, String>(4)?);
        Ok((id, topic))
    })?;

    rows.collect()
}

fn to_nanos(timestamp: i64) -> u64 {
    timestamp.max(0) as u64
}
