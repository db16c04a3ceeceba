// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Options controlling how a bag is opened and reindexed.
//!
//! Options can be built in code with the `with_*` setters or loaded from a
//! TOML file:
//!
//! ```toml
//! [storage]
//! uri = "/data/bags/run_42"
//! storage_id = "sqlite3"
//!
//! [record]
//! rmw_serialization_format = "cdr"
//!
//! [reindex]
//! workers = 4
//! prefer_embedded_metadata = true
//! dry_run = false
//! timeout_secs = 600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ReindexError, Result};

/// Where the bag lives and which plugin reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Bag folder, or a single data file inside one
    pub uri: PathBuf,
    /// Storage plugin identifier; empty means infer it
    pub storage_id: String,
}

impl StorageOptions {
    /// Options for a bag at `uri` with the plugin inferred.
    pub fn new(uri: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            storage_id: String::new(),
        }
    }

    /// Set the storage plugin identifier.
    pub fn with_storage_id(mut self, storage_id: impl Into<String>) -> Self {
        self.storage_id = storage_id.into();
        self
    }

    /// Whether the plugin must be inferred.
    pub fn infers_storage_id(&self) -> bool {
        self.storage_id.trim().is_empty()
    }
}

/// Recording-time settings, consulted but never altered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    /// Serialization format the recorder was configured with
    pub rmw_serialization_format: String,
    /// Topics the recorder was asked to record (empty means all)
    pub topics: Vec<String>,
}

impl RecordOptions {
    /// Set the expected serialization format.
    pub fn with_serialization_format(mut self, format: impl Into<String>) -> Self {
        self.rmw_serialization_format = format.into();
        self
    }

    /// Set the expected topic list.
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }
}

/// Tuning knobs for a reindex run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReindexOptions {
    /// Extraction threads; 0 means one per CPU, 1 is sequential
    pub workers: usize,
    /// Use metadata stored in the files when a plugin offers it
    pub prefer_embedded_metadata: bool,
    /// Build the index without writing it
    pub dry_run: bool,
    /// Give up after this long (checked between files); `timeout_secs`
    /// in config files, fractions allowed
    #[serde(rename = "timeout_secs", with = "timeout_secs")]
    pub timeout: Option<Duration>,
}

impl Default for ReindexOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            prefer_embedded_metadata: true,
            dry_run: false,
            timeout: None,
        }
    }
}

impl ReindexOptions {
    /// Set the number of extraction threads.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Always scan message streams, ignoring embedded metadata.
    pub fn with_full_scan(mut self) -> Self {
        self.prefer_embedded_metadata = false;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Worker count with 0 resolved to the CPU count.
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

/// `Option<Duration>` as seconds.
mod timeout_secs {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        timeout: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        timeout.map(|t| t.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}

/// Everything needed for a run, as loaded from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReindexConfig {
    /// `[storage]` table
    pub storage: StorageOptions,
    /// `[record]` table
    pub record: RecordOptions,
    /// `[reindex]` table
    pub reindex: ReindexOptions,
}

impl ReindexConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ReindexError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    /// Load a config from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ReindexError::InvalidConfig {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }
}
