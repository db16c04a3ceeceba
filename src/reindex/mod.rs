// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Rebuilding a bag's index from its data files.
//!
//! A [`Reindexer`] walks through these states:
//!
//! ```text
//! Closed --open()--> Ready --reindex()--> Reindexing --> Done | Failed
//! ```
//!
//! `open()` settles which plugin reads the bag and which files belong to it,
//! in order. `reindex()` extracts every file, skipping those that cannot be
//! read, aggregates the rest and writes the index. Nothing is written unless
//! the whole run succeeds.
//!
//! # Example
//!
//! ```rust,no_run
//! use roboindex::{RecordOptions, Reindexer, StorageOptions};
//!
//! let mut reindexer = Reindexer::builder().workers(4).build();
//! reindexer.open(&StorageOptions::new("/data/bags/run_42"), &RecordOptions::default())?;
//! let report = reindexer.reindex()?;
//! for skipped in &report.skipped {
//!     eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
//! }
//! # Ok::<(), roboindex::ReindexError>(())
//! ```

pub mod aggregate;
pub mod builder;
pub mod extract;
pub mod paths;

pub use aggregate::MetadataAggregator;
pub use builder::ReindexerBuilder;
pub use extract::FileMetadataExtractor;
pub use paths::{discover_data_files, reconcile_hint, resolve_relative_paths, FileSource};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{CancellationToken, RecordOptions, ReindexOptions, SkippedFile, StorageOptions};
use crate::io::detection::{detect_bag_storage, detect_storage_id};
use crate::io::metadata::{BagIndex, FileMetadata};
use crate::io::metadata_io::MetadataIo;
use crate::io::registry::StorageRegistry;
use crate::{ReindexError, Result};

/// Called after each file with `(index, total, path)`; `index` is zero-based.
///
/// With several workers the calls arrive from worker threads and out of order.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &Path) + Send + Sync>;

/// Lifecycle state of a [`Reindexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexerState {
    /// No bag open
    Closed,
    /// Bag open, files resolved
    Ready,
    /// `reindex()` is running
    Reindexing,
    /// Last run produced an index
    Done,
    /// Last run failed
    Failed,
}

impl ReindexerState {
    /// Name for messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReindexerState::Closed => "Closed",
            ReindexerState::Ready => "Ready",
            ReindexerState::Reindexing => "Reindexing",
            ReindexerState::Done => "Done",
            ReindexerState::Failed => "Failed",
        }
    }
}

impl fmt::Display for ReindexerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether every file made it into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexOutcome {
    /// Every file was processed
    Complete,
    /// Some files were skipped
    Partial,
}

/// Result of a successful reindex.
#[derive(Debug, Clone, Serialize)]
pub struct ReindexReport {
    /// The rebuilt index
    pub index: BagIndex,
    /// Files that went into the index, in order
    pub processed: Vec<PathBuf>,
    /// Files that could not be read
    pub skipped: Vec<SkippedFile>,
    /// Where the index was written (None on a dry run)
    pub metadata_path: Option<PathBuf>,
    /// Message count of the index found at open time, if one was loaded
    pub prior_message_count: Option<u64>,
}

impl ReindexReport {
    /// Complete or partial.
    pub fn outcome(&self) -> ReindexOutcome {
        if self.skipped.is_empty() {
            ReindexOutcome::Complete
        } else {
            ReindexOutcome::Partial
        }
    }

    /// Check if any file was skipped.
    pub fn is_partial(&self) -> bool {
        self.outcome() == ReindexOutcome::Partial
    }
}

#[derive(Debug, Clone, Copy)]
enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

impl Interruption {
    fn into_error(self, processed: usize) -> ReindexError {
        match self {
            Interruption::Cancelled => ReindexError::Cancelled { processed },
            Interruption::DeadlineExceeded => ReindexError::DeadlineExceeded { processed },
        }
    }
}

/// Everything `open()` settled.
#[derive(Debug)]
struct OpenBag {
    base_folder: PathBuf,
    storage_id: String,
    files: FileSource,
    record: RecordOptions,
    prior: Option<BagIndex>,
}

/// Rebuilds the index of one bag. See the [module docs](self).
pub struct Reindexer {
    registry: Arc<StorageRegistry>,
    metadata_io: Box<dyn MetadataIo>,
    options: ReindexOptions,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
    state: ReindexerState,
    bag: Option<OpenBag>,
}

impl Reindexer {
    /// Start configuring a reindexer.
    pub fn builder() -> ReindexerBuilder {
        ReindexerBuilder::new()
    }

    pub(crate) fn from_parts(
        registry: Arc<StorageRegistry>,
        metadata_io: Box<dyn MetadataIo>,
        options: ReindexOptions,
        cancel: CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            registry,
            metadata_io,
            options,
            cancel,
            progress,
            state: ReindexerState::Closed,
            bag: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReindexerState {
        self.state
    }

    /// Options this reindexer runs with.
    pub fn options(&self) -> &ReindexOptions {
        &self.options
    }

    /// Token that cancels this reindexer's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Files that `reindex()` will process, once open.
    pub fn files(&self) -> Option<&FileSource> {
        self.bag.as_ref().map(|b| &b.files)
    }

    /// Storage plugin in use, once open.
    pub fn storage_id(&self) -> Option<&str> {
        self.bag.as_ref().map(|b| b.storage_id.as_str())
    }

    /// Bag folder, once open.
    pub fn base_folder(&self) -> Option<&Path> {
        self.bag.as_ref().map(|b| b.base_folder.as_path())
    }

    /// Open a bag and resolve its files.
    ///
    /// A prior index, if present and parseable, only supplies the file order
    /// and the storage plugin; its topics are not trusted. Repeated entries
    /// are dropped and data files it does not list are appended. Without an
    /// index the bag folder is listed. Fails with `StorageUnavailable` if the first
    /// file cannot be opened. On failure the reindexer is left `Closed`.
    pub fn open(&mut self, storage: &StorageOptions, record: &RecordOptions) -> Result<()> {
        if self.state == ReindexerState::Reindexing {
            return Err(ReindexError::InvalidState {
                expected: ReindexerState::Closed.as_str(),
                actual: self.state.as_str(),
            });
        }
        self.state = ReindexerState::Closed;
        self.bag = None;

        let bag = self.open_bag(storage, record)?;

        info!(
            context = "Reindexer",
            uri = %bag.base_folder.display(),
            storage_id = %bag.storage_id,
            files = bag.files.len(),
            origin = bag.files.origin(),
            "Opened bag for reindexing"
        );

        self.bag = Some(bag);
        self.state = ReindexerState::Ready;
        Ok(())
    }

    /// Release the open bag.
    pub fn close(&mut self) {
        if self.state != ReindexerState::Reindexing {
            self.bag = None;
            self.state = ReindexerState::Closed;
        }
    }

    fn open_bag(&self, storage: &StorageOptions, record: &RecordOptions) -> Result<OpenBag> {
        let uri = storage.uri.as_path();
        if !uri.exists() {
            return Err(ReindexError::invalid_base_folder(uri, "does not exist"));
        }

        let single_file = uri.is_file().then(|| uri.to_path_buf());
        let base_folder = match &single_file {
            Some(file) => match file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
            None => uri.to_path_buf(),
        };

        let prior = match single_file {
            Some(_) => None,
            None => self.load_prior_index(&base_folder),
        };

        let storage_id = self.select_storage_id(
            storage,
            prior.as_ref(),
            single_file.as_deref(),
            &base_folder,
        )?;

        let files = match single_file {
            Some(file) => FileSource::Hinted(vec![file]),
            None => match prior.as_ref().filter(|p| !p.relative_file_paths.is_empty()) {
                Some(prior) => {
                    let hinted = resolve_relative_paths(
                        &base_folder,
                        &prior.relative_file_paths,
                        prior.version,
                    )?;
                    FileSource::Hinted(reconcile_hint(
                        hinted,
                        &self.data_files_on_disk(&base_folder, &storage_id),
                    ))
                }
                None => {
                    let extension = self.registry.extension_for(&storage_id).ok_or_else(|| {
                        ReindexError::StorageUnavailable {
                            path: base_folder.clone(),
                            reason: format!("no storage plugin registered for '{storage_id}'"),
                        }
                    })?;
                    FileSource::Discovered(discover_data_files(&base_folder, &extension)?)
                }
            },
        };

        let primary = files
            .paths()
            .first()
            .ok_or_else(|| ReindexError::NoDataFiles {
                uri: base_folder.clone(),
                extension: self.registry.extension_for(&storage_id).unwrap_or_default(),
            })?;
        // Opened only to prove the bag is readable; closed right away.
        self.registry
            .open_read_only(primary, &storage_id)
            .map_err(|e| ReindexError::StorageUnavailable {
                path: primary.clone(),
                reason: e.to_string(),
            })?;

        Ok(OpenBag {
            base_folder,
            storage_id,
            files,
            record: record.clone(),
            prior,
        })
    }

    /// Data files in the bag folder, or none if the listing fails.
    fn data_files_on_disk(&self, base_folder: &Path, storage_id: &str) -> Vec<PathBuf> {
        let Some(extension) = self.registry.extension_for(storage_id) else {
            return Vec::new();
        };
        match discover_data_files(base_folder, &extension) {
            Ok(files) => files,
            Err(e) => {
                debug!(
                    context = "Reindexer",
                    uri = %base_folder.display(),
                    error = %e,
                    "No data files found next to the prior index"
                );
                Vec::new()
            }
        }
    }

    fn load_prior_index(&self, base_folder: &Path) -> Option<BagIndex> {
        if !self.metadata_io.metadata_file_exists(base_folder) {
            debug!(
                context = "Reindexer",
                uri = %base_folder.display(),
                "No prior index, discovering files"
            );
            return None;
        }
        match self.metadata_io.read_metadata(base_folder) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(
                    context = "Reindexer",
                    uri = %base_folder.display(),
                    error = %e,
                    "Ignoring unreadable prior index, discovering files"
                );
                None
            }
        }
    }

    fn select_storage_id(
        &self,
        storage: &StorageOptions,
        prior: Option<&BagIndex>,
        single_file: Option<&Path>,
        base_folder: &Path,
    ) -> Result<String> {
        if !storage.infers_storage_id() {
            return Ok(storage.storage_id.trim().to_string());
        }

        if let Some(id) = prior
            .map(|p| p.storage_identifier.as_str())
            .filter(|id| self.registry.contains(id))
        {
            return Ok(id.to_string());
        }

        let detected = match single_file {
            Some(file) => detect_storage_id(file)
                .filter(|id| self.registry.contains(id))
                .map(str::to_string)
                .or_else(|| {
                    file.extension()
                        .and_then(|e| e.to_str())
                        .and_then(|ext| self.registry.storage_id_for_extension(ext))
                }),
            None => detect_bag_storage(base_folder, &self.registry),
        };

        detected.ok_or_else(|| match single_file {
            Some(file) => ReindexError::StorageUnavailable {
                path: file.to_path_buf(),
                reason: "could not infer the storage plugin; pass a storage id".to_string(),
            },
            // Nothing in the folder belongs to any registered plugin.
            None => ReindexError::NoDataFiles {
                uri: base_folder.to_path_buf(),
                extension: self.registry.extensions().join(", ."),
            },
        })
    }

    /// Rebuild and persist the index of the open bag.
    ///
    /// Requires a successful `open()`. Files that cannot be opened or read
    /// are skipped and listed in the report; the run fails with
    /// `ReindexFailed` only if every file is skipped. Topic definition
    /// conflicts, cancellation and the deadline abort the run and nothing
    /// is written.
    pub fn reindex(&mut self) -> Result<ReindexReport> {
        match self.state {
            ReindexerState::Ready => {}
            ReindexerState::Closed => return Err(ReindexError::NotOpen),
            other => {
                return Err(ReindexError::InvalidState {
                    expected: ReindexerState::Ready.as_str(),
                    actual: other.as_str(),
                })
            }
        }

        self.state = ReindexerState::Reindexing;
        let Some(bag) = self.bag.as_ref() else {
            self.state = ReindexerState::Closed;
            return Err(ReindexError::NotOpen);
        };
        let result = self.run(bag);
        self.state = match result {
            Ok(_) => ReindexerState::Done,
            Err(_) => ReindexerState::Failed,
        };
        result
    }

    fn run(&self, bag: &OpenBag) -> Result<ReindexReport> {
        let start = Instant::now();
        let deadline = self.options.timeout().map(|t| start + t);
        let extractor = FileMetadataExtractor::new(Arc::clone(&self.registry))
            .with_prefer_embedded(self.options.prefer_embedded_metadata);

        let outcomes = if self.options.effective_workers() > 1 && bag.files.len() > 1 {
            self.extract_parallel(&extractor, bag, deadline)?
        } else {
            self.extract_sequential(&extractor, bag, deadline)?
        };

        let mut extracted: Vec<FileMetadata> = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (path, outcome) in bag.files.paths().iter().zip(outcomes) {
            match outcome {
                Ok(metadata) => extracted.push(metadata),
                Err(e) if e.is_per_file() => {
                    warn!(
                        context = "Reindexer",
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable file"
                    );
                    skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if extracted.is_empty() {
            return Err(ReindexError::ReindexFailed { failures: skipped });
        }

        let index = MetadataAggregator::aggregate(&bag.base_folder, &bag.storage_id, &extracted)?;
        check_record_options(&index, &bag.record);

        let metadata_path = if self.options.dry_run {
            info!(
                context = "Reindexer",
                uri = %bag.base_folder.display(),
                "Dry run, index not written"
            );
            None
        } else {
            Some(self.metadata_io.write_metadata(&bag.base_folder, &index)?)
        };

        info!(
            context = "Reindexer",
            uri = %bag.base_folder.display(),
            processed = extracted.len(),
            skipped = skipped.len(),
            topics = index.topics.len(),
            messages = index.message_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Reindex complete"
        );

        Ok(ReindexReport {
            processed: extracted.into_iter().map(|m| m.path).collect(),
            index,
            skipped,
            metadata_path,
            prior_message_count: bag.prior.as_ref().map(|p| p.message_count),
        })
    }

    fn extract_sequential(
        &self,
        extractor: &FileMetadataExtractor,
        bag: &OpenBag,
        deadline: Option<Instant>,
    ) -> Result<Vec<Result<FileMetadata>>> {
        let total = bag.files.len();
        let mut outcomes = Vec::with_capacity(total);
        for (i, path) in bag.files.paths().iter().enumerate() {
            self.check_interrupted(deadline, i)?;
            outcomes.push(extractor.extract(path, &bag.storage_id));
            self.report_progress(i, total, path);
        }
        self.check_interrupted(deadline, total)?;
        Ok(outcomes)
    }

    fn extract_parallel(
        &self,
        extractor: &FileMetadataExtractor,
        bag: &OpenBag,
        deadline: Option<Instant>,
    ) -> Result<Vec<Result<FileMetadata>>> {
        let workers = self.options.effective_workers();
        let total = bag.files.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("reindex-worker-{index}"))
            .build()
            .map_err(|e| ReindexError::InvalidConfig {
                reason: format!("failed to create worker pool: {e}"),
            })?;

        debug!(
            context = "Reindexer",
            workers,
            files = total,
            "Extracting in parallel"
        );

        // Slots stay in input order; interrupted files are left as None.
        let slots: Vec<Option<Result<FileMetadata>>> = pool.install(|| {
            bag.files
                .paths()
                .par_iter()
                .enumerate()
                .map(|(i, path)| {
                    if self.interrupted(deadline).is_some() {
                        return None;
                    }
                    let outcome = extractor.extract(path, &bag.storage_id);
                    self.report_progress(i, total, path);
                    Some(outcome)
                })
                .collect()
        });

        let finished = slots.iter().filter(|s| s.is_some()).count();
        self.check_interrupted(deadline, finished)?;

        Ok(slots.into_iter().flatten().collect())
    }

    fn interrupted(&self, deadline: Option<Instant>) -> Option<Interruption> {
        if self.cancel.is_cancelled() {
            Some(Interruption::Cancelled)
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Interruption::DeadlineExceeded)
        } else {
            None
        }
    }

    fn check_interrupted(&self, deadline: Option<Instant>, processed: usize) -> Result<()> {
        match self.interrupted(deadline) {
            Some(interruption) => {
                warn!(
                    context = "Reindexer",
                    processed,
                    reason = ?interruption,
                    "Reindex interrupted, discarding partial results"
                );
                Err(interruption.into_error(processed))
            }
            None => Ok(()),
        }
    }

    fn report_progress(&self, index: usize, total: usize, path: &Path) {
        if let Some(progress) = &self.progress {
            progress(index, total, path);
        }
    }
}

impl fmt::Debug for Reindexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reindexer")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("bag", &self.bag)
            .finish_non_exhaustive()
    }
}

/// Warn about topics that contradict the recording configuration.
fn check_record_options(index: &BagIndex, record: &RecordOptions) {
    let expected = record.rmw_serialization_format.as_str();
    if !expected.is_empty() {
        for (name, topic) in &index.topics {
            if topic.serialization_format != expected {
                warn!(
                    context = "Reindexer",
                    topic = %name,
                    found = %topic.serialization_format,
                    expected,
                    "Topic serialization format differs from the recording configuration"
                );
            }
        }
    }
    for name in &record.topics {
        if !index.has_topic(name) {
            warn!(
                context = "Reindexer",
                topic = %name,
                "Requested topic has no data in the bag"
            );
        }
    }
}

/// Convenience for a single run with default plugins.
pub fn reindex_bag(storage: &StorageOptions, options: ReindexOptions) -> Result<ReindexReport> {
    let mut reindexer = ReindexerBuilder::new().options(options).build();
    reindexer.open(storage, &RecordOptions::default())?;
    reindexer.reindex()
}
