// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Builder pattern for creating reindexers.
//!
//! The `ReindexerBuilder` provides a fluent API for choosing plugins, the
//! index format and run options before a bag is opened.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{CancellationToken, ReindexConfig, ReindexOptions};
use crate::io::metadata_io::{MetadataIo, YamlMetadataIo};
use crate::io::registry::StorageRegistry;

use super::{ProgressCallback, Reindexer};

/// Builder for [`Reindexer`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use roboindex::ReindexerBuilder;
///
/// // Defaults: built-in plugins, metadata.yaml, sequential extraction
/// let reindexer = ReindexerBuilder::new().build();
///
/// // Four workers, always scan, give up after ten minutes
/// let reindexer = ReindexerBuilder::new()
///     .workers(4)
///     .full_scan()
///     .timeout(Duration::from_secs(600))
///     .build();
/// ```
#[derive(Default)]
pub struct ReindexerBuilder {
    registry: Option<Arc<StorageRegistry>>,
    metadata_io: Option<Box<dyn MetadataIo>>,
    options: ReindexOptions,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl ReindexerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `[reindex]` table of a config.
    pub fn from_config(config: &ReindexConfig) -> Self {
        Self::new().options(config.reindex.clone())
    }

    /// Use a custom plugin registry instead of the built-in plugins.
    pub fn registry(mut self, registry: Arc<StorageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom index reader/writer instead of `metadata.yaml`.
    pub fn metadata_io(mut self, metadata_io: Box<dyn MetadataIo>) -> Self {
        self.metadata_io = Some(metadata_io);
        self
    }

    /// Replace all run options.
    pub fn options(mut self, options: ReindexOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the number of extraction threads.
    ///
    /// 0 uses one thread per CPU; 1 extracts sequentially.
    pub fn workers(mut self, workers: usize) -> Self {
        self.options.workers = workers;
        self
    }

    /// Ignore embedded metadata and scan every file.
    pub fn full_scan(mut self) -> Self {
        self.options.prefer_embedded_metadata = false;
        self
    }

    /// Build the index without writing it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    /// Fail with `DeadlineExceeded` once this much time has passed.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Share a cancellation token with the caller.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get called after every file.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize, &Path) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Build the reindexer. It starts `Closed`.
    pub fn build(self) -> Reindexer {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(StorageRegistry::with_defaults()));
        let metadata_io = self
            .metadata_io
            .unwrap_or_else(|| Box::new(YamlMetadataIo));
        Reindexer::from_parts(registry, metadata_io, self.options, self.cancel, self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reindex::ReindexerState;

    #[test]
    fn test_builder_default() {
        let reindexer = ReindexerBuilder::new().build();
        assert_eq!(reindexer.state(), ReindexerState::Closed);
        assert_eq!(reindexer.options(), &ReindexOptions::default());
        assert!(reindexer.files().is_none());
    }

    #[test]
    fn test_builder_fluent() {
        let reindexer = ReindexerBuilder::new()
            .workers(4)
            .full_scan()
            .dry_run(true)
            .timeout(Duration::from_secs(9))
            .build();

        let options = reindexer.options();
        assert_eq!(options.workers, 4);
        assert!(!options.prefer_embedded_metadata);
        assert!(options.dry_run);
        assert_eq!(options.timeout(), Some(Duration::from_secs(9)));
    }

    #[test]
    fn test_builder_from_config() {
        let config = ReindexConfig::from_toml_str("[reindex]\nworkers = 2\ndry_run = true\n").unwrap();
        let reindexer = ReindexerBuilder::from_config(&config).build();
        assert_eq!(reindexer.options().workers, 2);
        assert!(reindexer.options().dry_run);
    }

    #[test]
    fn test_shared_cancellation_token() {
        let token = CancellationToken::new();
        let reindexer = ReindexerBuilder::new()
            .cancellation_token(token.clone())
            .build();
        token.cancel();
        assert!(reindexer.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_reindex_before_open() {
        let mut reindexer = ReindexerBuilder::new().build();
        let err = reindexer.reindex().err().unwrap();
        assert!(matches!(err, crate::ReindexError::NotOpen));
        assert_eq!(reindexer.state(), ReindexerState::Closed);
    }
}
