// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Turning index hints or a directory listing into an ordered file list.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::{ReindexError, Result};

/// First index version whose relative paths are rooted at the bag folder.
///
/// Older indexes prefixed every path with the bag folder's own name.
pub const BAG_RELATIVE_PATHS_VERSION: u32 = 4;

/// Ordered data files of a bag, tagged by where the order came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Order taken from a prior index or named by the caller
    Hinted(Vec<PathBuf>),
    /// Order produced by listing the bag folder
    Discovered(Vec<PathBuf>),
}

impl FileSource {
    /// The files, in processing order.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            FileSource::Hinted(paths) | FileSource::Discovered(paths) => paths,
        }
    }

    /// Consume into the file list.
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            FileSource::Hinted(paths) | FileSource::Discovered(paths) => paths,
        }
    }

    /// Whether the order was supplied rather than discovered.
    pub fn is_hinted(&self) -> bool {
        matches!(self, FileSource::Hinted(_))
    }

    /// Short label for logs.
    pub fn origin(&self) -> &'static str {
        match self {
            FileSource::Hinted(_) => "hint",
            FileSource::Discovered(_) => "discovery",
        }
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.paths().len()
    }

    /// Check if there are no files.
    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }
}

/// Resolve index file references to absolute paths.
///
/// For `version < 4` relative entries are joined to the parent of
/// `base_folder`; otherwise to `base_folder` itself. Absolute entries pass
/// through. Files are not checked for existence here.
pub fn resolve_relative_paths<S: AsRef<str>>(
    base_folder: &Path,
    relative_files: &[S],
    version: u32,
) -> Result<Vec<PathBuf>> {
    check_base_folder(base_folder)?;

    let root = if version < BAG_RELATIVE_PATHS_VERSION {
        // A relative base folder like "bag" has an empty parent; joining
        // onto an empty path keeps the entries relative to the working
        // directory without a "./" prefix.
        base_folder
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    } else {
        base_folder.to_path_buf()
    };

    Ok(relative_files
        .iter()
        .map(|file| {
            let path = Path::new(file.as_ref());
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            }
        })
        .collect())
}

/// List the data files of a bag folder.
///
/// Non-recursive; keeps regular files whose extension equals `extension`
/// (case-sensitive, leading dot optional) and sorts them by file name.
/// Names are assumed to sort chronologically, which holds for the
/// `<bag>_<n>` scheme only while every `n` has the same number of digits.
pub fn discover_data_files(bag_uri: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    check_base_folder(bag_uri)?;
    let extension = extension.trim_start_matches('.');

    let entries = fs::read_dir(bag_uri)
        .map_err(|e| ReindexError::io(format!("listing {}", bag_uri.display()), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| ReindexError::io(format!("listing {}", bag_uri.display()), e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(ReindexError::NoDataFiles {
            uri: bag_uri.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!(
        context = "discover_data_files",
        uri = %bag_uri.display(),
        extension,
        count = files.len(),
        "Discovered data files"
    );

    Ok(files)
}

/// Merge an index's file order with the data files actually on disk.
///
/// Keeps the hinted order, drops repeated entries (first one wins) and
/// appends files found on disk but missing from the hint, in discovery
/// order. Paths are compared after canonicalization when the file exists.
pub fn reconcile_hint(hinted: Vec<PathBuf>, on_disk: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(hinted.len().max(on_disk.len()));

    for path in hinted {
        if seen.insert(identity(&path)) {
            files.push(path);
        } else {
            warn!(
                context = "reconcile_hint",
                path = %path.display(),
                "Index lists a file more than once, keeping the first entry"
            );
        }
    }

    for path in on_disk {
        if seen.insert(identity(path)) {
            warn!(
                context = "reconcile_hint",
                path = %path.display(),
                "Data file missing from the index, appending it"
            );
            files.push(path.clone());
        }
    }

    files
}

fn identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
}

/// Drop `.` components so `./bag/x` and `bag/x` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Express `path` relative to `base_folder` for the written index.
///
/// Paths outside the bag folder are kept as they are.
pub fn relative_to(base_folder: &Path, path: &Path) -> String {
    let base = normalize(base_folder);
    let normalized = normalize(path);
    match normalized.strip_prefix(&base) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

fn check_base_folder(base_folder: &Path) -> Result<()> {
    if !base_folder.exists() {
        return Err(ReindexError::invalid_base_folder(
            base_folder,
            "does not exist",
        ));
    }
    if !base_folder.is_dir() {
        return Err(ReindexError::invalid_base_folder(
            base_folder,
            "is not a directory",
        ));
    }
    Ok(())
}
