// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Storage format detection using magic numbers.
//!
//! Used when the caller does not name a storage plugin and no prior index
//! records one. Magic numbers are checked first; the file extension is only
//! consulted when the header is unrecognized.
//!
//! # Example
//!
//! ```rust,no_run
//! use roboindex::io::detection::detect_storage_id;
//!
//! assert_eq!(detect_storage_id("bag/bag_0.db3"), Some("sqlite3"));
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::registry::StorageRegistry;

/// SQLite 3 database header.
const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

/// MCAP leading magic.
const MCAP_MAGIC: &[u8] = b"\x89MCAP0\r\n";

/// ROS1 bag version line.
const ROSBAG_MAGIC: &[u8] = b"#ROSBAG V2.0";

/// Detect the storage plugin for a file from its header bytes.
///
/// Returns the identifier of a built-in plugin, or `None` if the header is
/// unreadable or unrecognized.
pub fn detect_storage_id<P: AsRef<Path>>(path: P) -> Option<&'static str> {
    let mut file = File::open(path.as_ref()).ok()?;
    let mut header = [0u8; 16];
    let n = file.read(&mut header).ok()?;
    storage_id_from_magic(&header[..n])
}

fn storage_id_from_magic(header: &[u8]) -> Option<&'static str> {
    if header.starts_with(SQLITE_MAGIC) {
        Some("sqlite3")
    } else if header.starts_with(MCAP_MAGIC) {
        Some("mcap")
    } else if header.starts_with(ROSBAG_MAGIC) {
        Some("bag")
    } else {
        None
    }
}

/// Infer the storage plugin of a bag directory.
///
/// Files are visited in name order; the first one whose magic number or
/// extension maps to a registered plugin decides.
pub fn detect_bag_storage(bag_dir: &Path, registry: &StorageRegistry) -> Option<String> {
    let mut files: Vec<_> = std::fs::read_dir(bag_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    for path in &files {
        if let Some(id) = detect_storage_id(path) {
            if registry.contains(id) {
                return Some(id.to_string());
            }
        }
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| registry.storage_id_for_extension(ext));
        if by_extension.is_some() {
            return by_extension;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_magic_numbers() {
        assert_eq!(storage_id_from_magic(b"SQLite format 3\0rest"), Some("sqlite3"));
        assert_eq!(storage_id_from_magic(b"\x89MCAP0\r\n\x01"), Some("mcap"));
        assert_eq!(storage_id_from_magic(b"#ROSBAG V2.0\n"), Some("bag"));
        assert_eq!(storage_id_from_magic(b"garbage"), None);
        assert_eq!(storage_id_from_magic(b""), None);
    }

    #[test]
    fn test_detect_storage_id_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "misnamed.bin", b"#ROSBAG V2.0\nrest");
        assert_eq!(detect_storage_id(&path), Some("bag"));
        assert_eq!(detect_storage_id(dir.path().join("missing.db3")), None);
    }

    #[test]
    fn test_detect_bag_storage_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "notes.txt", b"hello");
        write_file(dir.path(), "run_0.mcap", b"not really mcap");

        let registry = StorageRegistry::with_defaults();
        assert_eq!(
            detect_bag_storage(dir.path(), &registry),
            Some("mcap".to_string())
        );
    }

    #[test]
    fn test_detect_bag_storage_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StorageRegistry::with_defaults();
        assert_eq!(detect_bag_storage(dir.path(), &registry), None);
    }
}
