// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Reindexing MCAP bags written with the mcap crate.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use roboindex::io::formats::mcap::McapStorage;
use roboindex::{
    RecordOptions, ReindexError, ReindexOptions, Reindexer, StorageBackend, StorageOptions,
};

/// Write one segment with `count` messages on `/scan` and one on `/odom`.
fn write_segment(path: &Path, start: u64, count: u64) {
    let mut writer = mcap::Writer::new(BufWriter::new(File::create(path).unwrap())).unwrap();
    let scan_schema = writer
        .add_schema("sensor_msgs/msg/LaserScan", "ros2msg", b"float32[] ranges")
        .unwrap();
    let odom_schema = writer
        .add_schema("nav_msgs/msg/Odometry", "ros2msg", b"")
        .unwrap();

    let mut qos = BTreeMap::new();
    qos.insert(
        "offered_qos_profiles".to_string(),
        "- history: 1\n  depth: 10\n".to_string(),
    );
    let scan = writer.add_channel(scan_schema, "/scan", "cdr", &qos).unwrap();
    let odom = writer
        .add_channel(odom_schema, "/odom", "cdr", &BTreeMap::new())
        .unwrap();

    for k in 0..count {
        let header = mcap::records::MessageHeader {
            channel_id: scan,
            sequence: k as u32,
            log_time: start + k * 100,
            publish_time: start + k * 100,
        };
        writer.write_to_known_channel(&header, &[0u8; 8]).unwrap();
    }
    let header = mcap::records::MessageHeader {
        channel_id: odom,
        sequence: 0,
        log_time: start + 50,
        publish_time: start + 50,
    };
    writer.write_to_known_channel(&header, &[1u8; 4]).unwrap();

    writer.finish().unwrap();
}

fn mcap_bag(root: &Path) -> std::path::PathBuf {
    let bag = root.join("drive");
    std::fs::create_dir(&bag).unwrap();
    write_segment(&bag.join("drive_0.mcap"), 1_000, 4);
    write_segment(&bag.join("drive_1.mcap"), 9_000, 2);
    bag
}

#[test]
fn test_summary_statistics_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let bag = mcap_bag(dir.path());

    let storage = McapStorage::open(bag.join("drive_0.mcap")).unwrap();
    let meta = storage.get_metadata().unwrap().unwrap();
    assert_eq!(meta.message_count(), 5);
    assert_eq!(meta.topics["/scan"].message_count, 4);
    assert_eq!(meta.topics["/scan"].type_name, "sensor_msgs/msg/LaserScan");
    assert_eq!(
        meta.topics["/scan"].offered_qos_profiles,
        "- history: 1\n  depth: 10\n"
    );
    let bounds = meta.time_bounds.unwrap();
    assert_eq!((bounds.start, bounds.end), (1_000, 1_300));
}

#[test]
fn test_reindex_mcap_bag() {
    let dir = tempfile::tempdir().unwrap();
    let bag = mcap_bag(dir.path());

    let mut reindexer = Reindexer::builder().build();
    reindexer
        .open(&StorageOptions::new(&bag), &RecordOptions::default())
        .unwrap();
    assert_eq!(reindexer.storage_id(), Some("mcap"));

    let report = reindexer.reindex().unwrap();
    let index = &report.index;
    assert_eq!(index.storage_identifier, "mcap");
    assert_eq!(index.relative_file_paths, vec!["drive_0.mcap", "drive_1.mcap"]);
    assert_eq!(index.message_count, 8);
    assert_eq!(index.topics["/scan"].message_count, 6);
    assert_eq!(index.topics["/odom"].message_count, 2);
    assert_eq!(index.starting_time, 1_000);
    assert_eq!(index.duration, 8_100);
}

#[test]
fn test_scan_matches_summary() {
    let dir = tempfile::tempdir().unwrap();
    let bag = mcap_bag(dir.path());

    let run = |options: ReindexOptions| {
        let mut reindexer = Reindexer::builder().options(options).build();
        reindexer
            .open(&StorageOptions::new(&bag), &RecordOptions::default())
            .unwrap();
        reindexer.reindex().unwrap().index
    };

    let summary = run(ReindexOptions::default().with_dry_run(true));
    let scanned = run(ReindexOptions::default().with_dry_run(true).with_full_scan());
    assert_eq!(summary, scanned);
}

#[test]
fn test_sqlite_plugin_rejects_mcap_files() {
    let dir = tempfile::tempdir().unwrap();
    let bag = mcap_bag(dir.path());

    let mut reindexer = Reindexer::builder().build();
    let err = reindexer
        .open(
            &StorageOptions::new(bag.join("drive_0.mcap")).with_storage_id("sqlite3"),
            &RecordOptions::default(),
        )
        .err()
        .unwrap();
    assert!(matches!(err, ReindexError::StorageUnavailable { .. }));
}
