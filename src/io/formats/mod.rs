// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Built-in storage plugins.
//!
//! - `sqlite3` for rosbag2 `.db3` segments
//! - `mcap` for `.mcap` segments
//! - `bag` for ROS1 `.bag` files

pub mod bag;
pub mod mcap;
pub mod sqlite3;

pub use self::bag::{BagStorage, BagStorageFactory, BAG_STORAGE_ID};
pub use self::mcap::{McapStorage, McapStorageFactory, MCAP_STORAGE_ID};
pub use self::sqlite3::{Sqlite3Storage, Sqlite3StorageFactory, SQLITE3_STORAGE_ID};
