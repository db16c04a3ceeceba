// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - show the existing index of a bag.

use std::path::PathBuf;

use clap::Args;

use crate::common::{print_index, Result};
use roboindex::{MetadataIo, YamlMetadataIo};

/// Print a bag's index.
#[derive(Args, Clone, Debug)]
pub struct InspectCmd {
    /// Bag folder, or its metadata.yaml
    #[arg(value_name = "BAG")]
    bag: PathBuf,

    /// Print the index as JSON
    #[arg(long)]
    json: bool,
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        let bag_dir = if self.bag.is_file() {
            self.bag
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            self.bag.clone()
        };

        let io = YamlMetadataIo;
        if !io.metadata_file_exists(&bag_dir) {
            anyhow::bail!(
                "no index in {} (run `roboindex reindex` to create one)",
                bag_dir.display()
            );
        }
        let index = io.read_metadata(&bag_dir)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&index)?);
        } else {
            println!("=== {} ===", bag_dir.display());
            print_index(&index);
        }
        Ok(())
    }
}
