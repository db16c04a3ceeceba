// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Roboindex CLI
//!
//! Rebuild and inspect rosbag2 indexes.
//!
//! ## Usage
//!
//! ```sh
//! # Rebuild metadata.yaml from the data files
//! roboindex reindex /data/bags/run_42
//!
//! # Force the plugin, use four workers, always scan
//! roboindex reindex /data/bags/run_42 -s sqlite3 -j 4 --scan
//!
//! # See what would be written without touching the bag
//! roboindex reindex /data/bags/run_42 --dry-run --json
//!
//! # Show the current index
//! roboindex inspect /data/bags/run_42
//! ```

mod cmd;
mod common;

use std::process;

use clap::{ArgAction, Parser, Subcommand};
use cmd::{InspectCmd, ReindexCmd};
use common::Result;

/// Roboindex - rosbag2 index recovery
///
/// Rebuilds a bag's metadata.yaml by scanning its data files.
#[derive(Parser, Clone)]
#[command(name = "roboindex")]
#[command(about = "Rebuild and inspect rosbag2 bag indexes", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Rebuild the index of a bag from its data files
    Reindex(ReindexCmd),

    /// Print the existing index of a bag
    Inspect(InspectCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose);

    match cli.command {
        Commands::Reindex(cmd) => cmd.run(),
        Commands::Inspect(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
