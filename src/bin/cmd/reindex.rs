// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Reindex command - rebuild a bag's index from its data files.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::Args;

use crate::common::{format_duration, print_index, ProgressBar, Result};
use roboindex::{ReindexConfig, ReindexOutcome, ReindexReport, ReindexerBuilder};

/// Rebuild the index of a bag.
#[derive(Args, Clone, Debug)]
pub struct ReindexCmd {
    /// Bag folder, or one data file inside it
    #[arg(value_name = "BAG")]
    bag: PathBuf,

    /// Storage plugin (sqlite3, mcap, bag); inferred when omitted
    #[arg(short = 's', long = "storage-id", value_name = "ID")]
    storage_id: Option<String>,

    /// Extraction threads (0 = one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Scan every message instead of trusting embedded file metadata
    #[arg(long)]
    scan: bool,

    /// Build the index but do not write it
    #[arg(long)]
    dry_run: bool,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// TOML config file; command-line flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl ReindexCmd {
    pub fn run(self) -> Result<()> {
        let config = self.load_config()?;

        let bar = if self.json {
            ProgressBar::hidden()
        } else {
            let name = config.storage.uri.file_name().unwrap_or_default();
            ProgressBar::new(name.to_string_lossy())
        };
        let progress = bar.clone();

        let mut reindexer = ReindexerBuilder::from_config(&config)
            .on_progress(move |_, total, path| progress.advance(total, path))
            .build();

        reindexer
            .open(&config.storage, &config.record)
            .with_context(|| format!("cannot open bag {}", config.storage.uri.display()))?;

        let report = match reindexer.reindex() {
            Ok(report) => report,
            Err(e) => {
                bar.clear();
                return Err(e.into());
            }
        };
        bar.finish_with_message(format!("{} file(s)", report.processed.len()));

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }

    fn load_config(&self) -> Result<ReindexConfig> {
        let mut config = match &self.config {
            Some(path) => ReindexConfig::from_toml_file(path)?,
            None => ReindexConfig::default(),
        };

        config.storage.uri = self.bag.clone();
        if let Some(storage_id) = &self.storage_id {
            config.storage.storage_id = storage_id.clone();
        }
        if let Some(workers) = self.workers {
            config.reindex.workers = workers;
        }
        if self.scan {
            config.reindex.prefer_embedded_metadata = false;
        }
        if self.dry_run {
            config.reindex.dry_run = true;
        }
        if let Some(secs) = self.timeout {
            config.reindex.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn print_report(report: &ReindexReport) {
    print_index(&report.index);
    println!();

    match report.outcome() {
        ReindexOutcome::Complete => {
            println!("Reindexed {} file(s)", report.processed.len());
        }
        ReindexOutcome::Partial => {
            println!(
                "Reindexed {} file(s), skipped {}:",
                report.processed.len(),
                report.skipped.len()
            );
            for skipped in &report.skipped {
                println!("  {}: {}", skipped.path.display(), skipped.reason);
            }
        }
    }

    if let Some(prior) = report.prior_message_count {
        let now = report.index.message_count;
        if prior != now {
            println!(
                "Previous index listed {} messages ({:+})",
                prior,
                now as i128 - prior as i128
            );
        }
    }

    match &report.metadata_path {
        Some(path) => println!("Wrote {}", path.display()),
        None => println!(
            "Dry run, nothing written (bag spans {})",
            format_duration(report.index.duration)
        ),
    }
}
