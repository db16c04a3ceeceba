// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::io::IsTerminal as _;
use std::path::Path;
use std::time::Duration;

use roboindex::BagIndex;
use tracing_subscriber::EnvFilter;

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Layout of the per-file progress bar; the prefix names the bag.
const PROGRESS_TEMPLATE: &str =
    "{prefix:.bold} {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";

/// Install the tracing subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks warn, info or debug.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Render a bag duration in nanoseconds, coarsening the unit as it grows.
pub fn format_duration(nanos: u64) -> String {
    let span = Duration::from_nanos(nanos);
    match span.as_secs() {
        0 => format!("{}ms", span.subsec_millis()),
        s @ 1..=59 => format!("{s}.{:03}s", span.subsec_millis()),
        s @ 60..=3599 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, s % 3600 / 60),
    }
}

/// Format a timestamp in nanoseconds to human-readable string.
pub fn format_timestamp(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let subsec = (nanos % 1_000_000_000) as u32;
    let datetime = chrono::DateTime::<chrono::Utc>::from_timestamp(secs as i64, subsec);

    match datetime {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{} ns", nanos),
    }
}

/// Print an index as a human-readable summary.
pub fn print_index(index: &BagIndex) {
    println!("Version:       {}", index.version);
    println!("Storage:       {}", index.storage_identifier);
    println!("Files:         {}", index.relative_file_paths.len());
    println!("Messages:      {}", index.message_count);
    if index.message_count > 0 {
        println!("Start:         {}", format_timestamp(index.starting_time));
        println!("End:           {}", format_timestamp(index.end_time()));
        println!("Duration:      {}", format_duration(index.duration));
    }
    if !index.compression_format.is_empty() {
        println!(
            "Compression:   {} ({})",
            index.compression_format, index.compression_mode
        );
    }

    if !index.topics.is_empty() {
        let width = index.topics.keys().map(String::len).max().unwrap_or(0);
        println!();
        println!("Topics ({}):", index.topics.len());
        for (name, topic) in &index.topics {
            println!(
                "  {:<width$}  {:>10}  {} [{}]",
                name,
                topic.message_count,
                topic.type_name,
                topic.serialization_format,
                width = width
            );
        }
    }

    if !index.files.is_empty() {
        println!();
        println!("Per-file:");
        for file in &index.files {
            println!(
                "  {}  {} msgs  {}",
                file.path,
                file.message_count,
                format_duration(file.duration)
            );
        }
    } else if !index.relative_file_paths.is_empty() {
        println!();
        println!("Files:");
        for path in &index.relative_file_paths {
            println!("  {}", path);
        }
    }
}

/// Progress bar wrapper for consistent progress reporting.
///
/// Hidden when stderr is not a terminal.
#[derive(Clone)]
pub struct ProgressBar {
    inner: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a new progress bar. The length is set by the first update.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let inner = if std::io::stderr().is_terminal() {
            let pb = indicatif::ProgressBar::new(0);
            if let Ok(style) = indicatif::ProgressStyle::with_template(PROGRESS_TEMPLATE) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_prefix(prefix);
            Some(pb)
        } else {
            None
        };

        Self { inner }
    }

    /// A bar that never draws.
    pub fn hidden() -> Self {
        Self { inner: None }
    }

    /// Count one finished file.
    pub fn advance(&self, total: usize, path: &Path) {
        if let Some(pb) = &self.inner {
            pb.set_length(total as u64);
            pb.inc(1);
            if let Some(name) = path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
        }
    }

    /// Finish the progress bar with a message.
    pub fn finish_with_message(&self, msg: String) {
        if let Some(pb) = &self.inner {
            pb.finish_with_message(msg);
        }
    }

    /// Remove the bar from the terminal.
    pub fn clear(&self) {
        if let Some(pb) = &self.inner {
            pb.finish_and_clear();
        }
    }
}
