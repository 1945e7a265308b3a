//! Shared configuration for the gtail-tools pipeline
//!
//! This crate holds the universal constants for both pipeline
//! stages, the CLI validation plumbing and the persisted
//! per-replicate snapshot schema that `gt-scan` writes and
//! `gt-diff` consumes.

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::path::PathBuf;
use std::time::Duration;

pub mod snapshot;

pub use snapshot::{BackgroundChannel, Snapshot, TailChannel};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// signature parameters
pub const SIGNATURE_WINDOW: usize = 14;
pub const MIN_TAG_LENGTH: usize = 3;
pub const MAX_AMBIGUOUS: usize = 2;
pub const TAIL_TOLERANCE: u32 = 2;

// filtering parameters
pub const MIN_MAPQ: u8 = 13;

// testing parameters
pub const MIN_TEST_SIZE: usize = 10;
pub const ALPHA: f64 = 0.05;
pub const RANGE_PENALTY: f64 = 0.0;

// file names
pub const SNAPSHOT_SUFFIX: &str = "gtails.json";
pub const RESULTS: &str = "gtail_diff.tsv";

// tabular export
pub const NA: &str = "NA";

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        for (file, ext) in self.get_inputs() {
            validate(file, ext)?;
        }

        if self.get_allowlist().is_empty() {
            log::warn!("No allow-list provided. Keeping every reference...");
        } else {
            for file in self.get_allowlist() {
                validate(file, "txt")?;
            }
        }

        Ok(())
    }

    /// input files paired with their expected extension
    fn get_inputs(&self) -> Vec<(&PathBuf, &str)>;
    fn get_allowlist(&self) -> Vec<&PathBuf> {
        vec![]
    }
}

/// argument validation
pub fn validate(arg: &PathBuf, extension: &str) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    match arg.extension() {
        Some(ext) if ext == extension => (),
        _ => {
            return Err(CliError::InvalidInput(format!(
                "file {:?} is not a .{} file",
                arg, extension
            )))
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(CliError::InvalidInput(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}
