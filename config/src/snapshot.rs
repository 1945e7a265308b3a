//! Persisted per-replicate aggregate snapshot
//!
//! One snapshot is the hand-off artifact between the aggregation
//! stage (`gt-scan`) and the testing stage (`gt-diff`). Every field
//! is mandatory; a snapshot missing any of them fails to load, which
//! keeps Dataset construction honest about its inputs.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// transcript id -> (position -> count)
pub type AnchorCounts = HashMap<String, HashMap<u64, u64>>;

/// transcript id -> (tail-run length -> count)
pub type TailRunHistograms = HashMap<String, HashMap<u32, u64>>;

/// mapping quality -> count
pub type MapqHistogram = HashMap<u8, u64>;

/// Aggregates from the G-tail library of one replicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailChannel {
    pub file: PathBuf,
    pub anchor_counts: AnchorCounts,
    pub tail_run_histograms: TailRunHistograms,
    pub mapq_histogram: MapqHistogram,
}

/// Aggregates from the NVTR (background) library of one replicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundChannel {
    pub file: PathBuf,
    pub anchor_counts: AnchorCounts,
    pub fragment_size_histogram: HashMap<u64, u64>,
    pub mapq_histogram: MapqHistogram,
}

/// One replicate's persisted aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub g: TailChannel,
    pub n: BackgroundChannel,
    pub transcript_lengths: HashMap<String, u64>,
}

impl Snapshot {
    /// Writes the snapshot as JSON
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;

        log::info!(
            "Snapshot for replicate {} written to {}",
            self.name,
            path.as_ref().display()
        );

        Ok(())
    }

    /// Reads a snapshot back from JSON; errors on any missing field
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let snapshot = serde_json::from_reader(reader)?;

        Ok(snapshot)
    }

    /// Transcript ids of this replicate, sorted for stable comparisons
    pub fn transcript_ids(&self) -> Vec<&str> {
        let mut ids = self
            .transcript_lengths
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<_>>();
        ids.sort_unstable();

        ids
    }
}
