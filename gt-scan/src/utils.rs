use anyhow::Context;
use hashbrown::{HashMap, HashSet};
use noodles::bam;

use std::path::PathBuf;

use crate::core::aggregate::FragmentAggregator;

/// Reads an allow-list of transcript ids, one per line
pub fn read_allowlist(path: &PathBuf) -> anyhow::Result<HashSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read allow-list {}", path.display()))?;

    let list = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect::<HashSet<_>>();

    log::info!("Allow-list holds {} transcript ids", list.len());

    Ok(list)
}

/// Streams one BAM file through an aggregator; returns the transcript
/// length catalog taken from the file's header
pub fn scan_channel(
    path: &PathBuf,
    aggregator: &mut FragmentAggregator,
) -> anyhow::Result<HashMap<String, u64>> {
    let mut reader = bam::io::reader::Builder::default()
        .build_from_path(path)
        .with_context(|| format!("could not open file: {}", path.display()))?;

    let header = reader
        .read_header()
        .with_context(|| format!("could not read header for file: {}", path.display()))?;

    let reference_names = header
        .reference_sequences()
        .iter()
        .map(|(name, _)| name.to_string())
        .collect::<Vec<_>>();

    let transcript_lengths = header
        .reference_sequences()
        .iter()
        .map(|(name, sequence)| (name.to_string(), sequence.length().get() as u64))
        .collect::<HashMap<_, _>>();

    aggregator.consume(reader.record_bufs(&header), &reference_names)?;

    Ok(transcript_lengths)
}
