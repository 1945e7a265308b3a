//! Aggregation stage of the gtail-tools pipeline
//!
//! This module turns one replicate's pair of name-sorted BAM files
//! (the G-tail library and the NVTR background library) into a single
//! persisted snapshot of per-transcript aggregates: anchor-position
//! counts, tail-run histograms, the genome-wide fragment-size
//! histogram and the mapping-quality diagnostics. The snapshot is the
//! hand-off artifact consumed by gt-diff.

pub mod cli;
pub mod core;
pub mod utils;

use std::path::PathBuf;

use config::Snapshot;

use crate::cli::ScanArgs;
use crate::core::aggregate::{Channel, FragmentAggregator};
use crate::core::classify::ReadClassifier;
use crate::core::tail::TailRunMeasurer;
use crate::utils::{read_allowlist, scan_channel};

/// Runs the whole aggregation pass and writes the snapshot;
/// returns the snapshot path
pub fn scan(args: ScanArgs) -> anyhow::Result<PathBuf> {
    let allowlist = args.allowlist.as_ref().map(read_allowlist).transpose()?;

    let classifier = ReadClassifier::new(args.window, args.min_tag, args.max_ambiguous);
    let measurer = TailRunMeasurer::new(args.tolerance);

    let mut gtail = FragmentAggregator::new(
        Channel::Tail,
        classifier,
        measurer,
        args.min_mapq,
        allowlist.clone(),
    );
    let mut nvtr = FragmentAggregator::new(
        Channel::Background,
        classifier,
        measurer,
        args.min_mapq,
        allowlist,
    );

    log::info!("Scanning G-tail library: {}", args.gtail.display());
    let g_lengths = scan_channel(&args.gtail, &mut gtail)?;
    gtail.log_summary("g-tail");

    log::info!("Scanning NVTR library: {}", args.nvtr.display());
    let n_lengths = scan_channel(&args.nvtr, &mut nvtr)?;
    nvtr.log_summary("nvtr");

    if g_lengths != n_lengths {
        anyhow::bail!(
            "reference catalogs differ between {} and {}",
            args.gtail.display(),
            args.nvtr.display()
        );
    }

    let snapshot = Snapshot {
        name: args.name.clone(),
        g: gtail.into_tail_channel(args.gtail.clone()),
        n: nvtr.into_background_channel(args.nvtr.clone()),
        transcript_lengths: g_lengths,
    };

    let path = args
        .outdir
        .join(format!("{}.{}", args.name, config::SNAPSHOT_SUFFIX));
    snapshot.write(&path)?;

    Ok(path)
}
