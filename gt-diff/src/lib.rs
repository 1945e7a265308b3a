//! Testing stage of the gtail-tools pipeline
//!
//! gt-diff consumes the per-replicate snapshots written by gt-scan,
//! pools them into two treatment groups and tests every transcript of
//! the shared transcriptome for a shift in tail-run length, alongside
//! one genome-wide comparison. The output is a fixed-schema table with
//! one row per transcript; missing cells mark transcripts where a
//! statistical precondition was not met, never a truncated table.

pub mod cli;
pub mod core;
pub mod stats;
pub mod utils;

use std::path::PathBuf;

use crate::cli::DiffArgs;
use crate::core::dataset::PmfMode;
use crate::core::tester::Tester;
use crate::utils::load_group;

/// Runs the whole comparison and writes the result table;
/// returns the table path
pub fn diff(args: DiffArgs) -> anyhow::Result<PathBuf> {
    let mode = if args.fit_lognormal {
        PmfMode::LogNormal
    } else {
        PmfMode::Empirical
    };

    let group_a = load_group(&args.name_a, &args.group_a, mode)?;
    let group_b = load_group(&args.name_b, &args.group_b, mode)?;

    let tester = Tester::new(group_a, group_b, args.min_size, args.penalty, args.lrt)?;
    let store = tester.run();

    log::info!(
        "{} of {} transcripts below alpha {} after correction",
        store.significant(args.alpha),
        store.len(),
        args.alpha
    );

    let path = args.outdir.join(config::RESULTS);
    store.export(&path)?;

    Ok(path)
}
