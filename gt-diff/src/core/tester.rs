//! Per-transcript and genome-wide differential testing
//!
//! The tester compares two pooled replicate groups over one shared
//! transcriptome. The genome-wide pass runs first over the full pooled
//! tail-run populations; the per-transcript loop is sharded with rayon
//! (each worker owns disjoint transcript indices and every result slot
//! is written exactly once). Unmet statistical preconditions degrade
//! to missing cells; only a transcriptome mismatch between the two
//! groups aborts the run.

use anyhow::bail;
use dashmap::DashMap;
use rayon::prelude::*;

use config::get_progress_bar;

use crate::core::group::DataGroup;
use crate::core::results::{Column, Provenance, ResultStore};
use crate::stats::{chi2_sf1, mann_whitney_u, mean};

pub struct Tester {
    a: DataGroup,
    b: DataGroup,
    min_size: usize,
    penalty: f64,
    run_lrt: bool,
}

impl Tester {
    /// Fatal if the two groups disagree on the transcriptome: every
    /// result row index depends on one shared ordering.
    pub fn new(
        a: DataGroup,
        b: DataGroup,
        min_size: usize,
        penalty: f64,
        run_lrt: bool,
    ) -> anyhow::Result<Self> {
        if a.transcripts() != b.transcripts() {
            bail!(
                "groups {} and {} disagree on the transcript catalog",
                a.name(),
                b.name()
            );
        }

        for transcript in a.transcripts() {
            if a.transcript_length(transcript) != b.transcript_length(transcript) {
                bail!(
                    "groups {} and {} disagree on the length of {}",
                    a.name(),
                    b.name(),
                    transcript
                );
            }
        }

        Ok(Self {
            a,
            b,
            min_size,
            penalty,
            run_lrt,
        })
    }

    pub fn run(&self) -> ResultStore {
        let provenance = Provenance {
            group_a: self.a.name().to_string(),
            group_b: self.b.name().to_string(),
            files_a: self.a.files(),
            files_b: self.b.files(),
        };

        let transcripts = self.a.transcripts().to_vec();
        let mut store = ResultStore::new(transcripts, provenance);

        self.run_global(&mut store);

        let outcomes: DashMap<usize, Vec<(Column, f64)>> = DashMap::new();
        let pb = get_progress_bar(store.len() as u64, "Testing transcripts...");

        self.a
            .transcripts()
            .par_iter()
            .enumerate()
            .for_each(|(row, transcript)| {
                outcomes.insert(row, self.test_transcript(transcript));
                pb.inc(1);
            });

        pb.finish_and_clear();

        for (row, cells) in outcomes {
            for (column, value) in cells {
                store.set(row, column, value);
            }
        }

        store.correct_rank_p();

        store
    }

    /// Genome-wide rank comparison over the full pooled populations
    fn run_global(&self, store: &mut ResultStore) {
        let pooled_a = self.a.pooled_tail_runs();
        let pooled_b = self.b.pooled_tail_runs();

        let mean_diff = match (mean(&pooled_a), mean(&pooled_b)) {
            (Some(mean_a), Some(mean_b)) => mean_b - mean_a,
            _ => f64::NAN,
        };

        let (statistic, p_value) = if pooled_a.len() > self.min_size
            && pooled_b.len() > self.min_size
        {
            match mann_whitney_u(&pooled_a, &pooled_b) {
                Some(result) => (result.statistic, result.p_value),
                None => (f64::NAN, f64::NAN),
            }
        } else {
            (f64::NAN, f64::NAN)
        };

        log::info!(
            "Genome-wide test: statistic {:.3}, p {:.3e}, mean difference {:.3}",
            statistic,
            p_value,
            mean_diff
        );

        store.set_global(statistic, p_value, mean_diff);
    }

    fn test_transcript(&self, transcript: &str) -> Vec<(Column, f64)> {
        let mut cells = Vec::new();

        let runs_a = self.a.tail_runs(transcript);
        let runs_b = self.b.tail_runs(transcript);

        // means first, with no minimum size
        let mean_a = mean(&runs_a);
        let mean_b = mean(&runs_b);

        if let Some(value) = mean_a {
            cells.push((Column::MeanA, value));
        }
        if let Some(value) = mean_b {
            cells.push((Column::MeanB, value));
        }
        if let (Some(mean_a), Some(mean_b)) = (mean_a, mean_b) {
            cells.push((Column::MeanDiff, mean_b - mean_a));
        }

        // rank test only on samples of at least min_size + 1
        if runs_a.len() > self.min_size && runs_b.len() > self.min_size {
            if let Some(result) = mann_whitney_u(&runs_a, &runs_b) {
                cells.push((Column::RankStatistic, result.statistic));
                cells.push((Column::PValue, result.p_value));
            }
        }

        if self.run_lrt {
            if let Some((statistic, p_value, theta_diff)) = self.likelihood_ratio(transcript) {
                cells.push((Column::LrtStatistic, statistic));
                cells.push((Column::LrtPValue, p_value));
                cells.push((Column::ThetaDiff, theta_diff));
            }
        }

        // side channel for downstream correlation analysis
        cells.push((Column::TailCountA, self.a.tail_expression(transcript) as f64));
        cells.push((Column::TailCountB, self.b.tail_expression(transcript) as f64));
        cells.push((
            Column::BackgroundCountA,
            self.a.background_expression(transcript) as f64,
        ));
        cells.push((
            Column::BackgroundCountB,
            self.b.background_expression(transcript) as f64,
        ));

        cells
    }

    /// Likelihood-ratio companion test; None when any profile lacks a
    /// unique maximizer (the tie is not broken arbitrarily)
    fn likelihood_ratio(&self, transcript: &str) -> Option<(f64, f64, f64)> {
        let end = self.a.transcript_length(transcript)
            + self
                .a
                .max_fragment_size()
                .max(self.b.max_fragment_size());

        if end == 0 {
            return None;
        }

        let profile_a = self.a.profile(transcript, end, self.penalty);
        let profile_b = self.b.profile(transcript, end, self.penalty);

        let joint = profile_a
            .iter()
            .zip(profile_b.iter())
            .map(|(a, b)| a + b)
            .collect::<Vec<_>>();

        let (theta_a, max_a) = unique_max(&profile_a)?;
        let (theta_b, max_b) = unique_max(&profile_b)?;
        let (_, max_joint) = unique_max(&joint)?;

        let statistic = -2.0 * max_joint + 2.0 * (max_a + max_b);
        let p_value = chi2_sf1(statistic);

        Some((statistic, p_value, theta_b as f64 - theta_a as f64))
    }
}

/// Argmax with a uniqueness guard: None when the maximum is attained
/// more than once
fn unique_max(profile: &[f64]) -> Option<(usize, f64)> {
    let mut best = f64::NEG_INFINITY;
    let mut best_index = 0;
    let mut count = 0;

    for (index, &value) in profile.iter().enumerate() {
        if value > best {
            best = value;
            best_index = index;
            count = 1;
        } else if value == best {
            count += 1;
        }
    }

    if count == 1 {
        Some((best_index, best))
    } else {
        None
    }
}
