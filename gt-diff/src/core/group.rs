//! Replicate pooling
//!
//! A DataGroup merges the replicates of one treatment into a single
//! logical sample. Pooling, not averaging: the combined replicates buy
//! statistical power, at the cost of per-replicate weighting. Every
//! derived field is computed at construction; nothing is lazily cached.

use anyhow::bail;

use crate::core::dataset::Dataset;

#[derive(Debug, Clone)]
pub struct DataGroup {
    name: String,
    members: Vec<Dataset>,
    transcripts: Vec<String>,
    max_fragment_size: u64,
}

impl DataGroup {
    /// Fatal if the members do not share one identical transcript
    /// catalog: every downstream result row depends on that ordering.
    pub fn new(name: &str, members: Vec<Dataset>) -> anyhow::Result<Self> {
        let Some(first) = members.first() else {
            bail!("group {} has no members", name);
        };

        let transcripts = first
            .transcript_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>();

        for member in &members[1..] {
            if member.transcript_ids() != transcripts {
                bail!(
                    "replicates {} and {} disagree on the transcript catalog",
                    first.name(),
                    member.name()
                );
            }

            for id in &transcripts {
                if member.transcript_length(id) != first.transcript_length(id) {
                    bail!(
                        "replicates {} and {} disagree on the length of {}",
                        first.name(),
                        member.name(),
                        id
                    );
                }
            }
        }

        let max_fragment_size = members
            .iter()
            .map(|m| m.max_fragment_size())
            .max()
            .unwrap_or(0);

        log::info!(
            "Group {}: {} replicates, {} transcripts, max fragment size {}",
            name,
            members.len(),
            transcripts.len(),
            max_fragment_size
        );

        Ok(Self {
            name: name.to_string(),
            members,
            transcripts,
            max_fragment_size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transcripts(&self) -> &[String] {
        &self.transcripts
    }

    pub fn max_fragment_size(&self) -> u64 {
        self.max_fragment_size
    }

    pub fn transcript_length(&self, transcript: &str) -> u64 {
        // members agree by construction
        self.members[0].transcript_length(transcript).unwrap_or(0)
    }

    /// G-tail and NVTR source files of every member, in member order
    pub fn files(&self) -> Vec<String> {
        self.members
            .iter()
            .flat_map(|m| {
                let (g, n) = m.files();
                [g, n]
            })
            .collect()
    }

    /// Pooled tail runs: member expansions concatenated in member order
    pub fn tail_runs(&self, transcript: &str) -> Vec<u32> {
        self.members
            .iter()
            .flat_map(|m| m.tail_runs(transcript))
            .collect()
    }

    /// Pooled tail runs over every transcript of the shared catalog
    pub fn pooled_tail_runs(&self) -> Vec<u32> {
        self.transcripts
            .iter()
            .flat_map(|tx| self.tail_runs(tx))
            .collect()
    }

    pub fn tail_expression(&self, transcript: &str) -> u64 {
        self.members
            .iter()
            .map(|m| m.tail_expression(transcript))
            .sum()
    }

    pub fn background_expression(&self, transcript: &str) -> u64 {
        self.members
            .iter()
            .map(|m| m.background_expression(transcript))
            .sum()
    }

    /// Pooled likelihood profile: member profiles summed over [0, end)
    pub fn profile(&self, transcript: &str, end: u64, penalty: f64) -> Vec<f64> {
        let mut pooled = vec![0.0; end as usize];

        for member in &self.members {
            for (slot, value) in pooled
                .iter_mut()
                .zip(member.profile(transcript, end, penalty))
            {
                *slot += value;
            }
        }

        pooled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::PmfMode;
    use config::snapshot::{BackgroundChannel, Snapshot, TailChannel};
    use hashbrown::HashMap;
    use std::path::PathBuf;

    fn snapshot(name: &str, runs: &[(u32, u64)], transcripts: &[(&str, u64)]) -> Snapshot {
        let mut tail_run_histograms = config::snapshot::TailRunHistograms::default();
        let hist = tail_run_histograms.entry("tx1".to_string()).or_default();
        for &(run, count) in runs {
            hist.insert(run, count);
        }

        let tail_total: u64 = runs.iter().map(|&(_, c)| c).sum();

        let mut anchor_counts = config::snapshot::AnchorCounts::default();
        anchor_counts
            .entry("tx1".to_string())
            .or_default()
            .insert(50, tail_total);

        // the background library is deeper than the tail library
        let mut background_anchor_counts = config::snapshot::AnchorCounts::default();
        background_anchor_counts
            .entry("tx1".to_string())
            .or_default()
            .insert(50, 2 * tail_total);

        let mut fragment_size_histogram = HashMap::new();
        fragment_size_histogram.insert(100, 5);

        let transcript_lengths = transcripts
            .iter()
            .map(|&(id, len)| (id.to_string(), len))
            .collect();

        Snapshot {
            name: name.to_string(),
            g: TailChannel {
                file: PathBuf::from(format!("{}.gtail.bam", name)),
                anchor_counts,
                tail_run_histograms,
                mapq_histogram: Default::default(),
            },
            n: BackgroundChannel {
                file: PathBuf::from(format!("{}.nvtr.bam", name)),
                anchor_counts: background_anchor_counts,
                fragment_size_histogram,
                mapq_histogram: Default::default(),
            },
            transcript_lengths,
        }
    }

    fn dataset(name: &str, runs: &[(u32, u64)], transcripts: &[(&str, u64)]) -> Dataset {
        Dataset::from_snapshot(snapshot(name, runs, transcripts), PmfMode::Empirical)
    }

    #[test]
    fn test_pooling_concatenates_in_member_order() {
        let catalog = [("tx1", 500), ("tx2", 200)];
        let group = DataGroup::new(
            "wt",
            vec![
                dataset("rep1", &[(5, 1), (6, 1), (7, 1)], &catalog),
                dataset("rep2", &[(4, 1), (6, 1), (8, 1)], &catalog),
            ],
        )
        .unwrap();

        assert_eq!(group.tail_runs("tx1"), vec![5, 6, 7, 4, 6, 8]);
        assert_eq!(group.tail_expression("tx1"), 6);
    }

    #[test]
    fn test_expression_sums_member_counts() {
        let catalog = [("tx1", 500)];
        let group = DataGroup::new(
            "wt",
            vec![
                dataset("rep1", &[(5, 2)], &catalog),
                dataset("rep2", &[(9, 3)], &catalog),
            ],
        )
        .unwrap();

        assert_eq!(group.tail_expression("tx1"), 5);
        assert_eq!(group.background_expression("tx1"), 10);
    }

    #[test]
    fn test_mismatched_catalogs_fail_fast() {
        let result = DataGroup::new(
            "wt",
            vec![
                dataset("rep1", &[(5, 1)], &[("tx1", 500)]),
                dataset("rep2", &[(5, 1)], &[("tx1", 500), ("tx2", 200)]),
            ],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_mismatched_lengths_fail_fast() {
        let result = DataGroup::new(
            "wt",
            vec![
                dataset("rep1", &[(5, 1)], &[("tx1", 500)]),
                dataset("rep2", &[(5, 1)], &[("tx1", 501)]),
            ],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_empty_group_fails() {
        assert!(DataGroup::new("wt", vec![]).is_err());
    }

    #[test]
    fn test_profile_sums_members() {
        let catalog = [("tx1", 10)];
        let a = dataset("rep1", &[(5, 1)], &catalog);
        let b = dataset("rep2", &[(5, 1)], &catalog);

        let solo = DataGroup::new("one", vec![a.clone()]).unwrap();
        let duo = DataGroup::new("two", vec![a, b]).unwrap();

        let end = 20;
        let single = solo.profile("tx1", end, 0.0);
        let double = duo.profile("tx1", end, 0.0);

        for (s, d) in single.iter().zip(double.iter()) {
            assert!((2.0 * s - d).abs() < 1e-9);
        }
    }
}
