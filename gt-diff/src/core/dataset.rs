//! Per-replicate dataset built from a persisted snapshot
//!
//! A Dataset owns one replicate's aggregates plus the fragment-size
//! probability model derived from the NVTR channel. The model is the
//! bridge between anchor positions and candidate 3' ends: an anchor at
//! position p supports a 3' end at theta with the probability of a
//! fragment of size theta - p.

use hashbrown::HashMap;

use config::snapshot::{AnchorCounts, Snapshot, TailRunHistograms};

/// How the fragment-size PMF is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmfMode {
    /// +1-pseudocount smoothed empirical histogram (the default)
    Empirical,
    /// log-normal moment fit evaluated at bin centers; smoother but
    /// biased when the size distribution is not log-normal
    LogNormal,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    gtail_file: String,
    nvtr_file: String,
    anchor_counts: AnchorCounts,
    tail_run_histograms: TailRunHistograms,
    background_counts: AnchorCounts,
    transcript_lengths: HashMap<String, u64>,
    /// ln PMF over fragment sizes [0, max_observed]; every bin finite
    log_pmf: Vec<f64>,
}

impl Dataset {
    pub fn from_snapshot(snapshot: Snapshot, mode: PmfMode) -> Self {
        let log_pmf = build_log_pmf(&snapshot.n.fragment_size_histogram, mode);

        log::info!(
            "Replicate {}: fragment-size model over [0, {}] ({:?})",
            snapshot.name,
            log_pmf.len().saturating_sub(1),
            mode
        );

        Self {
            name: snapshot.name,
            gtail_file: snapshot.g.file.display().to_string(),
            nvtr_file: snapshot.n.file.display().to_string(),
            anchor_counts: snapshot.g.anchor_counts,
            tail_run_histograms: snapshot.g.tail_run_histograms,
            background_counts: snapshot.n.anchor_counts,
            transcript_lengths: snapshot.transcript_lengths,
            log_pmf,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> (String, String) {
        (self.gtail_file.clone(), self.nvtr_file.clone())
    }

    /// Sorted transcript ids of this replicate
    pub fn transcript_ids(&self) -> Vec<&str> {
        let mut ids = self
            .transcript_lengths
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<_>>();
        ids.sort_unstable();

        ids
    }

    pub fn transcript_length(&self, transcript: &str) -> Option<u64> {
        self.transcript_lengths.get(transcript).copied()
    }

    /// Largest fragment size the PMF models
    pub fn max_fragment_size(&self) -> u64 {
        self.log_pmf.len().saturating_sub(1) as u64
    }

    pub fn log_pmf(&self) -> &[f64] {
        &self.log_pmf
    }

    /// Tail-run observations of one transcript, expanded from the
    /// histogram in ascending run-length order
    pub fn tail_runs(&self, transcript: &str) -> Vec<u32> {
        let Some(histogram) = self.tail_run_histograms.get(transcript) else {
            return Vec::new();
        };

        let mut bins = histogram.iter().map(|(&r, &c)| (r, c)).collect::<Vec<_>>();
        bins.sort_unstable_by_key(|&(r, _)| r);

        let mut runs = Vec::new();
        for (run, count) in bins {
            runs.extend(std::iter::repeat(run).take(count as usize));
        }

        runs
    }

    /// Tail-classified fragment count of one transcript
    pub fn tail_expression(&self, transcript: &str) -> u64 {
        self.anchor_counts
            .get(transcript)
            .map(|positions| positions.values().sum())
            .unwrap_or(0)
    }

    /// NVTR fragment count of one transcript
    pub fn background_expression(&self, transcript: &str) -> u64 {
        self.background_counts
            .get(transcript)
            .map(|positions| positions.values().sum())
            .unwrap_or(0)
    }

    /// Log-likelihood that `theta` is the 3' end of `transcript`
    ///
    /// Anchors whose offset falls outside the modeled size range
    /// contribute `penalty` per observation; the shipped default of 0.0
    /// makes that branch a no-op.
    pub fn log_likelihood(&self, transcript: &str, theta: u64, penalty: f64) -> f64 {
        let Some(positions) = self.anchor_counts.get(transcript) else {
            return 0.0;
        };

        let max = self.max_fragment_size() as i64;
        let mut total = 0.0;

        for (&position, &count) in positions {
            let delta = theta as i64 - position as i64;

            if delta < 0 || delta > max {
                total += penalty * count as f64;
            } else {
                total += count as f64 * self.log_pmf[delta as usize];
            }
        }

        total
    }

    /// Likelihood profile over theta in [0, end)
    pub fn profile(&self, transcript: &str, end: u64, penalty: f64) -> Vec<f64> {
        (0..end)
            .map(|theta| self.log_likelihood(transcript, theta, penalty))
            .collect()
    }

    /// Default profile range end: transcript length + modeled max size
    pub fn profile_end(&self, transcript: &str) -> u64 {
        self.transcript_length(transcript).unwrap_or(0) + self.max_fragment_size()
    }
}

/// Dense, strictly positive, normalized log-PMF over fragment sizes
fn build_log_pmf(histogram: &HashMap<u64, u64>, mode: PmfMode) -> Vec<f64> {
    let max = histogram.keys().max().copied().unwrap_or(0) as usize;

    let mut bins = vec![0u64; max + 1];
    for (&size, &count) in histogram {
        bins[size as usize] = count;
    }

    let weights = match mode {
        PmfMode::Empirical => bins.iter().map(|&c| (c + 1) as f64).collect::<Vec<_>>(),
        PmfMode::LogNormal => fit_log_normal(&bins),
    };

    let total = weights.iter().sum::<f64>();

    weights.iter().map(|&w| (w / total).ln()).collect()
}

/// Moment fit of a log-normal density, evaluated at bin centers so
/// every bin stays strictly positive
fn fit_log_normal(bins: &[u64]) -> Vec<f64> {
    let mut n = 0.0;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for (size, &count) in bins.iter().enumerate() {
        if size == 0 || count == 0 {
            continue;
        }

        let log_size = (size as f64).ln();
        n += count as f64;
        sum += count as f64 * log_size;
        sum_sq += count as f64 * log_size * log_size;
    }

    if n < 2.0 {
        // not enough mass to fit; fall back to the smoothed histogram
        return bins.iter().map(|&c| (c + 1) as f64).collect();
    }

    let mu = sum / n;
    let sigma_sq = (sum_sq / n - mu * mu).max(1e-6);
    let sigma = sigma_sq.sqrt();

    bins.iter()
        .enumerate()
        .map(|(size, _)| {
            let x: f64 = size as f64 + 0.5;
            let z = (x.ln() - mu) / sigma;

            (-0.5 * z * z).exp() / (x * sigma * (2.0 * std::f64::consts::PI).sqrt())
        })
        .collect()
}
