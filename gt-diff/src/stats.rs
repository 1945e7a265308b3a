//! Hypothesis-testing primitives
//!
//! The rank-sum test and the chi-square tail are small enough that the
//! tool carries them itself instead of pulling a statistics stack; the
//! normal approximation uses midranks with the usual tie correction
//! and a continuity correction of one half.

use std::f64::consts::SQRT_2;

/// Outcome of a one-sided rank-sum comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankSum {
    /// Mann-Whitney U of the second sample
    pub statistic: f64,
    /// one-sided p-value, alternative: second sample stochastically greater
    pub p_value: f64,
}

/// One-sided Mann-Whitney U test (alternative: `b` greater than `a`)
///
/// Returns None for an empty sample or a degenerate pooled population
/// (every observation tied), where the statistic carries no information.
pub fn mann_whitney_u(a: &[u32], b: &[u32]) -> Option<RankSum> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let n_a = a.len() as f64;
    let n_b = b.len() as f64;
    let n = n_a + n_b;

    let mut pooled = Vec::with_capacity(a.len() + b.len());
    pooled.extend(a.iter().map(|&v| (v, false)));
    pooled.extend(b.iter().map(|&v| (v, true)));
    pooled.sort_unstable_by_key(|&(v, _)| v);

    // midranks over tie groups, accumulating the tie correction term
    let mut rank_sum_b = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;

    while i < pooled.len() {
        let mut j = i;
        while j < pooled.len() && pooled[j].0 == pooled[i].0 {
            j += 1;
        }

        let ties = (j - i) as f64;
        let midrank = (i + j + 1) as f64 / 2.0;
        tie_term += ties * ties * ties - ties;

        for &(_, is_b) in &pooled[i..j] {
            if is_b {
                rank_sum_b += midrank;
            }
        }

        i = j;
    }

    let u_b = rank_sum_b - n_b * (n_b + 1.0) / 2.0;

    let mean = n_a * n_b / 2.0;
    let variance = n_a * n_b / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));

    if variance <= 0.0 {
        return None;
    }

    let z = (u_b - 0.5 - mean) / variance.sqrt();

    Some(RankSum {
        statistic: u_b,
        p_value: normal_sf(z),
    })
}

/// Upper tail of the standard normal distribution
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Upper tail of the chi-square distribution with one degree of freedom
pub fn chi2_sf1(x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }

    erfc((x / 2.0).sqrt())
}

/// Complementary error function, Abramowitz & Stegun 7.1.26
/// (absolute error below 1.5e-7)
fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * x);
    let poly = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5))));

    poly * (-x * x).exp()
}

/// Sample mean; None for an empty sample
pub fn mean(values: &[u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_sf_reference_points() {
        assert_relative_eq!(normal_sf(0.0), 0.5, epsilon = 1e-7);
        assert_relative_eq!(normal_sf(1.6449), 0.05, epsilon = 1e-4);
        assert_relative_eq!(normal_sf(-1.6449), 0.95, epsilon = 1e-4);
    }

    #[test]
    fn test_chi2_sf1_reference_points() {
        assert_relative_eq!(chi2_sf1(3.841459), 0.05, epsilon = 1e-4);
        assert_relative_eq!(chi2_sf1(6.634897), 0.01, epsilon = 1e-4);
        assert_eq!(chi2_sf1(0.0), 1.0);
    }

    #[test]
    fn test_separated_samples_reject() {
        // all of b above all of a: U equals n_a * n_b
        let a = [5, 6, 7, 4, 6, 8];
        let b = [10, 12, 11];

        let result = mann_whitney_u(&a, &b).unwrap();

        assert_relative_eq!(result.statistic, 18.0, epsilon = 1e-12);
        assert!(result.p_value < 0.05);
        assert!(result.p_value > 1e-4);
    }

    #[test]
    fn test_direction_flips_with_the_samples() {
        let a = [5, 6, 7, 4, 6, 8];
        let b = [10, 12, 11];

        let forward = mann_whitney_u(&a, &b).unwrap();
        let swapped = mann_whitney_u(&b, &a).unwrap();

        // the one-sided alternative flips: strong evidence one way,
        // none the other
        assert!(forward.p_value < 0.05);
        assert!(swapped.p_value > 0.95);
        assert_relative_eq!(
            forward.statistic + swapped.statistic,
            (a.len() * b.len()) as f64,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_identical_samples_are_insignificant() {
        let a = [3, 5, 9, 12, 4, 7, 8, 2];

        let result = mann_whitney_u(&a, &a).unwrap();
        assert!(result.p_value > 0.4);
    }

    #[test]
    fn test_degenerate_population_yields_none() {
        assert!(mann_whitney_u(&[7, 7, 7], &[7, 7]).is_none());
        assert!(mann_whitney_u(&[], &[1, 2]).is_none());
        assert!(mann_whitney_u(&[1, 2], &[]).is_none());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[5, 6, 7, 4, 6, 8]), Some(6.0));
        assert_eq!(mean(&[10, 12, 11]), Some(11.0));
        assert_eq!(mean(&[]), None);
    }
}
