//! Pairwise sweep for natural experiments: closely related species whose
//! cancer rates differ by a wide margin.

use crate::divergence::divergence;
use crate::io::CancerRate;
use crate::tree::Tree;
use rayon::prelude::*;
use tracing::debug;

/// Default upper bound on divergence, in the tree's branch-length unit (MYA).
pub const DEFAULT_MAX_DIVERGENCE: f64 = 10.0;
/// Default lower bound on the absolute difference between two rates.
pub const DEFAULT_MIN_DIFFERENCE: f64 = 0.2;

/// Filters applied to every candidate pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Thresholds {
    /// Pairs further apart than this are not reported.
    pub max_divergence: f64,
    /// Pairs whose rates differ by less than this are not reported.
    pub min_difference: f64,
    /// Species with a known record total below this are ignored. 0 disables it.
    pub min_total: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            max_divergence: DEFAULT_MAX_DIVERGENCE,
            min_difference: DEFAULT_MIN_DIFFERENCE,
            min_total: 0,
        }
    }
}

impl Thresholds {
    fn has_enough_records(&self, rate: &CancerRate) -> bool {
        rate.total.is_none_or(|total| total >= self.min_total)
    }

    fn rates_differ(&self, a: &CancerRate, b: &CancerRate) -> bool {
        (a.rate - b.rate).abs() >= self.min_difference
    }

    fn close_enough(&self, divergence: f64) -> bool {
        divergence > 0.0 && divergence <= self.max_divergence
    }
}

/// A reported pair.
#[derive(Clone, Debug, PartialEq)]
pub struct NaturalExperiment {
    pub species_a: String,
    pub rate_a: f64,
    pub species_b: String,
    pub rate_b: f64,
    pub difference: f64,
    pub divergence: f64,
}

fn check_pair(
    tree: &Tree,
    a: &CancerRate,
    b: &CancerRate,
    thresholds: &Thresholds,
) -> Option<NaturalExperiment> {
    if !thresholds.rates_differ(a, b) {
        return None;
    }
    // Species missing from the tree yield None and drop out here.
    let d = divergence(tree, &a.name, &b.name)?;
    if !thresholds.close_enough(d) {
        return None;
    }
    Some(NaturalExperiment {
        species_a: a.name.clone(),
        rate_a: a.rate,
        species_b: b.name.clone(),
        rate_b: b.rate,
        difference: (a.rate - b.rate).abs(),
        divergence: d,
    })
}

/// Compare every unordered pair of `rates` against `tree`.
///
/// # Filters
/// A pair `(i, j)`, `i < j`, is reported when
/// - both species pass `min_total` (an unknown total always passes),
/// - `|rate_i - rate_j| >= min_difference`,
/// - both species are in the tree and `0 < divergence <= max_divergence`.
///
/// Pairs are checked in parallel; the result is ordered by `i`, then `j`.
pub fn identify(tree: &Tree, rates: &[CancerRate], thresholds: &Thresholds) -> Vec<NaturalExperiment> {
    let eligible: Vec<&CancerRate> = rates
        .iter()
        .filter(|r| thresholds.has_enough_records(r))
        .collect();
    let n = eligible.len();
    debug!(
        species = n,
        dropped = rates.len() - n,
        pairs = n * n.saturating_sub(1) / 2,
        "comparing species pairs"
    );

    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .filter_map(|(i, j)| check_pair(tree, eligible[i], eligible[j], thresholds))
        .collect()
}
