//! Bounded combination of per-partition candidate worlds.
//!
//! Each partition contributes a locally ranked list of `(world, frequency)`
//! candidates. [`combine_top_k`] walks the bounded cross product of those
//! lists (at most `k` per partition) in odometer order: the joint world is the
//! union of the picked worlds and the joint frequency is the product of their
//! frequencies. The product is enumerated exhaustively and is not re-ranked.

use indexmap::IndexMap;

use crate::odometer::Odometer;
use crate::world::World;

/// A locally ranked candidate assignment of one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Candidate world restricted to the partition
    pub world: World,
    /// Observed frequency or count
    pub frequency: f64,
}

impl Candidate {
    /// Create a candidate.
    pub fn new(world: World, frequency: f64) -> Self {
        Self { world, frequency }
    }
}

/// One joint world of the bounded cross product.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Union of the selected per-partition worlds
    pub world: World,
    /// Product of the selected per-partition frequencies
    pub frequency: f64,
    /// Selected candidate index per partition
    pub indices: Vec<usize>,
}

/// Lazy iterator over bounded candidate combinations.
pub struct TopKCombinations<'a> {
    candidates: &'a [Vec<Candidate>],
    odometer: Odometer,
}

impl TopKCombinations<'_> {
    /// Number of combinations the full iteration produces.
    pub fn total(&self) -> Option<usize> {
        self.odometer.total_states()
    }
}

impl Iterator for TopKCombinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.odometer.next()?;

        let mut world = World::new();
        let mut frequency = 1.0;
        for (list, &idx) in self.candidates.iter().zip(&indices) {
            let candidate = &list[idx];
            world.union_with(&candidate.world);
            frequency *= candidate.frequency;
        }

        Some(Combination {
            world,
            frequency,
            indices,
        })
    }
}

/// Enumerate combinations picking one of the first `k` candidates per partition.
///
/// With no partitions a single empty combination of frequency 1 is produced;
/// a partition without candidates makes the product empty.
pub fn combine_top_k(candidates: &[Vec<Candidate>], k: usize) -> TopKCombinations<'_> {
    let bounds = candidates.iter().map(|list| list.len().min(k)).collect();
    TopKCombinations {
        candidates,
        odometer: Odometer::new(bounds),
    }
}

/// Counts observed worlds of one partition and ranks them.
#[derive(Debug, Clone, Default)]
pub struct CandidateTally {
    counts: IndexMap<World, usize>,
}

impl CandidateTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of `world`.
    pub fn observe(&mut self, world: World) {
        *self.counts.entry(world).or_insert(0) += 1;
    }

    /// Number of distinct worlds observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `k` most frequent worlds, ties kept in first-observed order.
    pub fn ranked(&self, k: usize) -> Vec<Candidate> {
        let mut ranked: Vec<Candidate> = self
            .counts
            .iter()
            .map(|(world, &count)| Candidate::new(world.clone(), count as f64))
            .collect();
        ranked.sort_by(|a, b| b.frequency.total_cmp(&a.frequency));
        ranked.truncate(k);
        ranked
    }
}

/// Convert frequencies into shares of their total.
///
/// A non-positive total leaves every share at zero.
pub fn normalize_frequencies(frequencies: &[f64]) -> Vec<f64> {
    let total: f64 = frequencies.iter().sum();
    if total > 0.0 {
        frequencies.iter().map(|f| f / total).collect()
    } else {
        vec![0.0; frequencies.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn candidates() -> Vec<Vec<Candidate>> {
        vec![
            vec![
                Candidate::new(World::from_atoms([1]), 6.0),
                Candidate::new(World::new(), 4.0),
            ],
            vec![
                Candidate::new(World::from_atoms([10]), 5.0),
                Candidate::new(World::from_atoms([11]), 3.0),
                Candidate::new(World::from_atoms([10, 11]), 2.0),
            ],
        ]
    }

    #[test]
    fn test_bounded_product_size_and_order() {
        let lists = candidates();
        let combos: Vec<_> = combine_top_k(&lists, 10).collect();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0].indices, vec![0, 0]);
        assert_eq!(combos[1].indices, vec![1, 0]);
        assert_eq!(combos[2].indices, vec![0, 1]);
        assert_eq!(combos[0].world, World::from_atoms([1, 10]));
        assert_eq!(combos[0].frequency, 30.0);
        assert_eq!(combos[5].frequency, 8.0);
    }

    #[test]
    fn test_k_bounds_each_partition() {
        let lists = candidates();
        let combos = combine_top_k(&lists, 1);
        assert_eq!(combos.total(), Some(1));
        assert_eq!(combos.count(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        let none: Vec<Vec<Candidate>> = Vec::new();
        let combos: Vec<_> = combine_top_k(&none, 3).collect();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].frequency, 1.0);
        assert!(combos[0].world.is_empty());

        let with_empty = vec![vec![Candidate::new(World::new(), 1.0)], Vec::new()];
        assert_eq!(combine_top_k(&with_empty, 3).count(), 0);
    }

    #[test]
    fn test_tally_ranking() {
        let mut tally = CandidateTally::new();
        tally.observe(World::from_atoms([2]));
        tally.observe(World::new());
        tally.observe(World::new());
        tally.observe(World::from_atoms([3]));
        let ranked = tally.ranked(2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], Candidate::new(World::new(), 2.0));
        assert_eq!(ranked[1].world, World::from_atoms([2]));
    }

    #[test]
    fn test_normalize_frequencies() {
        let shares = normalize_frequencies(&[30.0, 10.0]);
        assert_abs_diff_eq!(shares[0], 0.75, epsilon = 1e-12);
        assert_eq!(normalize_frequencies(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
