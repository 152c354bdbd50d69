//! Sampling-based estimators over partitioned worlds.
//!
//! # Algorithms
//!
//! - **Exact sampling**: inverse-CDF draws from each partition's cached
//!   distribution; exact in distribution when the cache is exhaustive.
//! - **Importance sampling**: uniform proposal over core atoms, reweighted by
//!   the model's unnormalized log-weight and self-normalized. Needs no cache,
//!   so it scales to partitions that cannot be enumerated.

use indexmap::IndexMap;
use rayon::prelude::*;
use scirs2_core::random::{thread_rng, Rng, SeedableRng, StdRng};
use tracing::{debug, info};

use crate::config::InferenceConfig;
use crate::deadline::{self, Deadline};
use crate::enumerate::PartitionDistribution;
use crate::error::{MlnError, Result};
use crate::log_arith::log_add;
use crate::model::{flatten, Component};
use crate::oracle::CostOracle;
use crate::query::{partition_fast_log_weight, project_to_query_atoms};
use crate::session::InferenceSession;
use crate::world::World;

/// A projected world observed by the exact sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct TalliedWorld {
    /// Query-atom projection
    pub world: World,
    /// Number of draws that projected onto this world
    pub count: usize,
    /// `count / draws`
    pub frequency: f64,
    /// Probability with hidden target atoms summed out
    pub mle_probability: f64,
}

/// Inverse-CDF sampler over a populated [`InferenceSession`].
pub struct ExactSampler {
    /// Number of draws for [`ExactSampler::tally`]
    pub draws: usize,
    /// Number of tallied worlds reported
    pub report_top: usize,
}

impl Default for ExactSampler {
    fn default() -> Self {
        Self {
            draws: 1000,
            report_top: 10,
        }
    }
}

impl ExactSampler {
    /// Create with custom parameters.
    pub fn new(draws: usize, report_top: usize) -> Self {
        Self { draws, report_top }
    }

    /// Create from the exact-sampling fields of `config`.
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(config.exact_draws, config.exact_report_top)
    }

    /// Draw one complete world, one cached entry per partition.
    pub fn sample(
        session: &InferenceSession,
        components: &[Component],
        rng: &mut impl Rng,
    ) -> Result<World> {
        let mut world = World::new();
        for partition in flatten(components) {
            let dist = session.require(partition.id(), &World::new())?;
            let selected =
                Self::select(dist, &mut *rng).ok_or_else(|| MlnError::MissingCacheEntry {
                    partition: partition.id(),
                    world: World::new(),
                })?;
            world.union_with(selected);
        }
        Ok(world)
    }

    /// Pick the entry whose cumulative probability interval contains a uniform draw.
    fn select<'d>(dist: &'d PartitionDistribution, rng: &mut impl Rng) -> Option<&'d World> {
        let u: f64 = rng.random();

        let mut cumulative = 0.0;
        let mut last = None;
        for (world, prob) in dist.probabilities() {
            if u >= cumulative && u <= cumulative + prob {
                return Some(world);
            }
            cumulative += prob;
            last = Some(world);
        }

        // Round-off left the draw above the accumulated mass.
        last
    }

    /// Draw `self.draws` worlds and tally their query projections.
    ///
    /// Returns the `report_top` most frequent projections, each with its
    /// empirical frequency and its exact MLE probability.
    #[allow(clippy::too_many_arguments)]
    pub fn tally(
        &self,
        session: &InferenceSession,
        components: &[Component],
        target: &World,
        oracle: &dyn CostOracle,
        deadline: &dyn Deadline,
        config: &InferenceConfig,
        rng: &mut impl Rng,
    ) -> Result<Vec<TalliedWorld>> {
        let mut counts: IndexMap<World, usize> = IndexMap::new();
        for step in 0..self.draws {
            deadline::poll(deadline, step as u64, config.deadline_poll_interval, "exact sampling")?;
            let world = Self::sample(session, components, &mut *rng)?;
            *counts
                .entry(project_to_query_atoms(&world, components))
                .or_insert(0) += 1;
        }

        let mut ranked: Vec<(World, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.report_top);

        let total = self.draws as f64;
        ranked
            .into_iter()
            .map(|(world, count)| {
                let mle_probability =
                    session.mle_probability(&world, components, target, oracle, deadline, config)?;
                Ok(TalliedWorld {
                    world,
                    count,
                    frequency: count as f64 / total,
                    mle_probability,
                })
            })
            .collect()
    }
}

/// A projected world ranked by importance weight.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedWorld {
    /// Query-atom projection
    pub world: World,
    /// Log of the summed importance weights of draws projecting here
    pub log_weight: f64,
    /// Self-normalized probability estimate
    pub estimated_probability: f64,
    /// Number of draws projecting here
    pub raw_count: usize,
}

/// Outcome of an importance sampling run.
#[derive(Debug, Clone)]
pub struct ImportanceEstimate {
    /// Worlds sorted by descending estimated probability, truncated
    pub ranked: Vec<RankedWorld>,
    /// Log of the summed weights of all draws
    pub total_log_weight: f64,
    /// Largest single-draw log-weight
    pub max_log_weight: Option<f64>,
    /// Smallest single-draw log-weight
    pub min_log_weight: Option<f64>,
    /// Number of draws performed
    pub draws: usize,
    /// Number of distinct projections observed
    pub distinct_worlds: usize,
}

/// Running sums of one chunk of draws.
#[derive(Debug, Clone)]
struct WeightAccumulator {
    total_log_weight: f64,
    per_world: IndexMap<World, (f64, usize)>,
    max_log_weight: f64,
    min_log_weight: f64,
    draws: usize,
}

impl Default for WeightAccumulator {
    fn default() -> Self {
        Self {
            total_log_weight: f64::NEG_INFINITY,
            per_world: IndexMap::new(),
            max_log_weight: f64::NEG_INFINITY,
            min_log_weight: f64::INFINITY,
            draws: 0,
        }
    }
}

impl WeightAccumulator {
    fn observe(&mut self, world: World, log_weight: f64) {
        self.total_log_weight = log_add(self.total_log_weight, log_weight);
        self.max_log_weight = self.max_log_weight.max(log_weight);
        self.min_log_weight = self.min_log_weight.min(log_weight);
        self.draws += 1;

        let entry = self
            .per_world
            .entry(world)
            .or_insert((f64::NEG_INFINITY, 0));
        entry.0 = log_add(entry.0, log_weight);
        entry.1 += 1;
    }

    fn merge(mut self, other: WeightAccumulator) -> Self {
        self.total_log_weight = log_add(self.total_log_weight, other.total_log_weight);
        self.max_log_weight = self.max_log_weight.max(other.max_log_weight);
        self.min_log_weight = self.min_log_weight.min(other.min_log_weight);
        self.draws += other.draws;

        for (world, (log_weight, count)) in other.per_world {
            let entry = self
                .per_world
                .entry(world)
                .or_insert((f64::NEG_INFINITY, 0));
            entry.0 = log_add(entry.0, log_weight);
            entry.1 += count;
        }
        self
    }
}

/// Self-normalized importance sampler with a uniform proposal.
///
/// Draws are split into chunks evaluated in parallel; each chunk has its own
/// RNG derived from the run seed, and chunk sums are merged in chunk order,
/// so a fixed seed gives a reproducible estimate.
pub struct ImportanceSampler {
    /// Number of draws
    pub draws: usize,
    /// Draws per parallel chunk
    pub chunk_size: usize,
    /// Number of ranked worlds reported
    pub report_top: usize,
    /// Deadline polling interval in draws
    pub poll_interval: u64,
}

impl Default for ImportanceSampler {
    fn default() -> Self {
        Self {
            draws: 100_000,
            chunk_size: 4096,
            report_top: 100,
            poll_interval: 1024,
        }
    }
}

impl ImportanceSampler {
    /// Create with a specific draw count and default chunking.
    pub fn new(draws: usize) -> Self {
        Self {
            draws,
            ..Self::default()
        }
    }

    /// Create from the importance-sampling fields of `config`.
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            draws: config.importance_draws,
            chunk_size: config.importance_chunk_size,
            report_top: config.importance_report_top,
            poll_interval: config.deadline_poll_interval,
        }
    }

    /// Set the number of reported worlds.
    pub fn with_report_top(mut self, report_top: usize) -> Self {
        self.report_top = report_top;
        self
    }

    /// Run the sampler; `seed = None` draws a fresh seed.
    pub fn run(
        &self,
        components: &[Component],
        oracle: &dyn CostOracle,
        deadline: &dyn Deadline,
        seed: Option<u64>,
    ) -> Result<ImportanceEstimate> {
        let base_seed = seed.unwrap_or_else(|| {
            let mut rng = thread_rng();
            rng.random()
        });

        let chunk_size = self.chunk_size.max(1);
        let chunks: Vec<(usize, usize)> = (0..self.draws.div_ceil(chunk_size))
            .map(|idx| {
                let start = idx * chunk_size;
                (idx, chunk_size.min(self.draws - start))
            })
            .collect();

        let partials = chunks
            .par_iter()
            .map(|&(idx, len)| {
                let mut rng = StdRng::seed_from_u64(chunk_seed(base_seed, idx));
                self.run_chunk(components, oracle, deadline, idx * chunk_size, len, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let merged = partials
            .into_iter()
            .fold(WeightAccumulator::default(), WeightAccumulator::merge);

        Ok(self.finish(merged))
    }

    fn run_chunk(
        &self,
        components: &[Component],
        oracle: &dyn CostOracle,
        deadline: &dyn Deadline,
        offset: usize,
        len: usize,
        rng: &mut impl Rng,
    ) -> Result<WeightAccumulator> {
        let partitions = flatten(components);
        let mut acc = WeightAccumulator::default();

        for i in 0..len {
            deadline::poll(
                deadline,
                (offset + i) as u64,
                self.poll_interval,
                "importance sampling",
            )?;

            let mut world = World::new();
            for partition in &partitions {
                for &atom in partition.core_atoms() {
                    if rng.random::<f64>() > 0.5 {
                        world.insert(atom);
                    }
                }
            }

            let mut log_weight = 0.0;
            for partition in &partitions {
                log_weight += partition_fast_log_weight(&world, partition, oracle)?;
            }

            acc.observe(project_to_query_atoms(&world, components), log_weight);
        }

        debug!(offset, draws = len, "importance chunk finished");
        Ok(acc)
    }

    fn finish(&self, acc: WeightAccumulator) -> ImportanceEstimate {
        let total = acc.total_log_weight;
        let distinct_worlds = acc.per_world.len();

        let mut ranked: Vec<RankedWorld> = acc
            .per_world
            .into_iter()
            .map(|(world, (log_weight, raw_count))| RankedWorld {
                world,
                log_weight,
                estimated_probability: (log_weight - total).exp(),
                raw_count,
            })
            .collect();
        ranked.sort_by(|a, b| b.log_weight.total_cmp(&a.log_weight));
        ranked.truncate(self.report_top);

        let (max_log_weight, min_log_weight) = if acc.draws > 0 {
            (Some(acc.max_log_weight), Some(acc.min_log_weight))
        } else {
            (None, None)
        };

        info!(
            draws = acc.draws,
            distinct_worlds,
            max_log_weight = ?max_log_weight,
            min_log_weight = ?min_log_weight,
            "importance sampling finished"
        );

        ImportanceEstimate {
            ranked,
            total_log_weight: total,
            max_log_weight,
            min_log_weight,
            draws: acc.draws,
            distinct_worlds,
        }
    }
}

/// Derive an independent chunk seed (splitmix64 finalizer).
fn chunk_seed(base: u64, chunk: usize) -> u64 {
    let mut z = base.wrapping_add((chunk as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::{CancellationToken, NoDeadline};
    use crate::enumerate::MarginPolicy;
    use crate::model::{Atom, Literal, Partition, WeightedClause};
    use crate::oracle::ClauseCostOracle;

    fn two_clause_components() -> Vec<Component> {
        let p = Partition::new(
            0,
            vec![Atom::query(1)],
            vec![
                WeightedClause::new(1, vec![Literal::positive(1)], 2.0),
                WeightedClause::new(2, vec![Literal::negative(1)], 1.0),
            ],
        )
        .unwrap();
        vec![Component::new(vec![p])]
    }

    #[test]
    fn test_exact_sampler_requires_cache() {
        let components = two_clause_components();
        let mut rng = StdRng::seed_from_u64(1);
        let err = ExactSampler::sample(&InferenceSession::default(), &components, &mut rng)
            .unwrap_err();
        assert!(matches!(err, MlnError::MissingCacheEntry { partition: 0, .. }));
    }

    #[test]
    fn test_exact_sampler_frequency() {
        let components = two_clause_components();
        let session = InferenceSession::marginalize(
            &components,
            &World::from_atoms([1]),
            MarginPolicy::Pure,
            &ClauseCostOracle::default(),
            &NoDeadline,
            &InferenceConfig::default(),
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let draws = 4000;
        let hits = (0..draws)
            .filter(|_| {
                ExactSampler::sample(&session, &components, &mut rng)
                    .unwrap()
                    .contains(1)
            })
            .count();
        let freq = hits as f64 / draws as f64;
        assert!((freq - 0.731).abs() < 0.04, "frequency {}", freq);
    }

    #[test]
    fn test_importance_zero_draws() {
        let estimate = ImportanceSampler::new(0)
            .run(
                &two_clause_components(),
                &ClauseCostOracle::default(),
                &NoDeadline,
                Some(3),
            )
            .unwrap();
        assert!(estimate.ranked.is_empty());
        assert_eq!(estimate.draws, 0);
        assert_eq!(estimate.total_log_weight, f64::NEG_INFINITY);
        assert!(estimate.max_log_weight.is_none());
    }

    #[test]
    fn test_importance_seed_is_reproducible() {
        let components = two_clause_components();
        let oracle = ClauseCostOracle::default();
        let sampler = ImportanceSampler {
            draws: 3000,
            chunk_size: 256,
            ..ImportanceSampler::default()
        };
        let a = sampler.run(&components, &oracle, &NoDeadline, Some(11)).unwrap();
        let b = sampler.run(&components, &oracle, &NoDeadline, Some(11)).unwrap();
        assert_eq!(a.ranked, b.ranked);
        assert_eq!(a.draws, 3000);
        assert_eq!(a.max_log_weight, Some(-1.0));
        assert_eq!(a.min_log_weight, Some(-2.0));
    }

    #[test]
    fn test_importance_timeout() {
        let token = CancellationToken::new();
        token.cancel();
        let err = ImportanceSampler::new(10)
            .run(&two_clause_components(), &ClauseCostOracle::default(), &token, Some(1))
            .unwrap_err();
        assert!(matches!(err, MlnError::Timeout { .. }));
    }

    #[test]
    fn test_exact_tally_timeout() {
        let components = two_clause_components();
        let target = World::from_atoms([1]);
        let oracle = ClauseCostOracle::default();
        let config = InferenceConfig::default();
        let session = InferenceSession::marginalize(
            &components,
            &target,
            MarginPolicy::Pure,
            &oracle,
            &NoDeadline,
            &config,
        )
        .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let mut rng = StdRng::seed_from_u64(2);
        let err = ExactSampler::from_config(&config)
            .tally(&session, &components, &target, &oracle, &token, &config, &mut rng)
            .unwrap_err();
        assert!(matches!(err, MlnError::Timeout { stage: "exact sampling" }));
    }

    #[test]
    fn test_report_top_truncates_ranking() {
        let estimate = ImportanceSampler::new(500)
            .with_report_top(1)
            .run(
                &two_clause_components(),
                &ClauseCostOracle::default(),
                &NoDeadline,
                Some(4),
            )
            .unwrap();
        assert_eq!(estimate.ranked.len(), 1);
        assert_eq!(estimate.distinct_worlds, 2);
        assert_eq!(estimate.ranked[0].world, World::from_atoms([1]));
    }

    #[test]
    fn test_chunk_seeds_differ() {
        assert_ne!(chunk_seed(5, 0), chunk_seed(5, 1));
        assert_eq!(chunk_seed(5, 2), chunk_seed(5, 2));
    }
}
