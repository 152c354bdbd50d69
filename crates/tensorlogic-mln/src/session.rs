//! Query sessions over enumerated partitions.
//!
//! A session holds one [`PartitionDistribution`] per partition plus the whole
//! log partition function. Partitions are independent, so the whole log
//! partition function is the plain sum of the per-partition ones, and a
//! world's log-weight is the sum of its per-partition cached log-weights.
//!
//! Sessions are values: build a new one for a different reference world or
//! target atom subset.

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use tracing::info;

use crate::config::InferenceConfig;
use crate::deadline::Deadline;
use crate::enumerate::{enumerate_partition, MarginPolicy, PartitionDistribution};
use crate::error::{MlnError, Result};
use crate::model::{flatten, Component, PartitionId};
use crate::oracle::CostOracle;
use crate::query::{mle_log_weight, restrict_to_core, stored_world};
use crate::world::World;

/// Enumeration caches of one marginalization request.
#[derive(Clone, Debug, Default)]
pub struct InferenceSession {
    distributions: IndexMap<PartitionId, PartitionDistribution>,
    whole_log_partition_function: f64,
}

impl InferenceSession {
    /// Enumerate every partition of `components` and reduce the results.
    ///
    /// Partitions are enumerated in parallel; each worker owns the assignment
    /// buffer of its partition. An empty component set yields a session whose
    /// log partition function is 0. Partition ids must be unique across
    /// `components`.
    pub fn marginalize(
        components: &[Component],
        target: &World,
        policy: MarginPolicy<'_>,
        oracle: &dyn CostOracle,
        deadline: &dyn Deadline,
        config: &InferenceConfig,
    ) -> Result<Self> {
        let partitions = flatten(components);
        info!(partitions = partitions.len(), "marginalizing components");

        let mut seen = IndexSet::with_capacity(partitions.len());
        for partition in &partitions {
            if !seen.insert(partition.id()) {
                return Err(MlnError::DuplicatePartition(partition.id()));
            }
        }

        let distributions = partitions
            .par_iter()
            .map(|p| enumerate_partition(p, target, policy, oracle, deadline, config))
            .collect::<Result<Vec<_>>>()?;

        let session = Self::from_distributions(distributions)?;
        info!(
            whole_log_pf = session.whole_log_partition_function,
            "marginalization finished"
        );
        Ok(session)
    }

    /// Assemble a session from already-computed distributions.
    ///
    /// Fails with `DuplicatePartition` if two distributions share a partition id.
    pub fn from_distributions<I>(distributions: I) -> Result<Self>
    where
        I: IntoIterator<Item = PartitionDistribution>,
    {
        let mut cached: IndexMap<PartitionId, PartitionDistribution> = IndexMap::new();
        for dist in distributions {
            let id = dist.partition_id();
            if cached.insert(id, dist).is_some() {
                return Err(MlnError::DuplicatePartition(id));
            }
        }
        let whole_log_partition_function = cached
            .values()
            .map(PartitionDistribution::log_partition_function)
            .sum();
        Ok(Self {
            distributions: cached,
            whole_log_partition_function,
        })
    }

    /// Sum of the per-partition log partition functions.
    pub fn whole_log_partition_function(&self) -> f64 {
        self.whole_log_partition_function
    }

    /// Log partition function of one partition.
    pub fn partition_log_partition_function(&self, partition: PartitionId) -> Option<f64> {
        self.distributions
            .get(&partition)
            .map(PartitionDistribution::log_partition_function)
    }

    /// Cached distribution of one partition.
    pub fn distribution(&self, partition: PartitionId) -> Option<&PartitionDistribution> {
        self.distributions.get(&partition)
    }

    /// Number of cached partitions.
    pub fn num_partitions(&self) -> usize {
        self.distributions.len()
    }

    /// Distribution for `partition` or a `MissingCacheEntry` error.
    pub(crate) fn require(
        &self,
        partition: PartitionId,
        world: &World,
    ) -> Result<&PartitionDistribution> {
        self.distributions
            .get(&partition)
            .ok_or_else(|| MlnError::MissingCacheEntry {
                partition,
                world: world.clone(),
            })
    }

    /// Unnormalized log-weight of a complete world from the caches.
    pub fn log_weight(&self, world: &World, components: &[Component]) -> Result<f64> {
        let mut total = 0.0;
        for partition in flatten(components) {
            let restricted = restrict_to_core(world, partition);
            let dist = self.require(partition.id(), &restricted)?;
            total += dist
                .log_weight(&restricted)
                .ok_or(MlnError::MissingCacheEntry {
                    partition: partition.id(),
                    world: restricted,
                })?;
        }
        Ok(total)
    }

    /// Normalized probability of a complete world.
    pub fn probability(&self, world: &World, components: &[Component]) -> Result<f64> {
        let log_weight = self.log_weight(world, components)?;
        Ok((log_weight - self.whole_log_partition_function).exp())
    }

    /// Probability of the world held in the partitions' stored core truth values.
    pub fn current_state_probability(&self, components: &[Component]) -> Result<f64> {
        self.probability(&stored_world(components), components)
    }

    /// Probability of a query projection with hidden target atoms summed out.
    pub fn mle_probability(
        &self,
        world: &World,
        components: &[Component],
        target: &World,
        oracle: &dyn CostOracle,
        deadline: &dyn Deadline,
        config: &InferenceConfig,
    ) -> Result<f64> {
        let log_weight = mle_log_weight(world, components, target, oracle, deadline, config)?;
        Ok((log_weight - self.whole_log_partition_function).exp())
    }
}

/// Whole log partition function of `components` under pure marginalization.
pub fn whole_log_partition_function(
    components: &[Component],
    target: &World,
    oracle: &dyn CostOracle,
    deadline: &dyn Deadline,
    config: &InferenceConfig,
) -> Result<f64> {
    InferenceSession::marginalize(
        components,
        target,
        MarginPolicy::Pure,
        oracle,
        deadline,
        config,
    )
    .map(|s| s.whole_log_partition_function())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::NoDeadline;
    use crate::log_arith::log_add;
    use crate::model::{Atom, Literal, Partition, WeightedClause};
    use crate::oracle::ClauseCostOracle;
    use approx::assert_abs_diff_eq;

    fn single(id: usize, atom: u32, pos: f64, neg: f64) -> Partition {
        Partition::new(
            id,
            vec![Atom::query(atom)],
            vec![
                WeightedClause::new(1, vec![Literal::positive(atom)], pos),
                WeightedClause::new(2, vec![Literal::negative(atom)], neg),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_partition_set_identity() {
        let session = InferenceSession::marginalize(
            &[],
            &World::new(),
            MarginPolicy::Pure,
            &ClauseCostOracle::default(),
            &NoDeadline,
            &InferenceConfig::default(),
        )
        .unwrap();
        assert_eq!(session.whole_log_partition_function(), 0.0);
        assert_eq!(session.probability(&World::new(), &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_missing_entry_for_unenumerated_world() {
        let components = vec![Component::new(vec![single(0, 1, 2.0, 1.0)])];
        // Atom 1 is not in the target, so only the all-false world is cached.
        let session = InferenceSession::marginalize(
            &components,
            &World::new(),
            MarginPolicy::Pure,
            &ClauseCostOracle::default(),
            &NoDeadline,
            &InferenceConfig::default(),
        )
        .unwrap();
        let err = session
            .log_weight(&World::from_atoms([1]), &components)
            .unwrap_err();
        assert!(matches!(err, MlnError::MissingCacheEntry { partition: 0, .. }));
    }

    #[test]
    fn test_repeated_partition_id_is_rejected() {
        let components = vec![
            Component::new(vec![single(0, 1, 2.0, 1.0)]),
            Component::new(vec![single(0, 2, 1.0, 3.0)]),
        ];
        let err = InferenceSession::marginalize(
            &components,
            &World::from_atoms([1, 2]),
            MarginPolicy::Pure,
            &ClauseCostOracle::default(),
            &NoDeadline,
            &InferenceConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MlnError::DuplicatePartition(0)));
    }

    #[test]
    fn test_from_distributions_rejects_repeated_id() {
        let oracle = ClauseCostOracle::default();
        let config = InferenceConfig::default();
        let target = World::from_atoms([1, 2]);
        let enumerate = |p: Partition| {
            enumerate_partition(&p, &target, MarginPolicy::Pure, &oracle, &NoDeadline, &config)
                .unwrap()
        };
        let a = enumerate(single(5, 1, 2.0, 1.0));
        let b = enumerate(single(5, 2, 1.0, 3.0));
        let c = enumerate(single(6, 2, 1.0, 3.0));

        assert!(matches!(
            InferenceSession::from_distributions(vec![a.clone(), b]),
            Err(MlnError::DuplicatePartition(5))
        ));

        let session = InferenceSession::from_distributions(vec![a, c]).unwrap();
        assert_eq!(session.num_partitions(), 2);
        assert_abs_diff_eq!(
            session.whole_log_partition_function(),
            log_add(-2.0, -1.0) + log_add(-1.0, -3.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_missing_partition_cache() {
        let components = vec![Component::new(vec![single(4, 1, 2.0, 1.0)])];
        let session = InferenceSession::default();
        assert!(matches!(
            session.probability(&World::new(), &components),
            Err(MlnError::MissingCacheEntry { partition: 4, .. })
        ));
    }

    #[test]
    fn test_current_state_probability() {
        let mut p = single(0, 1, 2.0, 1.0);
        if let Some(atom) = p.atom_mut(1) {
            atom.truth = true;
        }
        let components = vec![Component::new(vec![p])];
        let session = InferenceSession::marginalize(
            &components,
            &World::from_atoms([1]),
            MarginPolicy::Pure,
            &ClauseCostOracle::default(),
            &NoDeadline,
            &InferenceConfig::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(
            session.current_state_probability(&components).unwrap(),
            0.731_058_6,
            epsilon = 1e-6
        );
    }
}
