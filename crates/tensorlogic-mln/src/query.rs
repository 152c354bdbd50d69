//! Cache-free world queries.
//!
//! These evaluate worlds directly against the cost oracle. Values returned by
//! [`fast_log_weight`] are unnormalized and are not comparable with
//! session-normalized probabilities without a common normalizer.

use crate::config::InferenceConfig;
use crate::deadline::Deadline;
use crate::enumerate::{enumerate_partition, MarginPolicy};
use crate::error::Result;
use crate::model::{flatten, Assignment, Component, Partition};
use crate::oracle::CostOracle;
use crate::world::World;

/// Restriction of `world` to the core atoms of `partition`.
pub fn restrict_to_core(world: &World, partition: &Partition) -> World {
    world.restrict_to(partition.core_atoms().iter().copied())
}

/// Sum of `-fast_cost` over all partitions with core atoms taken from `world`.
pub fn fast_log_weight(
    world: &World,
    components: &[Component],
    oracle: &dyn CostOracle,
) -> Result<f64> {
    let mut total = 0.0;
    for partition in flatten(components) {
        total += partition_fast_log_weight(world, partition, oracle)?;
    }
    Ok(total)
}

pub(crate) fn partition_fast_log_weight(
    world: &World,
    partition: &Partition,
    oracle: &dyn CostOracle,
) -> Result<f64> {
    let assignment = Assignment::from_world(partition, world);
    Ok(-oracle.fast_cost(partition, &assignment)?)
}

/// Restriction of `world` to query atoms, dropping hidden atoms.
pub fn project_to_query_atoms(world: &World, components: &[Component]) -> World {
    let mut projected = World::new();
    for partition in flatten(components) {
        projected.extend(partition.query_atoms().filter(|&id| world.contains(id)));
    }
    projected
}

/// World formed by every core atom whose stored truth is true.
pub fn stored_world(components: &[Component]) -> World {
    let mut world = World::new();
    for partition in flatten(components) {
        world.union_with(&partition.stored_core_world());
    }
    world
}

/// Log-weight of `world` with the non-query core atoms in `target` summed out.
///
/// Each partition enumerates its hidden target atoms while the atoms true in
/// `world` are held fixed; the per-partition log partition functions add.
pub fn mle_log_weight(
    world: &World,
    components: &[Component],
    target: &World,
    oracle: &dyn CostOracle,
    deadline: &dyn Deadline,
    config: &InferenceConfig,
) -> Result<f64> {
    let mut total = 0.0;
    for partition in flatten(components) {
        let hidden: World = partition
            .core_atoms()
            .iter()
            .copied()
            .filter(|&id| target.contains(id) && partition.atom(id).is_some_and(|a| !a.is_query))
            .collect();
        let dist = enumerate_partition(
            partition,
            &hidden,
            MarginPolicy::Conditional(world),
            oracle,
            deadline,
            config,
        )?;
        total += dist.log_partition_function();
    }
    Ok(total)
}
