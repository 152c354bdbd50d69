//! Exhaustive enumeration of a partition's free atoms.
//!
//! For `k` free atoms every one of the `2^k` truth assignments is evaluated
//! with the cost oracle. The result is the partition's discrete distribution
//! (restricted world → log-weight) and its log partition function.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::InferenceConfig;
use crate::deadline::{self, Deadline};
use crate::error::{MlnError, Result};
use crate::log_arith::log_add;
use crate::model::{Assignment, AtomId, Partition, PartitionId};
use crate::odometer::Odometer;
use crate::oracle::CostOracle;
use crate::world::World;

/// How atoms outside the enumerated subset are set.
#[derive(Clone, Copy, Debug)]
pub enum MarginPolicy<'a> {
    /// Non-enumerated core atoms stay false.
    Pure,
    /// Core atoms true in the reference world are forced true after the
    /// enumerated bits are written.
    Conditional(&'a World),
}

/// Cached distribution of one partition.
#[derive(Clone, Debug)]
pub struct PartitionDistribution {
    partition: PartitionId,
    margin_atoms: Vec<AtomId>,
    entries: IndexMap<World, f64>,
    log_partition_function: f64,
}

impl PartitionDistribution {
    /// Partition this distribution belongs to.
    pub fn partition_id(&self) -> PartitionId {
        self.partition
    }

    /// Atoms that were enumerated, in digit order.
    pub fn margin_atoms(&self) -> &[AtomId] {
        &self.margin_atoms
    }

    /// Log of the sum of `exp(-cost)` over all enumerated assignments.
    pub fn log_partition_function(&self) -> f64 {
        self.log_partition_function
    }

    /// Number of cached worlds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no world was cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unnormalized log-weight of a restricted world.
    pub fn log_weight(&self, world: &World) -> Option<f64> {
        self.entries.get(world).copied()
    }

    /// Normalized probability of a restricted world within this partition.
    pub fn probability(&self, world: &World) -> Option<f64> {
        self.log_weight(world)
            .map(|lw| (lw - self.log_partition_function).exp())
    }

    /// Cached `(world, log-weight)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (&World, f64)> {
        self.entries.iter().map(|(w, &lw)| (w, lw))
    }

    /// Cached `(world, probability)` pairs in enumeration order.
    pub fn probabilities(&self) -> impl Iterator<Item = (&World, f64)> {
        let log_pf = self.log_partition_function;
        self.entries.iter().map(move |(w, &lw)| (w, (lw - log_pf).exp()))
    }
}

/// Enumerate all assignments of `target ∩ core_atoms` for one partition.
///
/// With no free atoms exactly one assignment is evaluated. The deadline is
/// polled every `config.deadline_poll_interval` assignments, starting with the
/// first.
pub fn enumerate_partition(
    partition: &Partition,
    target: &World,
    policy: MarginPolicy<'_>,
    oracle: &dyn CostOracle,
    deadline: &dyn Deadline,
    config: &InferenceConfig,
) -> Result<PartitionDistribution> {
    let margin_atoms = partition.free_atoms(target);
    let k = margin_atoms.len();

    if let Some(max) = config.max_enumeration_bits {
        if k > max {
            return Err(MlnError::OversizedEnumeration {
                partition: partition.id(),
                free_atoms: k,
                max,
            });
        }
    }

    info!(partition = partition.id(), free_atoms = k, "enumerating partition worlds");

    let mut assignment = Assignment::baseline(partition);
    let mut entries = IndexMap::new();
    let mut log_pf = f64::NEG_INFINITY;

    for (step, digits) in Odometer::binary(k).enumerate() {
        deadline::poll(deadline, step as u64, config.deadline_poll_interval, "enumeration")?;

        assignment.reset_core(partition);
        let mut restricted = World::new();
        for (&atom, &bit) in margin_atoms.iter().zip(&digits) {
            let truth = bit == 1;
            assignment.set(atom, truth);
            if truth {
                restricted.insert(atom);
            }
        }

        if let MarginPolicy::Conditional(reference) = policy {
            for &atom in partition.core_atoms() {
                if reference.contains(atom) {
                    assignment.set(atom, true);
                }
            }
        }

        let log_weight = -oracle.cost(partition, &assignment)?;
        log_pf = log_add(log_pf, log_weight);
        entries.insert(restricted, log_weight);
    }

    debug!(
        partition = partition.id(),
        worlds = entries.len(),
        log_pf,
        "partition enumeration finished"
    );

    Ok(PartitionDistribution {
        partition: partition.id(),
        margin_atoms,
        entries,
        log_partition_function: log_pf,
    })
}
