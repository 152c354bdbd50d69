//! Cost evaluation boundary.
//!
//! The core never sums clause weights itself; it asks a [`CostOracle`] for the
//! unnormalized negative log-weight of a complete partition assignment. The
//! oracle may be backed by an in-memory clause set, a cached violation index,
//! or an external store.

use crate::error::Result;
use crate::model::{Assignment, Partition};

/// Default magnitude at which a clause weight is treated as a hard constraint.
pub const DEFAULT_HARD_WEIGHT: f64 = 1.0e7;

/// Per-partition cost function.
///
/// `cost` is the exact (possibly cached) evaluation; `fast_cost` is the direct
/// evaluation used when no enumeration cache exists. Both return the sum of
/// weights of clauses violated by `assignment`.
pub trait CostOracle: Sync {
    /// Exact cost of `assignment` over `partition`.
    fn cost(&self, partition: &Partition, assignment: &Assignment) -> Result<f64>;

    /// Direct cost evaluation; defaults to [`CostOracle::cost`].
    fn fast_cost(&self, partition: &Partition, assignment: &Assignment) -> Result<f64> {
        self.cost(partition, assignment)
    }
}

/// Reference oracle summing violated clause weights of the partition.
///
/// Clause weights whose magnitude reaches `hard_weight` are clamped to it, so a
/// violated hard clause drives the probability of the assignment to zero
/// without producing infinities.
#[derive(Clone, Debug)]
pub struct ClauseCostOracle {
    /// Hard-constraint magnitude
    pub hard_weight: f64,
}

impl Default for ClauseCostOracle {
    fn default() -> Self {
        Self {
            hard_weight: DEFAULT_HARD_WEIGHT,
        }
    }
}

impl ClauseCostOracle {
    /// Create with a custom hard-constraint magnitude.
    pub fn new(hard_weight: f64) -> Self {
        Self { hard_weight }
    }

    /// Whether a clause weight denotes a hard constraint.
    pub fn is_hard(&self, weight: f64) -> bool {
        weight.abs() >= self.hard_weight
    }
}

impl CostOracle for ClauseCostOracle {
    fn cost(&self, partition: &Partition, assignment: &Assignment) -> Result<f64> {
        let cost = partition
            .clauses()
            .iter()
            .filter(|clause| clause.is_violated(assignment))
            .map(|clause| clause.weight.abs().min(self.hard_weight))
            .sum();
        Ok(cost)
    }
}
