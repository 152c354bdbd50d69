//! Error types for partitioned inference.

use thiserror::Error;

use crate::model::{AtomId, PartitionId};
use crate::world::World;

/// Boxed error raised by an external cost evaluator.
pub type BoxedCostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while enumerating, querying or sampling partitions.
#[derive(Error, Debug)]
pub enum MlnError {
    /// The externally supplied deadline expired inside a bounded loop.
    #[error("Deadline exceeded during {stage}")]
    Timeout {
        /// Loop that observed the expiry
        stage: &'static str,
    },

    /// A cache-backed query asked for a world that was never enumerated.
    #[error("No cached log-weight for world {world} in partition {partition}")]
    MissingCacheEntry {
        /// Partition whose cache was consulted
        partition: PartitionId,
        /// Restricted world that was looked up
        world: World,
    },

    /// The free-atom count of a partition exceeds the configured guard.
    #[error(
        "Partition {partition} has {free_atoms} free atoms, exceeding the enumeration limit of {max}"
    )]
    OversizedEnumeration {
        /// Offending partition
        partition: PartitionId,
        /// Number of atoms that would be enumerated
        free_atoms: usize,
        /// Configured maximum
        max: usize,
    },

    /// The cost oracle failed; the source error is passed through untouched.
    #[error("Cost evaluation failed: {0}")]
    CostEvaluation(#[source] BoxedCostError),

    /// A result sink refused a commit.
    #[error("Result sink rejected '{label}': {reason}")]
    Sink {
        /// Result set label
        label: String,
        /// Reason reported by the sink
        reason: String,
    },

    /// A clause or query references an atom the partition does not own.
    #[error("Atom {0} is not owned by the partition")]
    UnknownAtom(AtomId),

    /// Two atoms of one partition share an id.
    #[error("Atom {0} appears more than once in the partition")]
    DuplicateAtom(AtomId),

    /// Two partitions of one request share an id.
    #[error("Partition id {0} is used by more than one partition")]
    DuplicatePartition(PartitionId),

    /// Invalid or unparsable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MlnError {
    /// Wrap an arbitrary oracle failure.
    pub fn cost_evaluation(err: impl Into<BoxedCostError>) -> Self {
        Self::CostEvaluation(err.into())
    }
}

/// Result type for partitioned inference.
pub type Result<T> = std::result::Result<T, MlnError>;
