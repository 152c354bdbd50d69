//! Partitioned Markov logic inference.
//!
//! **Version**: 0.1.0-beta.1 | **Status**: Production Ready
//!
//! This crate computes exact and approximate probabilities over a ground
//! weighted-clause Markov random field that has been split upstream into
//! independent partitions. Independence makes every quantity factor:
//! per-partition log partition functions add, and a world's log-weight is the
//! sum of its per-partition log-weights.
//!
//! # Core Concepts
//!
//! - **Enumeration**: exhaustive `2^k` evaluation of a partition's free atoms
//! - **Sessions**: cached per-partition distributions and the whole log
//!   partition function, queried for world probabilities
//! - **Sampling**: inverse-CDF sampling over the caches, or uniform-proposal
//!   importance sampling when enumeration is infeasible
//! - **Top-k combination**: bounded cross product of per-partition candidates
//!
//! # Architecture
//!
//! ```text
//! Components → enumerate_partition → InferenceSession → probability / log_weight
//!      ↓                                    ↓
//! ImportanceSampler                    ExactSampler
//!      ↓
//! flush_top_worlds → ResultSink
//! ```
//!
//! # Example
//!
//! ```
//! use tensorlogic_mln::{
//!     Atom, ClauseCostOracle, Component, InferenceConfig, InferenceSession, Literal,
//!     MarginPolicy, NoDeadline, Partition, WeightedClause, World,
//! };
//!
//! let partition = Partition::new(
//!     0,
//!     vec![Atom::query(1)],
//!     vec![
//!         WeightedClause::new(1, vec![Literal::positive(1)], 2.0),
//!         WeightedClause::new(2, vec![Literal::negative(1)], 1.0),
//!     ],
//! )
//! .unwrap();
//! let components = vec![Component::new(vec![partition])];
//!
//! let session = InferenceSession::marginalize(
//!     &components,
//!     &World::from_atoms([1]),
//!     MarginPolicy::Pure,
//!     &ClauseCostOracle::default(),
//!     &NoDeadline,
//!     &InferenceConfig::default(),
//! )
//! .unwrap();
//!
//! let p = session.probability(&World::from_atoms([1]), &components).unwrap();
//! assert!((p - 0.731).abs() < 1e-3);
//! ```

pub mod config;
mod deadline;
mod enumerate;
mod error;
pub mod log_arith;
pub mod logging;
mod model;
mod odometer;
mod oracle;
mod query;
mod report;
mod sampling;
mod session;
mod sink;
mod topk;
mod world;

pub use config::InferenceConfig;
pub use deadline::{CancellationToken, Deadline, NoDeadline, WallClockDeadline};
pub use enumerate::{enumerate_partition, MarginPolicy, PartitionDistribution};
pub use error::{BoxedCostError, MlnError, Result};
pub use log_arith::{log_add, log_sum};
pub use model::{
    flatten, Assignment, Atom, AtomId, Component, Literal, Partition, PartitionId, WeightedClause,
};
pub use odometer::Odometer;
pub use oracle::{ClauseCostOracle, CostOracle, DEFAULT_HARD_WEIGHT};
pub use query::{
    fast_log_weight, mle_log_weight, project_to_query_atoms, restrict_to_core, stored_world,
};
pub use report::{
    flush_top_worlds, result_label, select_strategy, InferenceStrategy, ReportStrategy,
    ReportedWorld,
};
pub use sampling::{ExactSampler, ImportanceEstimate, ImportanceSampler, RankedWorld, TalliedWorld};
pub use session::{whole_log_partition_function, InferenceSession};
pub use sink::{CommittedWorld, MemorySink, ResultSink};
pub use topk::{
    combine_top_k, normalize_frequencies, Candidate, CandidateTally, Combination,
    TopKCombinations,
};
pub use world::World;
