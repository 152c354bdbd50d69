//! Strategy selection and reporting of top worlds to a result sink.

use tracing::{info, warn};

use crate::config::InferenceConfig;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::model::{flatten, Component};
use crate::oracle::CostOracle;
use crate::sampling::ImportanceSampler;
use crate::sink::ResultSink;
use crate::topk::{combine_top_k, normalize_frequencies, Candidate};
use crate::world::World;

/// How world probabilities are obtained for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStrategy {
    /// Enumerate every partition exactly
    Exact,
    /// Estimate by sampling
    Sampling,
}

/// Choose exact enumeration unless some partition has too many free atoms.
pub fn select_strategy(
    components: &[Component],
    target: &World,
    config: &InferenceConfig,
) -> InferenceStrategy {
    let widest = flatten(components)
        .iter()
        .map(|p| p.free_atoms(target).len())
        .max()
        .unwrap_or(0);

    let limit = config
        .max_enumeration_bits
        .map_or(config.exact_threshold_bits, |max| {
            max.min(config.exact_threshold_bits)
        });

    if widest > limit {
        InferenceStrategy::Sampling
    } else {
        InferenceStrategy::Exact
    }
}

/// Source of the reported top worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStrategy {
    /// Rank projected worlds by importance weight
    ImportanceSampling,
    /// Enumerate combinations of per-partition candidates
    TopKCombination,
}

impl ReportStrategy {
    /// Strategy requested by `config.weighted_sampling`.
    pub fn from_config(config: &InferenceConfig) -> Self {
        if config.weighted_sampling {
            Self::ImportanceSampling
        } else {
            Self::TopKCombination
        }
    }
}

/// A world handed to the result sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedWorld {
    /// Result-set label
    pub label: String,
    /// Reported world
    pub world: World,
    /// Estimated probability, or normalized combination frequency
    pub score: f64,
    /// Product of the per-partition candidate frequencies, for combined worlds
    pub frequency: Option<f64>,
    /// Draw count, for sampled worlds
    pub raw_count: Option<usize>,
    /// Whether the sink accepted the commit
    pub committed: bool,
}

/// Label of the `index`-th reported world.
pub fn result_label(index: usize) -> String {
    format!("mle_rs_{}", index)
}

/// Compute the top worlds with the configured strategy and commit each to `sink`.
///
/// `candidates` is only read by the top-k combination strategy. Sink failures
/// are logged and flagged on the returned entry; they do not abort the report.
pub fn flush_top_worlds(
    components: &[Component],
    candidates: &[Vec<Candidate>],
    oracle: &dyn CostOracle,
    deadline: &dyn Deadline,
    config: &InferenceConfig,
    sink: &mut dyn ResultSink,
) -> Result<Vec<ReportedWorld>> {
    let strategy = ReportStrategy::from_config(config);
    info!(?strategy, "reporting top worlds");

    let scored: Vec<(World, f64, Option<f64>, Option<usize>)> = match strategy {
        ReportStrategy::ImportanceSampling => {
            let estimate =
                ImportanceSampler::from_config(config).run(components, oracle, deadline, config.seed)?;
            estimate
                .ranked
                .into_iter()
                .map(|r| (r.world, r.estimated_probability, None, Some(r.raw_count)))
                .collect()
        }
        ReportStrategy::TopKCombination => {
            let combos: Vec<_> = combine_top_k(candidates, config.mle_top_k).collect();
            let freqs: Vec<f64> = combos.iter().map(|c| c.frequency).collect();
            combos
                .into_iter()
                .zip(normalize_frequencies(&freqs))
                .map(|(c, share)| (c.world, share, Some(c.frequency), None))
                .collect()
        }
    };

    let mut reported = Vec::with_capacity(scored.len());
    for (index, (world, score, frequency, raw_count)) in scored.into_iter().enumerate() {
        let label = result_label(index);
        let committed = match sink.commit(&world, &label) {
            Ok(()) => true,
            Err(err) => {
                warn!(label = %label, error = %err, "result sink rejected world");
                false
            }
        };
        reported.push(ReportedWorld {
            label,
            world,
            score,
            frequency,
            raw_count,
            committed,
        });
    }

    Ok(reported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::NoDeadline;
    use crate::error::MlnError;
    use crate::model::{Atom, Partition};
    use crate::oracle::ClauseCostOracle;
    use crate::sink::MemorySink;

    struct RejectingSink;

    impl ResultSink for RejectingSink {
        fn commit(&mut self, _world: &World, label: &str) -> Result<()> {
            Err(MlnError::Sink {
                label: label.to_string(),
                reason: "read-only".to_string(),
            })
        }
    }

    fn wide_component(n: u32) -> Vec<Component> {
        let p = Partition::new(0, (1..=n).map(Atom::query).collect(), vec![]).unwrap();
        vec![Component::new(vec![p])]
    }

    #[test]
    fn test_select_strategy() {
        let components = wide_component(5);
        let target = World::from_atoms(1..=5);
        let mut config = InferenceConfig::default();
        assert_eq!(
            select_strategy(&components, &target, &config),
            InferenceStrategy::Exact
        );
        config.exact_threshold_bits = 4;
        assert_eq!(
            select_strategy(&components, &target, &config),
            InferenceStrategy::Sampling
        );
        assert_eq!(select_strategy(&[], &target, &config), InferenceStrategy::Exact);
    }

    #[test]
    fn test_topk_report_commits_labels() {
        let candidates = vec![
            vec![
                Candidate::new(World::from_atoms([1]), 3.0),
                Candidate::new(World::new(), 1.0),
            ],
            vec![Candidate::new(World::from_atoms([2]), 2.0)],
        ];
        let config = InferenceConfig {
            weighted_sampling: false,
            ..InferenceConfig::default()
        };
        let mut sink = MemorySink::new();
        let reported = flush_top_worlds(
            &[],
            &candidates,
            &ClauseCostOracle::default(),
            &NoDeadline,
            &config,
            &mut sink,
        )
        .unwrap();

        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].label, "mle_rs_0");
        assert_eq!(sink.get("mle_rs_0"), Some(&World::from_atoms([1, 2])));
        assert!((reported[0].score - 0.75).abs() < 1e-12);
        assert_eq!(reported[0].frequency, Some(6.0));
        assert_eq!(reported[1].frequency, Some(2.0));
        assert!(reported.iter().all(|r| r.raw_count.is_none()));
        assert!(reported.iter().all(|r| r.committed));
    }

    #[test]
    fn test_sink_failure_is_flagged_not_fatal() {
        let config = InferenceConfig {
            importance_draws: 200,
            seed: Some(9),
            ..InferenceConfig::default()
        };
        let reported = flush_top_worlds(
            &wide_component(2),
            &[],
            &ClauseCostOracle::default(),
            &NoDeadline,
            &config,
            &mut RejectingSink,
        )
        .unwrap();
        assert!(!reported.is_empty());
        assert!(reported.iter().all(|r| !r.committed));
        assert!(reported.iter().all(|r| r.raw_count.is_some()));
        assert!(reported.iter().all(|r| r.frequency.is_none()));
    }
}
