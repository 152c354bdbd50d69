//! Inference configuration.
//!
//! Loaded from TOML; every field has a default, so a partial file (or an
//! empty one) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MlnError, Result};

/// Tunables for enumeration, sampling and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Refuse to enumerate partitions with more free atoms than this
    pub max_enumeration_bits: Option<usize>,

    /// Largest per-partition free-atom count for which exact inference is chosen
    pub exact_threshold_bits: usize,

    /// Deadline is polled every this many loop iterations
    pub deadline_poll_interval: u64,

    /// Importance sampling draw count
    pub importance_draws: usize,

    /// Draws per parallel importance-sampling chunk
    pub importance_chunk_size: usize,

    /// Number of ranked worlds kept from importance sampling
    pub importance_report_top: usize,

    /// Exact (cache-backed) sampling draw count
    pub exact_draws: usize,

    /// Number of tallied worlds kept from exact sampling
    pub exact_report_top: usize,

    /// Per-partition candidate bound for top-k combination
    pub mle_top_k: usize,

    /// Report top worlds via importance sampling instead of top-k combination
    pub weighted_sampling: bool,

    /// RNG seed; `None` draws a fresh seed per run
    pub seed: Option<u64>,

    /// Default tracing filter directive
    pub log_level: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_enumeration_bits: None,
            exact_threshold_bits: 20,
            deadline_poll_interval: 1024,
            importance_draws: 100_000,
            importance_chunk_size: 4096,
            importance_report_top: 100,
            exact_draws: 1000,
            exact_report_top: 10,
            mle_top_k: 10,
            weighted_sampling: true,
            seed: None,
            log_level: "info".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MlnError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MlnError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MlnError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject values that would make loops degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.deadline_poll_interval == 0 {
            return Err(MlnError::Config(
                "deadline_poll_interval must be positive".to_string(),
            ));
        }
        if self.importance_chunk_size == 0 {
            return Err(MlnError::Config(
                "importance_chunk_size must be positive".to_string(),
            ));
        }
        if self.mle_top_k == 0 {
            return Err(MlnError::Config("mle_top_k must be positive".to_string()));
        }
        Ok(())
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the enumeration guard.
    pub fn with_max_enumeration_bits(mut self, max: usize) -> Self {
        self.max_enumeration_bits = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.importance_draws, 100_000);
        assert_eq!(config.importance_report_top, 100);
        assert_eq!(config.exact_draws, 1000);
        assert!(config.max_enumeration_bits.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = InferenceConfig::from_toml_str("seed = 7\nmle_top_k = 3\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.mle_top_k, 3);
        assert_eq!(config.exact_report_top, 10);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = InferenceConfig::default().with_max_enumeration_bits(12);
        let toml_str = config.to_toml_string().unwrap();
        let back = InferenceConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_builders() {
        let config = InferenceConfig::default()
            .with_seed(42)
            .with_max_enumeration_bits(8);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_enumeration_bits, Some(8));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let err = InferenceConfig::from_toml_str("deadline_poll_interval = 0").unwrap_err();
        assert!(matches!(err, MlnError::Config(_)));
    }
}
