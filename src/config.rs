//! Pipeline configuration
//!
//! One validated value carries every knob of a run. The split strategy is
//! chosen here, once, and flows through the pipeline as a tagged variant.

use serde::{Deserialize, Serialize};

use crate::label::TailTruncation;
use crate::model::forest::ForestConfig;
use crate::partition::SplitStrategy;
use crate::{Error, Result};

/// Default forecast horizon in cycles
pub const DEFAULT_HORIZON: u32 = 7;
/// Default rolling-window width minus one
pub const DEFAULT_LOOKBACK: u32 = 5;
/// Default held-out fraction
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
/// Default random seed
pub const DEFAULT_SEED: u64 = 42;
/// Default SMOTE neighbour count
pub const DEFAULT_NEIGHBORS: usize = 5;
/// Default number of test rows persisted as a scoring sample
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Validated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    horizon: u32,
    split: SplitStrategy,
    test_size: f64,
    seed: u64,
    neighbors: usize,
    tail_truncation: TailTruncation,
    sample_rows: usize,
    forest: ForestConfig,
}

impl PipelineConfig {
    /// Create a builder pre-filled with defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Forecast horizon `w` in cycles.
    #[must_use]
    pub const fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Partition strategy.
    #[must_use]
    pub const fn split(&self) -> &SplitStrategy {
        &self.split
    }

    /// Held-out fraction of records (time split) or machines (asset split).
    #[must_use]
    pub const fn test_size(&self) -> f64 {
        self.test_size
    }

    /// Seed for the asset split, SMOTE, sampling and the forest.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// SMOTE neighbour count `k`.
    #[must_use]
    pub const fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Censored-tail truncation policy.
    #[must_use]
    pub const fn tail_truncation(&self) -> TailTruncation {
        self.tail_truncation
    }

    /// Rows of the test features persisted as a scoring sample.
    #[must_use]
    pub const fn sample_rows(&self) -> usize {
        self.sample_rows
    }

    /// Reference classifier settings.
    #[must_use]
    pub const fn forest(&self) -> &ForestConfig {
        &self.forest
    }

    /// Check every constraint. Called by the builder; also usable on
    /// deserialized configurations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(Error::InvalidConfiguration(
                "horizon must be a positive number of cycles".to_string(),
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "test_size must lie strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        if self.neighbors == 0 {
            return Err(Error::InvalidConfiguration(
                "neighbors must be at least 1".to_string(),
            ));
        }
        if self.sample_rows == 0 {
            return Err(Error::InvalidConfiguration(
                "sample_rows must be at least 1".to_string(),
            ));
        }
        self.forest.validate()
    }
}

/// Builder for `PipelineConfig`.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    horizon: u32,
    split: SplitStrategy,
    test_size: f64,
    seed: u64,
    neighbors: usize,
    tail_truncation: TailTruncation,
    sample_rows: usize,
    forest: ForestConfig,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            split: SplitStrategy::TimeOrdered {
                lookback: DEFAULT_LOOKBACK,
            },
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            neighbors: DEFAULT_NEIGHBORS,
            tail_truncation: TailTruncation::Disabled,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            forest: ForestConfig::default(),
        }
    }
}

impl PipelineConfigBuilder {
    /// Set the forecast horizon `w`.
    #[must_use]
    pub const fn horizon(mut self, horizon: u32) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the split strategy.
    #[must_use]
    pub const fn split(mut self, split: SplitStrategy) -> Self {
        self.split = split;
        self
    }

    /// Use the time-ordered split with the given lookback.
    #[must_use]
    pub const fn time_split(self, lookback: u32) -> Self {
        self.split(SplitStrategy::TimeOrdered { lookback })
    }

    /// Use the asset-identifier split.
    #[must_use]
    pub const fn asset_split(self) -> Self {
        self.split(SplitStrategy::AssetId)
    }

    /// Set the held-out fraction.
    #[must_use]
    pub const fn test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the SMOTE neighbour count.
    #[must_use]
    pub const fn neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Set the censored-tail truncation policy.
    #[must_use]
    pub const fn tail_truncation(mut self, tail_truncation: TailTruncation) -> Self {
        self.tail_truncation = tail_truncation;
        self
    }

    /// Set the number of persisted sample rows.
    #[must_use]
    pub const fn sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows;
        self
    }

    /// Set the reference classifier settings.
    #[must_use]
    pub fn forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if any value is out of range.
    pub fn build(self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            horizon: self.horizon,
            split: self.split,
            test_size: self.test_size,
            seed: self.seed,
            neighbors: self.neighbors,
            tail_truncation: self.tail_truncation,
            sample_rows: self.sample_rows,
            forest: self.forest,
        };
        config.validate()?;
        Ok(config)
    }
}
