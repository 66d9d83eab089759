//! Random forest reference classifier
//!
//! Bootstrap-sampled CART trees voting by majority. Each tree draws from its
//! own ChaCha8 stream derived from the training seed, so the fitted forest is
//! identical whether trees are fitted sequentially or in parallel.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::tree::{DecisionTree, TreeConfig};
use super::{Classifier, Trainer};
use crate::label::Label;
use crate::{Error, Result};

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples needed to split a node
    pub min_samples_split: usize,
    /// Candidate features per split; `None` means `sqrt(n_features)`
    pub max_features: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 16,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

impl ForestConfig {
    /// Check the hyper-parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for zero trees, zero depth or
    /// a split minimum below two.
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(Error::InvalidConfiguration(
                "forest needs at least one tree".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidConfiguration(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(Error::InvalidConfiguration(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(Error::InvalidConfiguration(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    #[allow(clippy::cast_precision_loss)]
    fn tree_config(&self, n_features: usize) -> TreeConfig {
        let sqrt = (n_features as f64).sqrt().round() as usize;
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features.unwrap_or(sqrt).max(1),
        }
    }
}

/// Fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    classes: Vec<Label>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Classes the forest can predict, in index order.
    #[must_use]
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    /// Number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature width expected by [`Classifier::predict`].
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    fn vote(&self, row: &[f64]) -> usize {
        let mut votes = vec![0usize; self.classes.len()];
        for tree in &self.trees {
            votes[tree.predict_one(row)] += 1;
        }
        // Ties go to the lower class index
        votes
            .iter()
            .enumerate()
            .fold((0, 0), |best, (class, &n)| if n > best.1 { (class, n) } else { best })
            .0
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Label>> {
        features
            .iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != self.n_features {
                    return Err(Error::Model(format!(
                        "row {row} has {} features, model expects {}",
                        values.len(),
                        self.n_features
                    )));
                }
                Ok(self.classes[self.vote(values)].clone())
            })
            .collect()
    }
}

/// Trains [`RandomForest`] models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomForestTrainer {
    config: ForestConfig,
}

impl RandomForestTrainer {
    /// Create a trainer with the given hyper-parameters.
    #[must_use]
    pub const fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Hyper-parameters.
    #[must_use]
    pub const fn config(&self) -> &ForestConfig {
        &self.config
    }
}

/// Seed of tree `tree` in a forest trained with `seed`.
const fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl Trainer for RandomForestTrainer {
    type Model = RandomForest;

    fn train(&self, features: &[Vec<f64>], labels: &[Label], seed: u64) -> Result<RandomForest> {
        self.config.validate()?;
        if features.len() != labels.len() {
            return Err(Error::Model(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if features.is_empty() {
            return Err(Error::Model("cannot train on an empty training set".to_string()));
        }

        let n_features = features[0].len();
        if let Some(row) = features.iter().position(|f| f.len() != n_features) {
            return Err(Error::Model(format!(
                "row {row} has {} features, expected {n_features}",
                features[row].len()
            )));
        }

        let classes: Vec<Label> = labels.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();
        let tree_config = self.config.tree_config(n_features);
        let n = features.len();

        let fit_tree = |tree: usize| {
            let mut rng = ChaCha8Rng::seed_from_u64(tree_seed(seed, tree));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            DecisionTree::fit(features, &targets, classes.len(), sample, tree_config, &mut rng)
        };

        #[cfg(feature = "rayon")]
        let trees: Vec<DecisionTree> = (0..self.config.n_trees).into_par_iter().map(fit_tree).collect();
        #[cfg(not(feature = "rayon"))]
        let trees: Vec<DecisionTree> = (0..self.config.n_trees).map(fit_tree).collect();

        info!(
            trees = trees.len(),
            rows = n,
            features = n_features,
            classes = classes.len(),
            "fitted random forest"
        );
        Ok(RandomForest {
            classes,
            n_features,
            trees,
        })
    }
}
