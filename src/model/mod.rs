//! Classifier seam
//!
//! The pipeline only needs two capabilities from a classifier:
//!
//! ```text
//! Trainer::train(features, labels, seed) -> Model
//! Classifier::predict(model, features)   -> labels
//! ```
//!
//! Any algorithm implementing [`Trainer`] can be swapped in. The crate ships
//! a seeded random forest ([`forest::RandomForestTrainer`]) as the reference
//! implementation.

pub mod forest;
pub mod tree;

use serde::Serialize;

use crate::label::Label;
use crate::Result;

/// A fitted model that maps feature vectors to labels.
pub trait Classifier {
    /// Predict one label per feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Model`] if a feature vector has the wrong width.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Label>>;
}

/// Fits a [`Classifier`] from labelled feature vectors.
pub trait Trainer {
    /// Fitted model type; serializable so it can be persisted.
    type Model: Classifier + Serialize;

    /// Fit a model. Equal inputs and seed must give an equal model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Model`] if the inputs cannot be fitted
    /// (empty, or features and labels of different lengths).
    fn train(&self, features: &[Vec<f64>], labels: &[Label], seed: u64) -> Result<Self::Model>;
}
