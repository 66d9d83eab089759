//! Class balancing by synthetic minority oversampling (SMOTE)
//!
//! Every minority class is grown to the majority-class count with synthetic
//! rows interpolated between a real sample and one of its `k` nearest
//! same-class neighbours:
//!
//! ```text
//! synthetic = x + gap * (neighbour - x),   gap ~ U[0, 1)
//! ```
//!
//! Only ever applied to the training split; the test split must keep the
//! population class distribution.
//!
//! Determinism: the output is a pure function of the input rows, `k` and the
//! seed. Neighbours use Euclidean distance on the raw feature values, so the
//! result also depends on feature scale; standardize upstream if features
//! live on very different ranges.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::label::{ClassCounts, Label, LabeledSet};
use crate::{Error, Result};

/// Class counts around a balancing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    /// Counts of the input rows
    pub before: ClassCounts,
    /// Counts of the output rows
    pub after: ClassCounts,
    /// Synthetic rows added
    pub synthetic: usize,
}

/// Seeded SMOTE oversampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smote {
    neighbors: usize,
    seed: u64,
}

impl Smote {
    /// Create an oversampler using `neighbors` nearest neighbours.
    #[must_use]
    pub const fn new(neighbors: usize, seed: u64) -> Self {
        Self { neighbors, seed }
    }

    /// Neighbour count `k`.
    #[must_use]
    pub const fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Oversample every minority class of `train` to the majority count.
    ///
    /// Original rows come first, in input order, followed by the synthetic
    /// rows of each minority class in label order. Synthetic rows carry no
    /// `entry_id`. An empty or single-class input is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientSamples`] if a minority class has fewer
    /// than `neighbors + 1` rows.
    pub fn balance(&self, train: &LabeledSet) -> Result<(LabeledSet, BalanceReport)> {
        let before = train.class_counts();
        let Some((_, target)) = before.majority() else {
            return Ok((train.clone(), report(before, train, 0)));
        };

        let required = self.neighbors + 1;
        let minorities: Vec<(Label, usize)> = before
            .iter()
            .filter(|&(_, count)| count < target)
            .map(|(label, count)| (label.clone(), count))
            .collect();
        if let Some((label, count)) = minorities.iter().find(|(_, count)| *count < required) {
            return Err(Error::InsufficientSamples {
                class: label.to_string(),
                count: *count,
                required,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut balanced = train.clone();
        for (label, count) in &minorities {
            let members: Vec<&[f64]> = train
                .features()
                .iter()
                .zip(train.labels())
                .filter(|(_, l)| *l == label)
                .map(|(f, _)| f.as_slice())
                .collect();
            let neighbours = nearest_neighbours(&members, self.neighbors);

            let needed = target - count;
            for _ in 0..needed {
                let sample = rng.gen_range(0..members.len());
                let neighbour = neighbours[sample][rng.gen_range(0..self.neighbors)];
                let gap: f64 = rng.gen();
                let synthetic = members[sample]
                    .iter()
                    .zip(members[neighbour])
                    .map(|(x, n)| x + gap * (n - x))
                    .collect();
                balanced.push(None, synthetic, label.clone());
            }
            debug!(class = %label, original = count, synthetic = needed, "oversampled class");
        }

        let synthetic = balanced.len() - train.len();
        let result = report(before, &balanced, synthetic);
        info!(
            before = %result.before,
            after = %result.after,
            synthetic,
            neighbors = self.neighbors,
            "balanced training classes"
        );
        Ok((balanced, result))
    }
}

fn report(before: ClassCounts, output: &LabeledSet, synthetic: usize) -> BalanceReport {
    BalanceReport {
        before,
        after: output.class_counts(),
        synthetic,
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// For each member, indices of its `k` nearest other members (ties by index).
fn nearest_neighbours(members: &[&[f64]], k: usize) -> Vec<Vec<usize>> {
    members
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let mut candidates: Vec<(f64, usize)> = members
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, other)| (squared_distance(point, other), j))
                .collect();
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            candidates.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}
