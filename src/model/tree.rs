//! CART decision tree (Gini impurity)
//!
//! Nodes live in a flat arena; children are referenced by index. Targets are
//! class indices in `0..n_classes`.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum depth (root is depth 0)
    pub max_depth: usize,
    /// Minimum samples a node needs to be split
    pub min_samples_split: usize,
    /// Candidate features drawn per split
    pub max_features: usize,
}

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node predicting a class index
    Leaf {
        /// Predicted class index
        class: usize,
    },
    /// Internal node: `row[feature] <= threshold` goes left
    Split {
        /// Feature index
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left child index
        left: usize,
        /// Right child index
        right: usize,
    },
}

/// Fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Fit<'a, R> {
    features: &'a [Vec<f64>],
    targets: &'a [usize],
    n_classes: usize,
    config: TreeConfig,
    rng: &'a mut R,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Fit a tree on the rows listed in `sample` (duplicates allowed, as in a
    /// bootstrap sample).
    ///
    /// `sample` must be non-empty and every target must be `< n_classes`.
    pub fn fit<R: Rng>(
        features: &[Vec<f64>],
        targets: &[usize],
        n_classes: usize,
        sample: Vec<usize>,
        config: TreeConfig,
        rng: &mut R,
    ) -> Self {
        let mut fit = Fit {
            features,
            targets,
            n_classes,
            config,
            rng,
            nodes: Vec::new(),
        };
        fit.grow(sample, 0);
        Self { nodes: fit.nodes }
    }

    /// Predicted class index for one row.
    #[must_use]
    pub fn predict_one(&self, row: &[f64]) -> usize {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

/// `n * gini` for the given class counts: `n - sum(c^2) / n`.
#[allow(clippy::cast_precision_loss)]
fn weighted_gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts.iter().map(|&c| (c * c) as f64).sum();
    n as f64 - sum_sq / n as f64
}

fn majority_class(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (class, &count)| {
            if count > best.1 {
                (class, count)
            } else {
                best
            }
        })
        .0
}

impl<R: Rng> Fit<'_, R> {
    fn counts(&self, sample: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in sample {
            counts[self.targets[i]] += 1;
        }
        counts
    }

    /// Grow the subtree for `sample`; returns its node index.
    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let counts = self.counts(&sample);
        let at = self.nodes.len();
        self.nodes.push(Node::Leaf {
            class: majority_class(&counts),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= self.config.max_depth || sample.len() < self.config.min_samples_split
        {
            return at;
        }

        let parent = weighted_gini(&counts, sample.len());
        let Some(best) = self.best_split(&sample) else {
            return at;
        };
        if best.impurity >= parent - 1e-12 {
            return at;
        }

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.features[i][best.feature] <= best.threshold);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[at] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        at
    }

    fn best_split(&mut self, sample: &[usize]) -> Option<BestSplit> {
        let n_features = self.features.first().map_or(0, Vec::len);
        if n_features == 0 {
            return None;
        }
        let drawn = self.config.max_features.clamp(1, n_features);
        let candidates = index::sample(&mut *self.rng, n_features, drawn).into_vec();

        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = sample.to_vec();
        for feature in candidates {
            order.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let mut left = vec![0; self.n_classes];
            let mut right = self.counts(&order);
            for split in 1..order.len() {
                let moved = self.targets[order[split - 1]];
                left[moved] += 1;
                right[moved] -= 1;

                let lo = self.features[order[split - 1]][feature];
                let hi = self.features[order[split]][feature];
                if lo >= hi || !lo.is_finite() || !hi.is_finite() {
                    continue;
                }

                let impurity =
                    weighted_gini(&left, split) + weighted_gini(&right, order.len() - split);
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}
