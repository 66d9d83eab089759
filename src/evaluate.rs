//! Test-set evaluation
//!
//! Scores predictions against the untouched test labels. Accuracy alone is
//! misleading here: with failures in well under 1% of rows, predicting
//! `NONE` everywhere scores above 99%. The report therefore always carries
//! per-class precision/recall and the majority-class baseline.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::label::{ClassCounts, Label};
use crate::{Error, Result};

/// Multi-class confusion matrix; rows are actual classes, columns predicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    classes: Vec<Label>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tally `actual` against `predicted`. The class axis is the union of
    /// both label sets, in label order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Model`] if the slices differ in length.
    pub fn from_predictions(actual: &[Label], predicted: &[Label]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(Error::Model(format!(
                "{} actual labels but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }

        let classes: Vec<Label> = actual
            .iter()
            .chain(predicted)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut counts = vec![vec![0; classes.len()]; classes.len()];
        for (a, p) in actual.iter().zip(predicted) {
            let row = classes.binary_search(a).unwrap_or_default();
            let col = classes.binary_search(p).unwrap_or_default();
            counts[row][col] += 1;
        }

        Ok(Self { classes, counts })
    }

    /// Class axis, in label order.
    #[must_use]
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    /// Rows of `actual` predicted as `predicted`.
    #[must_use]
    pub fn count(&self, actual: &Label, predicted: &Label) -> usize {
        match (
            self.classes.binary_search(actual),
            self.classes.binary_search(predicted),
        ) {
            (Ok(row), Ok(col)) => self.counts[row][col],
            _ => 0,
        }
    }

    /// Total rows tallied.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Rows on the diagonal.
    #[must_use]
    pub fn correct(&self) -> usize {
        (0..self.classes.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Overall accuracy; zero for an empty matrix.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Per-class precision, recall, F1 and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.classes.len())
            .map(|i| {
                let tp = self.counts[i][i];
                let support: usize = self.counts[i].iter().sum();
                let predicted: usize = self.counts.iter().map(|row| row[i]).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: self.classes[i].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.as_str().len())
            .chain(self.counts.iter().flatten().map(|n| n.to_string().len()))
            .chain(std::iter::once("actual\\pred".len()))
            .max()
            .unwrap_or(6);

        write!(f, "{:>width$}", "actual\\pred")?;
        for class in &self.classes {
            write!(f, " {:>width$}", class.as_str())?;
        }
        writeln!(f)?;
        for (class, row) in self.classes.iter().zip(&self.counts) {
            write!(f, "{:>width$}", class.as_str())?;
            for n in row {
                write!(f, " {n:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Precision/recall summary of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    /// Class
    pub label: Label,
    /// Fraction of predictions of this class that were right
    pub precision: f64,
    /// Fraction of rows of this class that were found
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
    /// Actual rows of this class
    pub support: usize,
}

impl fmt::Display for ClassMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: prec={:.4} rec={:.4} f1={:.4} (n={})",
            self.label, self.precision, self.recall, self.f1, self.support
        )
    }
}

/// Evaluation of a model on the test split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Confusion matrix
    pub confusion: ConfusionMatrix,
    /// Overall accuracy
    pub accuracy: f64,
    /// Accuracy of always predicting the most frequent test class
    pub majority_baseline: f64,
    /// Per-class metrics, in label order
    pub per_class: Vec<ClassMetrics>,
}

impl Evaluation {
    /// Score `predicted` against `actual`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Model`] if the slices differ in length.
    pub fn new(actual: &[Label], predicted: &[Label]) -> Result<Self> {
        let confusion = ConfusionMatrix::from_predictions(actual, predicted)?;
        let baseline = ClassCounts::from_labels(actual)
            .majority()
            .map_or(0.0, |(_, count)| ratio(count, actual.len()));

        Ok(Self {
            accuracy: confusion.accuracy(),
            majority_baseline: baseline,
            per_class: confusion.class_metrics(),
            confusion,
        })
    }

    /// Mean recall over the classes present in the test labels.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn macro_recall(&self) -> f64 {
        let present: Vec<f64> = self
            .per_class
            .iter()
            .filter(|m| m.support > 0)
            .map(|m| m.recall)
            .collect();
        if present.is_empty() {
            0.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        }
    }

    /// True if the model is more accurate than the majority baseline.
    #[must_use]
    pub fn beats_baseline(&self) -> bool {
        self.accuracy > self.majority_baseline
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.confusion)?;
        writeln!(
            f,
            "accuracy={:.4} majority_baseline={:.4} macro_recall={:.4}",
            self.accuracy,
            self.majority_baseline,
            self.macro_recall()
        )?;
        for metrics in &self.per_class {
            writeln!(f, "  {metrics}")?;
        }
        Ok(())
    }
}
