//! Metric Record - evaluation scores of a run

use serde::{Deserialize, Serialize};

use crate::evaluate::Evaluation;

/// One evaluation score, optionally scoped to a class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    class: Option<String>,
    value: f64,
}

impl MetricRecord {
    /// Create a run-level metric.
    #[must_use]
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            class: None,
            value,
        }
    }

    /// Scope the metric to one class.
    #[must_use]
    pub fn for_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the class the metric is scoped to, if any.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Flatten an evaluation into metric records: run-level scores first,
    /// then precision/recall/f1/support per class in label order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_evaluation(evaluation: &Evaluation) -> Vec<Self> {
        let mut metrics = vec![
            Self::new("accuracy", evaluation.accuracy),
            Self::new("majority_baseline", evaluation.majority_baseline),
            Self::new("macro_recall", evaluation.macro_recall()),
        ];
        for class in &evaluation.per_class {
            let label = class.label.as_str();
            metrics.push(Self::new("precision", class.precision).for_class(label));
            metrics.push(Self::new("recall", class.recall).for_class(label));
            metrics.push(Self::new("f1", class.f1).for_class(label));
            metrics.push(Self::new("support", class.support as f64).for_class(label));
        }
        metrics
    }
}
