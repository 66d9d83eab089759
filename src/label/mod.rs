//! Label assignment
//!
//! Turns records into `(features, label)` rows under a forecast horizon `w`:
//!
//! ```text
//! label = failure  if rul is known and rul < w
//!         NONE     otherwise
//! ```
//!
//! The comparison is strict: a record exactly `w` cycles from failure is
//! `NONE`. Identifier and target columns (`machineID`, `cycle`,
//! `sequenceID`, `rul`, `failure`) never reach the feature vector; the
//! `entryID` travels beside the features as a row key.

mod truncate;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::{Dataset, Record};

pub use truncate::{truncate_censored_tails, TailTruncation, Truncation};

/// Wire spelling of the no-failure class
pub const NONE_LABEL: &str = "NONE";

/// Classification target of one record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    /// No failure within the horizon
    None,
    /// Failure of the given type within the horizon
    Failure(String),
}

impl Label {
    /// Label of a single record under horizon `horizon`.
    #[must_use]
    pub fn for_record(record: &Record, horizon: u32) -> Self {
        match record.rul {
            Some(rul) if rul < horizon && !record.failure.is_empty() => {
                Self::Failure(record.failure.clone())
            }
            _ => Self::None,
        }
    }

    /// True for the no-failure class.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Wire spelling: the failure code or `NONE`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NONE_LABEL,
            Self::Failure(code) => code,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        if value == NONE_LABEL {
            Self::None
        } else {
            Self::Failure(value)
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        match label {
            Label::None => NONE_LABEL.to_string(),
            Label::Failure(code) => code,
        }
    }
}

/// Per-class row counts, ordered by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts(BTreeMap<Label, usize>);

impl ClassCounts {
    /// Count the given labels.
    #[must_use]
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        let mut counts = BTreeMap::new();
        for label in labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Count for one class (zero if absent).
    #[must_use]
    pub fn get(&self, label: &Label) -> usize {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Iterate `(label, count)` in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&Label, usize)> {
        self.0.iter().map(|(label, &count)| (label, count))
    }

    /// Number of distinct classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.0.len()
    }

    /// Total rows counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Most frequent class and its count; ties go to the smaller label.
    #[must_use]
    pub fn majority(&self) -> Option<(&Label, usize)> {
        self.iter()
            .fold(None, |best, (label, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((label, count)),
            })
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(label, count)| format!("{label}:{count}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Feature vectors with their labels.
///
/// Stored column-wise so that trainers and evaluators borrow the feature
/// matrix and label vector without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSet {
    feature_names: Arc<[String]>,
    entry_ids: Vec<Option<i64>>,
    features: Vec<Vec<f64>>,
    labels: Vec<Label>,
}

impl LabeledSet {
    /// Empty set with the given feature layout.
    #[must_use]
    pub fn new(feature_names: impl Into<Arc<[String]>>) -> Self {
        Self {
            feature_names: feature_names.into(),
            entry_ids: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Append one row. Synthetic rows have no `entry_id`.
    pub fn push(&mut self, entry_id: Option<i64>, features: Vec<f64>, label: Label) {
        self.entry_ids.push(entry_id);
        self.features.push(features);
        self.labels.push(label);
    }

    /// Feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Row keys; `None` for synthetic rows.
    #[must_use]
    pub fn entry_ids(&self) -> &[Option<i64>] {
        &self.entry_ids
    }

    /// Feature matrix, one vector per row.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Labels, one per row.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Per-class row counts.
    #[must_use]
    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.labels)
    }
}

/// Label every record of `dataset` under horizon `horizon`.
///
/// Pure mapping: the dataset is not modified and row order is preserved.
#[must_use]
pub fn assign_labels(dataset: &Dataset, horizon: u32) -> LabeledSet {
    let mut labeled = LabeledSet::new(dataset.feature_names_arc());
    for record in dataset.records() {
        labeled.push(
            Some(record.entry_id),
            record.features.clone(),
            Label::for_record(record, horizon),
        );
    }
    labeled
}
