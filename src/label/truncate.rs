//! Censored-tail truncation
//!
//! The last `w` cycles of a run that has not (yet) failed cannot be labelled
//! honestly: the machine might fail right after the observation window ends.
//! Dropping them removes rows that would otherwise be indistinguishable false
//! negatives. Runs are identified by `(machineID, sequenceID)`, since
//! sequence ids are local to a machine; a run counts as failing when any of
//! its records carries a failure code or a RUL.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::partition::SplitStrategy;
use crate::record::Dataset;

/// When to drop censored run tails before partitioning.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TailTruncation {
    /// Keep every record
    #[default]
    Disabled,
    /// Truncate regardless of split strategy
    Always,
    /// Truncate only when the time-ordered split is selected
    TimeSplitOnly,
}

impl TailTruncation {
    /// Whether truncation runs for the given split strategy.
    #[must_use]
    pub const fn applies_to(self, split: &SplitStrategy) -> bool {
        match self {
            Self::Disabled => false,
            Self::Always => true,
            Self::TimeSplitOnly => matches!(split, SplitStrategy::TimeOrdered { .. }),
        }
    }
}

/// Outcome of [`truncate_censored_tails`].
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Dataset without the censored tails
    pub dataset: Dataset,
    /// Records removed
    pub removed: usize,
    /// Non-failing runs that were truncated
    pub censored_runs: usize,
}

/// Drop the trailing `min(run_length, horizon)` cycles of every run that
/// does not end in failure. Dataset-wide; order of the kept records is
/// preserved.
#[must_use]
pub fn truncate_censored_tails(dataset: &Dataset, horizon: u32) -> Truncation {
    let mut runs: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    let mut failing: HashSet<(&str, &str)> = HashSet::new();

    for (index, record) in dataset.records().iter().enumerate() {
        let run = (record.machine_id.as_str(), record.sequence_id.as_str());
        runs.entry(run).or_default().push(index);
        if !record.failure.is_empty() || record.rul.is_some() {
            failing.insert(run);
        }
    }

    let tail = horizon as usize;
    let mut dropped = vec![false; dataset.len()];
    let mut censored_runs = 0;
    for (run, mut indices) in runs {
        if failing.contains(&run) {
            continue;
        }
        censored_runs += 1;
        indices.sort_by_key(|&i| dataset.records()[i].cycle);
        let keep = indices.len().saturating_sub(tail);
        for &i in &indices[keep..] {
            dropped[i] = true;
        }
    }

    let records = dataset
        .records()
        .iter()
        .zip(&dropped)
        .filter(|(_, drop)| !**drop)
        .map(|(record, _)| record.clone())
        .collect::<Vec<_>>();
    let removed = dataset.len() - records.len();

    info!(removed, censored_runs, horizon, "truncated censored run tails");
    Truncation {
        dataset: dataset.with_records(records),
        removed,
        censored_runs,
    }
}
