//! Time-ordered split with a per-machine leakage exclusion zone

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use super::{check_fraction, held_out, Partition, Partitioner};
use crate::record::Dataset;
use crate::Result;

/// Chronological split on `entryID`.
///
/// The last `ceil(n * test_fraction)` records (by `entryID`) form the test
/// set. For each machine with test records, every candidate-train record
/// with `cycle >= min_test_cycle - lookback` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOrderedSplit {
    lookback: u32,
}

impl TimeOrderedSplit {
    /// Create a split with the given rolling-window lookback.
    #[must_use]
    pub const fn new(lookback: u32) -> Self {
        Self { lookback }
    }
}

impl Partitioner for TimeOrderedSplit {
    fn partition(&self, dataset: &Dataset, test_fraction: f64, _seed: u64) -> Result<Partition> {
        check_fraction(test_fraction)?;

        let sorted = dataset.sorted_by_entry_id();
        let records = sorted.records();
        let cut = records.len() - held_out(records.len(), test_fraction);
        let (candidate_train, test) = records.split_at(cut);

        let mut min_test_cycle: BTreeMap<&str, i64> = BTreeMap::new();
        for record in test {
            min_test_cycle
                .entry(record.machine_id.as_str())
                .and_modify(|c| *c = (*c).min(record.cycle))
                .or_insert(record.cycle);
        }

        let lookback = i64::from(self.lookback);
        let train: Vec<_> = candidate_train
            .iter()
            .filter(|record| {
                min_test_cycle
                    .get(record.machine_id.as_str())
                    .map_or(true, |&first| record.cycle < first - lookback)
            })
            .cloned()
            .collect();

        let before: BTreeSet<&str> = candidate_train.iter().map(|r| r.machine_id.as_str()).collect();
        let after: BTreeSet<&str> = train.iter().map(|r| r.machine_id.as_str()).collect();
        let degenerate_machines: Vec<String> =
            before.difference(&after).map(|m| (*m).to_string()).collect();
        for machine in &degenerate_machines {
            warn!(
                machine = machine.as_str(),
                min_test_cycle = ?min_test_cycle.get(machine.as_str()),
                lookback = self.lookback,
                "degenerate split: machine has no training rows after leakage exclusion"
            );
        }

        let excluded = candidate_train.len() - train.len();
        info!(
            train = train.len(),
            test = test.len(),
            excluded,
            lookback = self.lookback,
            "time-ordered split"
        );

        Ok(Partition {
            train: dataset.with_records(train),
            test: dataset.with_records(test.to_vec()),
            excluded,
            degenerate_machines,
        })
    }
}
