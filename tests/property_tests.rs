//! Property-based tests for the preparation stages
//!
//! - Partitions are disjoint and never invent records
//! - No training row falls inside a test machine's exclusion zone
//! - Asset splits never share a machine
//! - Balancing equalizes every class at the majority count
//! - Labels follow the strict horizon rule

use std::collections::{BTreeMap, HashSet};

use failure_forecast::balance::Smote;
use failure_forecast::label::{Label, LabeledSet};
use failure_forecast::partition::{Partitioner, SplitStrategy};
use failure_forecast::record::{Dataset, Record};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Fleet of 1-5 machines with 1-40 cycles each; entry ids in global time order.
fn arb_dataset() -> impl Strategy<Value = Dataset> {
    proptest::collection::vec(1i64..40, 1..=5).prop_map(|lengths| {
        let longest = lengths.iter().copied().max().unwrap_or(0);
        let mut records = Vec::new();
        let mut entry_id = 0;
        for cycle in 0..longest {
            for (machine, &length) in lengths.iter().enumerate() {
                if cycle >= length {
                    continue;
                }
                let rul = u32::try_from(length - 1 - cycle).unwrap();
                records.push(Record {
                    entry_id,
                    machine_id: format!("m{machine}"),
                    cycle,
                    sequence_id: format!("m{machine}-0"),
                    rul: Some(rul),
                    failure: "F1".to_string(),
                    features: vec![f64::from(rul)],
                });
                entry_id += 1;
            }
        }
        Dataset::new(vec!["x".to_string()], records)
    })
}

/// Labelled rows with 2-4 classes of 6-60 rows each.
fn arb_labeled() -> impl Strategy<Value = LabeledSet> {
    proptest::collection::vec(6usize..60, 2..=4).prop_map(|sizes| {
        let mut set = LabeledSet::new(vec!["a".to_string(), "b".to_string()]);
        let mut id = 0;
        for (class, size) in sizes.into_iter().enumerate() {
            let label = if class == 0 {
                Label::None
            } else {
                Label::Failure(format!("F{class}"))
            };
            for i in 0..size {
                let x = (i * 7 % 13) as f64 + class as f64 * 100.0;
                set.push(Some(id), vec![x, x.sqrt()], label.clone());
                id += 1;
            }
        }
        set
    })
}

fn ids(dataset: &Dataset) -> HashSet<i64> {
    dataset.records().iter().map(|r| r.entry_id).collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: time split is disjoint and accounts for every record
    #[test]
    fn prop_time_split_disjoint(
        dataset in arb_dataset(),
        lookback in 0u32..10,
        fraction in 0.05f64..0.95,
    ) {
        let partition = SplitStrategy::TimeOrdered { lookback }
            .partition(&dataset, fraction, 0)
            .unwrap();

        let train = ids(&partition.train);
        let test = ids(&partition.test);
        prop_assert!(train.is_disjoint(&test));
        prop_assert_eq!(train.len() + test.len() + partition.excluded, dataset.len());
        prop_assert!(train.union(&test).all(|id| ids(&dataset).contains(id)));
        prop_assert!(!partition.test.is_empty());
    }

    /// Property: no training record lies within `lookback` cycles of its
    /// machine's first test cycle
    #[test]
    fn prop_time_split_exclusion_zone(
        dataset in arb_dataset(),
        lookback in 0u32..10,
        fraction in 0.05f64..0.95,
    ) {
        let partition = SplitStrategy::TimeOrdered { lookback }
            .partition(&dataset, fraction, 0)
            .unwrap();

        let mut min_test_cycle: BTreeMap<&str, i64> = BTreeMap::new();
        for record in partition.test.records() {
            let entry = min_test_cycle.entry(record.machine_id.as_str()).or_insert(record.cycle);
            *entry = (*entry).min(record.cycle);
        }
        for record in partition.train.records() {
            if let Some(&min_cycle) = min_test_cycle.get(record.machine_id.as_str()) {
                prop_assert!(record.cycle < min_cycle - i64::from(lookback));
            }
        }
    }

    /// Property: test set is the chronological tail
    #[test]
    fn prop_time_split_test_is_latest(dataset in arb_dataset(), fraction in 0.05f64..0.95) {
        let partition = SplitStrategy::TimeOrdered { lookback: 0 }
            .partition(&dataset, fraction, 0)
            .unwrap();

        let first_test = partition.test.records().iter().map(|r| r.entry_id).min().unwrap();
        prop_assert!(partition.train.records().iter().all(|r| r.entry_id < first_test));
    }

    /// Property: asset split never puts a machine on both sides
    #[test]
    fn prop_asset_split_purity(
        dataset in arb_dataset(),
        fraction in 0.05f64..0.95,
        seed in any::<u64>(),
    ) {
        let partition = SplitStrategy::AssetId.partition(&dataset, fraction, seed).unwrap();

        prop_assert!(partition.train.machine_ids().is_disjoint(&partition.test.machine_ids()));
        prop_assert_eq!(partition.train.len() + partition.test.len(), dataset.len());
        prop_assert_eq!(partition.excluded, 0);
        if dataset.machine_ids().len() >= 2 {
            prop_assert!(!partition.train.is_empty());
            prop_assert!(!partition.test.is_empty());
        }
    }

    /// Property: asset split is a function of the seed
    #[test]
    fn prop_asset_split_seeded(dataset in arb_dataset(), seed in any::<u64>()) {
        let a = SplitStrategy::AssetId.partition(&dataset, 0.3, seed).unwrap();
        let b = SplitStrategy::AssetId.partition(&dataset, 0.3, seed).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Property: every class ends at the pre-balance majority count
    #[test]
    fn prop_balance_equalizes_classes(train in arb_labeled(), seed in any::<u64>()) {
        let majority = train.class_counts().majority().map(|(_, n)| n).unwrap();
        let (balanced, report) = Smote::new(5, seed).balance(&train).unwrap();

        for (_, count) in report.after.iter() {
            prop_assert_eq!(count, majority);
        }
        prop_assert_eq!(report.after.num_classes(), report.before.num_classes());
        prop_assert_eq!(balanced.len(), majority * report.after.num_classes());
        prop_assert_eq!(&balanced.features()[..train.len()], train.features());
        prop_assert_eq!(&balanced.labels()[..train.len()], train.labels());
    }

    /// Property: labels follow `rul < horizon`
    #[test]
    fn prop_label_horizon_rule(rul in proptest::option::of(0u32..100), horizon in 1u32..50) {
        let record = Record {
            entry_id: 0,
            machine_id: "m".to_string(),
            cycle: 0,
            sequence_id: "s".to_string(),
            rul,
            failure: "F1".to_string(),
            features: Vec::new(),
        };
        let expected = match rul {
            Some(r) if r < horizon => Label::from("F1"),
            _ => Label::None,
        };
        prop_assert_eq!(Label::for_record(&record, horizon), expected);
    }
}
