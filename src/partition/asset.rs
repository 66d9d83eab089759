//! Asset-identifier split

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use super::{check_fraction, held_out, Partition, Partitioner};
use crate::record::Dataset;
use crate::Result;

/// Holds out whole machines.
///
/// Machine identifiers are sorted, shuffled with a seeded ChaCha8 RNG and the
/// first `ceil(m * test_fraction)` go to test. With two or more machines each
/// side keeps at least one. Record order inside each side is the dataset's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetSplit;

impl Partitioner for AssetSplit {
    fn partition(&self, dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<Partition> {
        check_fraction(test_fraction)?;

        let mut machines: Vec<&str> = dataset.machine_ids().into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        machines.shuffle(&mut rng);

        let mut n_test = held_out(machines.len(), test_fraction);
        if machines.len() >= 2 {
            n_test = n_test.clamp(1, machines.len() - 1);
        }
        let test_machines: HashSet<&str> = machines[..n_test].iter().copied().collect();

        let (test, train): (Vec<_>, Vec<_>) = dataset
            .records()
            .iter()
            .cloned()
            .partition(|r| test_machines.contains(r.machine_id.as_str()));

        if train.is_empty() && !test.is_empty() {
            warn!(
                machines = machines.len(),
                "degenerate split: every machine was held out for test"
            );
        }
        info!(
            train = train.len(),
            test = test.len(),
            test_machines = n_test,
            train_machines = machines.len() - n_test,
            "asset-identifier split"
        );

        Ok(Partition {
            train: dataset.with_records(train),
            test: dataset.with_records(test),
            excluded: 0,
            degenerate_machines: Vec::new(),
        })
    }
}
