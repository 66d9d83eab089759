//! Leakage-safe train/test partitioning
//!
//! Rolling features at cycle `c` summarize raw readings from
//! `[c - lookback, c]`. A training record whose window reaches into the test
//! period would carry test information, so each strategy guarantees that no
//! training row can see a test-side window:
//!
//! - [`TimeOrderedSplit`]: chronological cut on `entryID`, then an exclusion
//!   zone of `lookback` cycles before each machine's first test cycle
//! - [`AssetSplit`]: whole machines go to one side, so no exclusion is needed
//!
//! The strategy is picked once, as a [`SplitStrategy`] value, and dispatched
//! through the [`Partitioner`] trait.

mod asset;
mod time;

use serde::{Deserialize, Serialize};

use crate::record::Dataset;
use crate::{Error, Result};

pub use asset::AssetSplit;
pub use time::TimeOrderedSplit;

/// Disjoint train/test subsets of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Training records
    pub train: Dataset,
    /// Held-out records
    pub test: Dataset,
    /// Candidate-train records removed by the leakage exclusion zone
    pub excluded: usize,
    /// Machines left with no training rows after exclusion
    pub degenerate_machines: Vec<String>,
}

/// Split a dataset into train and test without leakage.
pub trait Partitioner {
    /// Partition `dataset`, holding out roughly `test_fraction` of it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `test_fraction` is not in
    /// the open interval (0, 1).
    fn partition(&self, dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<Partition>;
}

/// Configured partition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Chronological split on `entryID` with a per-machine exclusion zone
    TimeOrdered {
        /// Rolling-window width minus one
        lookback: u32,
    },
    /// Split on machine identifiers
    AssetId,
}

impl SplitStrategy {
    /// Resolve command-line style flags into one strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if both strategies are requested.
    pub fn from_flags(time_split: bool, asset_split: bool, lookback: u32) -> Result<Self> {
        match (time_split, asset_split) {
            (true, true) => Err(Error::InvalidConfiguration(
                "time-ordered and asset-identifier splits are mutually exclusive".to_string(),
            )),
            (false, true) => Ok(Self::AssetId),
            _ => Ok(Self::TimeOrdered { lookback }),
        }
    }

    /// Lookback of the time-ordered split, if selected.
    #[must_use]
    pub const fn lookback(&self) -> Option<u32> {
        match self {
            Self::TimeOrdered { lookback } => Some(*lookback),
            Self::AssetId => None,
        }
    }

    /// Short name for logs and manifests.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TimeOrdered { .. } => "time_ordered",
            Self::AssetId => "asset_id",
        }
    }
}

impl Partitioner for SplitStrategy {
    fn partition(&self, dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<Partition> {
        match *self {
            Self::TimeOrdered { lookback } => {
                TimeOrderedSplit::new(lookback).partition(dataset, test_fraction, seed)
            }
            Self::AssetId => AssetSplit.partition(dataset, test_fraction, seed),
        }
    }
}

fn check_fraction(test_fraction: f64) -> Result<()> {
    if test_fraction > 0.0 && test_fraction < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "test fraction must lie strictly between 0 and 1, got {test_fraction}"
        )))
    }
}

/// Number of held-out items out of `total`, rounded up.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
fn held_out(total: usize, test_fraction: f64) -> usize {
    ((total as f64 * test_fraction).ceil() as usize).min(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(
            SplitStrategy::from_flags(true, false, 5).unwrap(),
            SplitStrategy::TimeOrdered { lookback: 5 }
        );
        assert_eq!(
            SplitStrategy::from_flags(false, true, 5).unwrap(),
            SplitStrategy::AssetId
        );
        assert_eq!(
            SplitStrategy::from_flags(false, false, 3).unwrap().lookback(),
            Some(3)
        );
        assert!(matches!(
            SplitStrategy::from_flags(true, true, 5),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_held_out_rounds_up() {
        assert_eq!(held_out(10, 0.2), 2);
        assert_eq!(held_out(11, 0.2), 3);
        assert_eq!(held_out(0, 0.5), 0);
        assert_eq!(held_out(1, 0.01), 1);
    }

    #[test]
    fn test_fraction_bounds() {
        assert!(check_fraction(0.3).is_ok());
        assert!(check_fraction(0.0).is_err());
        assert!(check_fraction(1.0).is_err());
        assert!(check_fraction(f64::NAN).is_err());
    }
}
