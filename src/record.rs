//! Telemetry records and the dataset that holds them
//!
//! A [`Dataset`] is read once and never mutated in place: every stage that
//! drops or reorders records returns a new `Dataset` sharing the same
//! feature-column names.

use std::collections::BTreeSet;
use std::sync::Arc;

/// Unique record identifier, also the global time-ordering key
pub const ENTRY_ID: &str = "entryID";
/// Asset identifier
pub const MACHINE_ID: &str = "machineID";
/// Per-machine operating-time index
pub const CYCLE: &str = "cycle";
/// Contiguous run identifier
pub const SEQUENCE_ID: &str = "sequenceID";
/// Remaining useful life in cycles (nullable)
pub const RUL: &str = "rul";
/// Failure-type code ending the run (empty when none)
pub const FAILURE: &str = "failure";

/// Identifier and target columns; every other column is a feature.
pub const RESERVED_COLUMNS: [&str; 6] = [ENTRY_ID, MACHINE_ID, CYCLE, SEQUENCE_ID, RUL, FAILURE];

/// Returns true if `name` is an identifier/target column rather than a feature.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

/// One observation of a machine at a given operating cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique identifier, sort and partition key
    pub entry_id: i64,
    /// Asset identifier
    pub machine_id: String,
    /// Operating cycle, increasing per machine
    pub cycle: i64,
    /// Run this record belongs to
    pub sequence_id: String,
    /// Cycles until failure; `None` for censored runs
    pub rul: Option<u32>,
    /// Failure-type code of the run, empty if the run does not fail
    pub failure: String,
    /// Sensor-derived features, aligned with [`Dataset::feature_names`]
    pub features: Vec<f64>,
}

/// Ordered collection of records sharing one feature layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Arc<[String]>,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset from feature names and records.
    #[must_use]
    pub fn new(feature_names: impl Into<Arc<[String]>>, records: Vec<Record>) -> Self {
        Self {
            feature_names: feature_names.into(),
            records,
        }
    }

    /// Dataset with the same feature layout holding `records`.
    #[must_use]
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            feature_names: Arc::clone(&self.feature_names),
            records,
        }
    }

    /// Feature column names, in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Shared handle to the feature names.
    #[must_use]
    pub fn feature_names_arc(&self) -> Arc<[String]> {
        Arc::clone(&self.feature_names)
    }

    /// All records in order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the dataset holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct machine identifiers, sorted.
    #[must_use]
    pub fn machine_ids(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.machine_id.as_str()).collect()
    }

    /// New dataset keeping only records matching `predicate`, order preserved.
    #[must_use]
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        self.with_records(
            self.records
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        )
    }

    /// New dataset stably sorted by `entry_id`.
    #[must_use]
    pub fn sorted_by_entry_id(&self) -> Self {
        let mut records = self.records.clone();
        records.sort_by_key(|r| r.entry_id);
        self.with_records(records)
    }
}
