//! Error types for failure-forecast
//!
//! Every variant is fatal for the run. Degenerate splits are reported as
//! warnings on [`crate::partition::Partition`], never as errors.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum Error {
    /// Source tables disagree on their column set
    #[error("Schema mismatch in {source_name}: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        /// Source table that disagreed with the first one loaded
        source_name: String,
        /// Column set of the first source
        expected: Vec<String>,
        /// Column set of the offending source
        found: Vec<String>,
    },

    /// A required identifier/target column is absent
    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn {
        /// Source table name
        source_name: String,
        /// Missing column name
        column: String,
    },

    /// Configuration rejected before any computation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A class is too small for the oversampling neighbour count
    #[error("Insufficient samples for class '{class}': {count} available, {required} required by SMOTE")]
    InsufficientSamples {
        /// Offending class label
        class: String,
        /// Samples present in the training split
        count: usize,
        /// Minimum samples needed (`neighbors + 1`)
        required: usize,
    },

    /// A record value could not be interpreted
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Storage error (directory layout, empty sources)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Classifier training or prediction failed
    #[error("Model error: {0}")]
    Model(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
