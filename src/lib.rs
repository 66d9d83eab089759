//! # failure-forecast: leakage-safe failure-mode datasets
//!
//! Prepares time-ordered machine telemetry into a train/test split that a
//! rolling-window feature cannot leak across, labels every record with the
//! failure type expected within a forecast horizon, rebalances the rare
//! failure classes of the training split, and fits and scores a classifier.
//!
//! ## Pipeline
//!
//! ```text
//! StorageEngine ─> Dataset ─> Partitioner ─> assign_labels ─> Smote ─> Trainer ─> Evaluation
//!  (parquet/csv)                (time | asset)   (train, test)  (train)                 │
//!                                                                                 artifact
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use failure_forecast::config::PipelineConfig;
//! use failure_forecast::pipeline::Pipeline;
//!
//! let config = PipelineConfig::builder()
//!     .horizon(7)
//!     .asset_split()
//!     .test_size(0.2)
//!     .seed(42)
//!     .build()?;
//!
//! let outcome = Pipeline::new(config).run(Path::new("data"), Path::new("out"))?;
//! println!("{}", outcome.evaluation);
//! # Ok::<(), failure_forecast::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod balance;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod label;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod record;
pub mod storage;
pub mod tracking;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use label::{Label, LabeledSet};
pub use partition::{Partition, Partitioner, SplitStrategy};
pub use record::{Dataset, Record};
