//! Run tracking
//!
//! Records what a pipeline run did, so a persisted model can be traced back
//! to its configuration, row counts and scores.
//!
//! ## Schema Overview
//!
//! ```text
//! RunManifest
//!   ├── RunRecord ──< StageRecord (N)   [rows in/out per stage]
//!   ├── PipelineConfig
//!   ├──< MetricRecord (N)               [run-level and per-class scores]
//!   └──< ArtifactRecord (N)             [CAS: sha256 of each written file]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use failure_forecast::config::PipelineConfig;
//! use failure_forecast::tracking::{MetricRecord, RunManifest, RunRecord, RunStatus};
//!
//! let config = PipelineConfig::builder().build()?;
//! let mut manifest = RunManifest::new(RunRecord::new("run-001"), config);
//!
//! manifest.run_mut().start();
//! manifest.run_mut().record_stage("load", 0, 1_000);
//! manifest.add_metrics([MetricRecord::new("accuracy", 0.97)]);
//! manifest.run_mut().complete(RunStatus::Success);
//! # Ok::<(), failure_forecast::Error>(())
//! ```

mod artifact_record;
mod manifest;
mod metric_record;
mod run_record;

pub use artifact_record::{sha256_address, ArtifactRecord};
pub use manifest::RunManifest;
pub use metric_record::MetricRecord;
pub use run_record::{RunRecord, RunStatus, StageRecord};
