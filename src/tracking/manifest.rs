//! Run Manifest - everything needed to audit a run after the fact

use serde::Serialize;

use super::{ArtifactRecord, MetricRecord, RunRecord};
use crate::balance::BalanceReport;
use crate::config::PipelineConfig;
use crate::label::ClassCounts;

/// Summary of a pipeline run, persisted as `run_manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    run: RunRecord,
    config: PipelineConfig,
    feature_names: Vec<String>,
    degenerate_machines: Vec<String>,
    test_classes: Option<ClassCounts>,
    balance: Option<BalanceReport>,
    metrics: Vec<MetricRecord>,
    artifacts: Vec<ArtifactRecord>,
}

impl RunManifest {
    /// Create a manifest for `run` under `config`.
    #[must_use]
    pub fn new(run: RunRecord, config: PipelineConfig) -> Self {
        Self {
            run,
            config,
            feature_names: Vec::new(),
            degenerate_machines: Vec::new(),
            test_classes: None,
            balance: None,
            metrics: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Get the run record.
    #[must_use]
    pub const fn run(&self) -> &RunRecord {
        &self.run
    }

    /// Mutable access to the run record.
    pub fn run_mut(&mut self) -> &mut RunRecord {
        &mut self.run
    }

    /// Get the configuration of the run.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Feature columns the model was trained on, in order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Machines the partitioner left without training rows.
    #[must_use]
    pub fn degenerate_machines(&self) -> &[String] {
        &self.degenerate_machines
    }

    /// Label distribution of the untouched test split.
    #[must_use]
    pub const fn test_classes(&self) -> Option<&ClassCounts> {
        self.test_classes.as_ref()
    }

    /// Class counts around balancing.
    #[must_use]
    pub const fn balance(&self) -> Option<&BalanceReport> {
        self.balance.as_ref()
    }

    /// Evaluation metrics.
    #[must_use]
    pub fn metrics(&self) -> &[MetricRecord] {
        &self.metrics
    }

    /// Artifacts written so far.
    #[must_use]
    pub fn artifacts(&self) -> &[ArtifactRecord] {
        &self.artifacts
    }

    /// Record the feature layout.
    pub fn set_feature_names(&mut self, names: &[String]) {
        self.feature_names = names.to_vec();
    }

    /// Record the partition outcome.
    pub fn set_partition(&mut self, degenerate_machines: &[String], test_classes: ClassCounts) {
        self.degenerate_machines = degenerate_machines.to_vec();
        self.test_classes = Some(test_classes);
    }

    /// Record the balancing outcome.
    pub fn set_balance(&mut self, report: BalanceReport) {
        self.balance = Some(report);
    }

    /// Append evaluation metrics.
    pub fn add_metrics(&mut self, metrics: impl IntoIterator<Item = MetricRecord>) {
        self.metrics.extend(metrics);
    }

    /// Append a written artifact.
    pub fn add_artifact(&mut self, artifact: ArtifactRecord) {
        self.artifacts.push(artifact);
    }
}
