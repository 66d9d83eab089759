//! End-to-end orchestration
//!
//! ```text
//! load ─> [truncate tails] ─> partition ─> label (train, test)
//!      ─> balance (train only) ─> train ─> evaluate (test) ─> persist
//! ```
//!
//! Each stage is a pure function of the previous stage's output and the
//! [`PipelineConfig`]; the loaded [`Dataset`] is never modified. A failing
//! stage aborts the run and nothing after it executes.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::artifact::{self, MANIFEST_FILE};
use crate::balance::{BalanceReport, Smote};
use crate::config::PipelineConfig;
use crate::evaluate::Evaluation;
use crate::label::{assign_labels, truncate_censored_tails, ClassCounts, LabeledSet};
use crate::model::forest::{RandomForest, RandomForestTrainer};
use crate::model::{Classifier, Trainer};
use crate::partition::{Partition, Partitioner};
use crate::record::Dataset;
use crate::storage::StorageEngine;
use crate::tracking::{MetricRecord, RunManifest, RunRecord, RunStatus};
use crate::{Error, Result};

/// Training-ready data derived from a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// Records dropped by censored-tail truncation
    pub truncated: usize,
    /// Train/test records
    pub partition: Partition,
    /// Labelled training rows before balancing
    pub train: LabeledSet,
    /// Labelled test rows; never balanced
    pub test: LabeledSet,
    /// Training rows after SMOTE
    pub balanced: LabeledSet,
    /// Class counts around balancing
    pub balance_report: BalanceReport,
}

/// Run every data-preparation stage: optional tail truncation, partition,
/// labelling of both splits and balancing of the training split.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidConfiguration`] for an invalid
/// configuration and [`crate::Error::InsufficientSamples`] if a training
/// class is too small to oversample.
pub fn prepare(dataset: &Dataset, config: &PipelineConfig) -> Result<PreparedData> {
    config.validate()?;

    let (source, truncated) = if config.tail_truncation().applies_to(config.split()) {
        let truncation = truncate_censored_tails(dataset, config.horizon());
        (Cow::Owned(truncation.dataset), truncation.removed)
    } else {
        (Cow::Borrowed(dataset), 0)
    };

    let partition = config
        .split()
        .partition(&source, config.test_size(), config.seed())?;

    let train = assign_labels(&partition.train, config.horizon());
    let test = assign_labels(&partition.test, config.horizon());
    info!(
        horizon = config.horizon(),
        train = %train.class_counts(),
        test = %test.class_counts(),
        "assigned labels"
    );

    let (balanced, balance_report) = Smote::new(config.neighbors(), config.seed()).balance(&train)?;

    Ok(PreparedData {
        truncated,
        partition,
        train,
        test,
        balanced,
        balance_report,
    })
}

/// Label distribution of a whole dataset under `horizon`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] if `horizon` is zero.
pub fn label_distribution(dataset: &Dataset, horizon: u32) -> Result<ClassCounts> {
    if horizon == 0 {
        return Err(Error::InvalidConfiguration(
            "horizon must be a positive number of cycles".to_string(),
        ));
    }
    Ok(assign_labels(dataset, horizon).class_counts())
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome<M> {
    /// Prepared train/test data
    pub prepared: PreparedData,
    /// Fitted model
    pub model: M,
    /// Test-set evaluation
    pub evaluation: Evaluation,
    /// Manifest as written to `run_manifest.json`
    pub manifest: RunManifest,
}

/// Configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline for a validated configuration.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration of this pipeline.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load every table under `input` and run the pipeline with the
    /// reference random forest, writing artifacts to `output`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; see [`Pipeline::run_dataset`].
    pub fn run(&self, input: &Path, output: &Path) -> Result<RunOutcome<RandomForest>> {
        let storage = StorageEngine::load_dir(input)?;
        let dataset = storage.to_dataset()?;
        info!(
            sources = storage.sources().len(),
            rows = dataset.len(),
            features = dataset.feature_names().len(),
            "loaded dataset"
        );
        self.run_dataset(&dataset, output)
    }

    /// Run the pipeline on an already loaded dataset with the reference
    /// random forest.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with_trainer`].
    pub fn run_dataset(&self, dataset: &Dataset, output: &Path) -> Result<RunOutcome<RandomForest>> {
        let trainer = RandomForestTrainer::new(*self.config.forest());
        self.run_with_trainer(&trainer, dataset, output)
    }

    /// Run the pipeline on `dataset` with any [`Trainer`].
    ///
    /// # Errors
    ///
    /// Returns configuration, balancing, model and IO errors. If any
    /// artifact fails to persist, the ones already written are removed, so
    /// the output directory never holds a model without its manifest.
    pub fn run_with_trainer<T: Trainer>(
        &self,
        trainer: &T,
        dataset: &Dataset,
        output: &Path,
    ) -> Result<RunOutcome<T::Model>> {
        let config = &self.config;
        let run_id = format!("run-{}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"), config.seed());
        let mut manifest = RunManifest::new(RunRecord::new(run_id), config.clone());
        manifest.run_mut().start();
        manifest.set_feature_names(dataset.feature_names());
        info!(
            run_id = manifest.run().run_id(),
            split = config.split().name(),
            horizon = config.horizon(),
            test_size = config.test_size(),
            seed = config.seed(),
            "starting run"
        );

        let prepared = match prepare(dataset, config) {
            Ok(prepared) => prepared,
            Err(err) => {
                manifest.run_mut().complete(RunStatus::Failed);
                return Err(err);
            }
        };
        record_preparation(&mut manifest, dataset.len(), &prepared);

        let (model, evaluation) = match fit_and_score(trainer, &prepared, config.seed()) {
            Ok(fitted) => fitted,
            Err(err) => {
                manifest.run_mut().complete(RunStatus::Failed);
                return Err(err);
            }
        };
        info!(
            accuracy = evaluation.accuracy,
            majority_baseline = evaluation.majority_baseline,
            macro_recall = evaluation.macro_recall(),
            "evaluated model on test split"
        );
        if !evaluation.beats_baseline() {
            warn!(
                accuracy = evaluation.accuracy,
                majority_baseline = evaluation.majority_baseline,
                "model does not beat the majority-class baseline"
            );
        }
        manifest
            .run_mut()
            .record_stage("evaluate", prepared.test.len(), prepared.test.len());
        manifest.add_metrics(MetricRecord::from_evaluation(&evaluation));

        if let Err(err) = persist(&mut manifest, &model, &prepared, config, output) {
            artifact::discard(manifest.artifacts());
            manifest.run_mut().complete(RunStatus::Failed);
            return Err(err);
        }

        info!(run_id = manifest.run().run_id(), output = %output.display(), "run complete");
        Ok(RunOutcome {
            prepared,
            model,
            evaluation,
            manifest,
        })
    }
}

fn record_preparation(manifest: &mut RunManifest, loaded: usize, prepared: &PreparedData) {
    let run = manifest.run_mut();
    run.record_stage("load", loaded, loaded);
    let kept = loaded - prepared.truncated;
    if prepared.truncated > 0 {
        run.record_stage("truncate_tails", loaded, kept);
    }
    let split = prepared.partition.train.len() + prepared.partition.test.len();
    run.record_stage("partition", kept, split);
    run.record_stage("label", split, prepared.train.len() + prepared.test.len());
    run.record_stage("balance", prepared.train.len(), prepared.balanced.len());
    manifest.set_partition(
        &prepared.partition.degenerate_machines,
        prepared.test.class_counts(),
    );
    manifest.set_balance(prepared.balance_report.clone());
}

/// Write model, sample and manifest; the manifest goes last.
fn persist<M: Serialize>(
    manifest: &mut RunManifest,
    model: &M,
    prepared: &PreparedData,
    config: &PipelineConfig,
    output: &Path,
) -> Result<()> {
    fs::create_dir_all(output)?;
    manifest.add_artifact(artifact::persist_model(model, output)?);
    manifest.add_artifact(artifact::persist_sample(
        &prepared.test,
        config.sample_rows(),
        config.seed(),
        output,
    )?);
    manifest.run_mut().complete(RunStatus::Success);
    artifact::write_json(output, MANIFEST_FILE, manifest)?;
    Ok(())
}

fn fit_and_score<T: Trainer>(
    trainer: &T,
    prepared: &PreparedData,
    seed: u64,
) -> Result<(T::Model, Evaluation)> {
    let balanced = &prepared.balanced;
    let model = trainer.train(balanced.features(), balanced.labels(), seed)?;
    let predicted = model.predict(prepared.test.features())?;
    let evaluation = Evaluation::new(prepared.test.labels(), &predicted)?;
    Ok((model, evaluation))
}
