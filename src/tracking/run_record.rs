//! Run Record - one execution of the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not yet started
    Pending,
    /// Stages are executing
    Running,
    /// Every stage completed and artifacts were written
    Success,
    /// A stage failed; the run was aborted
    Failed,
}

/// Row counts in and out of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageRecord {
    stage: String,
    rows_in: usize,
    rows_out: usize,
}

impl StageRecord {
    /// Create a stage record.
    #[must_use]
    pub fn new(stage: impl Into<String>, rows_in: usize, rows_out: usize) -> Self {
        Self {
            stage: stage.into(),
            rows_in,
            rows_out,
        }
    }

    /// Stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Rows the stage consumed.
    #[must_use]
    pub const fn rows_in(&self) -> usize {
        self.rows_in
    }

    /// Rows the stage produced.
    #[must_use]
    pub const fn rows_out(&self) -> usize {
        self.rows_out
    }
}

/// Lifecycle and per-stage row counts of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    run_id: String,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    stages: Vec<StageRecord>,
}

impl RunRecord {
    /// Create a run record in Pending status.
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
            stages: Vec::new(),
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Stages recorded so far, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    /// Look up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage() == name)
    }

    /// Transition from Pending to Running and stamp the start time.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Append the row counts of a finished stage.
    pub fn record_stage(&mut self, stage: impl Into<String>, rows_in: usize, rows_out: usize) {
        self.stages.push(StageRecord::new(stage, rows_in, rows_out));
    }

    /// Set the final status and stamp the end time.
    pub fn complete(&mut self, status: RunStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_default() {
        let run = RunRecord::new("run-1");
        assert_eq!(run.status(), RunStatus::Pending);
        assert!(run.started_at().is_none());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = RunRecord::new("run-1");
        run.start();
        assert_eq!(run.status(), RunStatus::Running);
        run.record_stage("load", 0, 100);
        run.record_stage("partition", 100, 90);
        run.complete(RunStatus::Success);

        assert_eq!(run.status(), RunStatus::Success);
        assert!(run.ended_at() >= run.started_at());
        assert_eq!(run.stages().len(), 2);
        assert_eq!(run.stage("partition").map(StageRecord::rows_out), Some(90));
        assert!(run.stage("balance").is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&RunStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }
}
