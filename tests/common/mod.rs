//! Synthetic fleet telemetry shared by the integration tests

#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// One machine run: `cycles` observations, ending in `failure` if set.
#[derive(Debug, Clone, Copy)]
pub struct Run {
    pub machine: &'static str,
    pub failure: Option<&'static str>,
    pub cycles: i64,
}

impl Run {
    pub const fn failing(machine: &'static str, code: &'static str, cycles: i64) -> Self {
        Self {
            machine,
            failure: Some(code),
            cycles,
        }
    }

    pub const fn censored(machine: &'static str, cycles: i64) -> Self {
        Self {
            machine,
            failure: None,
            cycles,
        }
    }
}

/// Telemetry for `runs`, one sequence per run. Entry ids advance in global
/// time order: all machines at cycle 0, then all machines at cycle 1, ...
pub fn telemetry_batch(runs: &[Run]) -> RecordBatch {
    build_batch(runs, false)
}

/// Like [`telemetry_batch`], but sequence ids count runs per machine
/// ("0", "1", ...), so different machines reuse the same ids.
pub fn telemetry_batch_local_ids(runs: &[Run]) -> RecordBatch {
    build_batch(runs, true)
}

#[allow(clippy::cast_precision_loss)]
fn build_batch(runs: &[Run], local_ids: bool) -> RecordBatch {
    let mut entry_id = Vec::new();
    let mut machine_id = Vec::new();
    let mut cycle = Vec::new();
    let mut sequence_id = Vec::new();
    let mut rul = Vec::new();
    let mut failure = Vec::new();
    let mut volt = Vec::new();
    let mut vibration = Vec::new();

    let longest = runs.iter().map(|r| r.cycles).max().unwrap_or(0);
    let mut next_id = 0_i64;
    for c in 0..longest {
        for (run_index, run) in runs.iter().enumerate() {
            if c >= run.cycles {
                continue;
            }
            let remaining = run.cycles - 1 - c;
            entry_id.push(next_id);
            next_id += 1;
            machine_id.push(run.machine.to_string());
            cycle.push(c);
            if local_ids {
                let local = runs[..run_index]
                    .iter()
                    .filter(|r| r.machine == run.machine)
                    .count();
                sequence_id.push(local.to_string());
            } else {
                sequence_id.push(format!("{}-{run_index}", run.machine));
            }
            rul.push(run.failure.map(|_| remaining as f64));
            failure.push(run.failure.map(str::to_string));
            let wear = if run.failure.is_some() {
                (20 - remaining.min(20)) as f64
            } else {
                0.0
            };
            volt.push(160.0 + wear * 2.5 + (c % 3) as f64 * 0.1);
            vibration.push(40.0 + wear * 1.5 - (c % 5) as f64 * 0.05);
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("entryID", DataType::Int64, false),
        Field::new("machineID", DataType::Utf8, false),
        Field::new("cycle", DataType::Int64, false),
        Field::new("sequenceID", DataType::Utf8, false),
        Field::new("rul", DataType::Float64, true),
        Field::new("failure", DataType::Utf8, true),
        Field::new("volt", DataType::Float64, false),
        Field::new("vibration", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(entry_id)),
        Arc::new(StringArray::from(machine_id)),
        Arc::new(Int64Array::from(cycle)),
        Arc::new(StringArray::from(sequence_id)),
        Arc::new(Float64Array::from(rul)),
        Arc::new(StringArray::from(failure)),
        Arc::new(Float64Array::from(volt)),
        Arc::new(Float64Array::from(vibration)),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

/// Write `batch` as a single-row-group Parquet file.
pub fn write_parquet(path: &Path, batch: &RecordBatch) {
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}

/// Two machines, each failing once with a different code.
pub fn two_machine_fleet() -> RecordBatch {
    telemetry_batch(&[Run::failing("m1", "F1", 40), Run::failing("m2", "F2", 40)])
}
