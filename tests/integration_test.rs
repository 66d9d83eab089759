//! Integration tests: load tables from disk and run the whole pipeline
//!
//! Tests the complete flow:
//! 1. Write Parquet/CSV telemetry into a temp directory
//! 2. Load it through the storage engine
//! 3. Partition, label, balance, train, evaluate, persist

mod common;

use std::fs;
use std::io::Write;

use common::{telemetry_batch, telemetry_batch_local_ids, two_machine_fleet, write_parquet, Run};
use failure_forecast::artifact::{MANIFEST_FILE, MODEL_FILE, SAMPLE_FILE};
use failure_forecast::config::PipelineConfig;
use failure_forecast::label::{Label, TailTruncation};
use failure_forecast::model::forest::ForestConfig;
use failure_forecast::pipeline::{label_distribution, prepare, Pipeline};
use failure_forecast::record::is_reserved;
use failure_forecast::storage::StorageEngine;
use failure_forecast::Error;

fn small_forest() -> ForestConfig {
    ForestConfig {
        n_trees: 7,
        max_depth: 8,
        ..ForestConfig::default()
    }
}

fn asset_config(seed: u64) -> PipelineConfig {
    PipelineConfig::builder()
        .horizon(7)
        .asset_split()
        .test_size(0.5)
        .seed(seed)
        .forest(small_forest())
        .build()
        .unwrap()
}

#[test]
fn test_load_dir_concatenates_in_file_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let batch = two_machine_fleet();
    write_parquet(&dir.path().join("b.parquet"), &batch.slice(40, 40));
    write_parquet(&dir.path().join("a.parquet"), &batch.slice(0, 40));
    fs::write(dir.path().join("README.txt"), "not a table").unwrap();

    let storage = StorageEngine::load_dir(dir.path()).unwrap();
    assert_eq!(storage.sources(), &["a.parquet".to_string(), "b.parquet".to_string()]);
    assert_eq!(storage.num_rows(), 80);

    let dataset = storage.to_dataset().unwrap();
    let ids: Vec<i64> = dataset.records().iter().map(|r| r.entry_id).collect();
    assert_eq!(ids, (0..80).collect::<Vec<_>>());
}

#[test]
fn test_parquet_and_csv_sources_mix() {
    let dir = tempfile::tempdir().unwrap();
    write_parquet(
        &dir.path().join("a.parquet"),
        &telemetry_batch(&[Run::failing("m1", "F1", 10)]),
    );
    let mut csv = fs::File::create(dir.path().join("b.csv")).unwrap();
    // Columns in a different order; failure code with a leading zero
    writeln!(csv, "volt,vibration,failure,rul,sequenceID,cycle,machineID,entryID").unwrap();
    writeln!(csv, "171.0,41.0,07,1,m9-0,0,m9,100").unwrap();
    writeln!(csv, "172.0,42.0,07,0,m9-0,1,m9,101").unwrap();
    writeln!(csv, ",43.0,,,m8-0,0,m8,102").unwrap();
    drop(csv);

    let dataset = StorageEngine::load_dir(dir.path()).unwrap().to_dataset().unwrap();
    assert_eq!(dataset.len(), 13);
    assert_eq!(dataset.feature_names(), &["volt".to_string(), "vibration".to_string()]);

    let from_csv = &dataset.records()[10..];
    assert_eq!(from_csv[0].failure, "07");
    assert_eq!(from_csv[1].rul, Some(0));
    assert!(from_csv[2].rul.is_none());
    assert!(from_csv[2].failure.is_empty());
    assert!(from_csv[2].features[0].is_nan());
}

#[test]
fn test_schema_mismatch_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let batch = two_machine_fleet();
    write_parquet(&dir.path().join("a.parquet"), &batch);
    let without_vibration = batch.project(&[0, 1, 2, 3, 4, 5, 6]).unwrap();
    write_parquet(&dir.path().join("b.parquet"), &without_vibration);

    let err = StorageEngine::load_dir(dir.path()).err().unwrap();
    match err {
        Error::SchemaMismatch {
            source_name,
            expected,
            found,
        } => {
            assert_eq!(source_name, "b.parquet");
            assert_eq!(expected.len(), 8);
            assert_eq!(found.len(), 7);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_directory_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StorageEngine::load_dir(dir.path()).err().unwrap();
    assert!(matches!(err, Error::Storage(_)));
}

#[test]
fn test_uncastable_value_is_invalid_record() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.csv"),
        "entryID,machineID,cycle,sequenceID,rul,failure,volt\n1,m1,one,s1,,,1.0\n",
    )
    .unwrap();
    let err = StorageEngine::load_dir(dir.path()).err().unwrap();
    assert!(matches!(err, Error::InvalidRecord(_)));
}

#[test]
fn test_reserved_columns_never_become_features() {
    let dir = tempfile::tempdir().unwrap();
    write_parquet(&dir.path().join("a.parquet"), &two_machine_fleet());
    let dataset = StorageEngine::load_dir(dir.path()).unwrap().to_dataset().unwrap();

    assert!(dataset.feature_names().iter().all(|name| !is_reserved(name)));
    let prepared = prepare(&dataset, &asset_config(1)).unwrap();
    assert_eq!(prepared.train.feature_names(), dataset.feature_names());
    assert!(prepared.balanced.features().iter().all(|row| row.len() == 2));
}

#[test]
fn test_end_to_end_is_deterministic() {
    let input = tempfile::tempdir().unwrap();
    write_parquet(&input.path().join("fleet.parquet"), &two_machine_fleet());
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();

    let a = Pipeline::new(asset_config(42)).run(input.path(), out_a.path()).unwrap();
    let b = Pipeline::new(asset_config(42)).run(input.path(), out_b.path()).unwrap();

    assert_eq!(a.prepared.partition, b.prepared.partition);
    assert_eq!(a.prepared.train.class_counts(), b.prepared.train.class_counts());
    assert_eq!(a.prepared.test.class_counts(), b.prepared.test.class_counts());
    assert_eq!(a.prepared.balanced, b.prepared.balanced);
    assert_eq!(a.model, b.model);
    for file in [MODEL_FILE, SAMPLE_FILE] {
        assert_eq!(
            fs::read(out_a.path().join(file)).unwrap(),
            fs::read(out_b.path().join(file)).unwrap(),
            "{file} differs between runs"
        );
    }
}

#[test]
fn test_end_to_end_asset_split_is_pure() {
    let input = tempfile::tempdir().unwrap();
    write_parquet(&input.path().join("fleet.parquet"), &two_machine_fleet());
    let output = tempfile::tempdir().unwrap();

    let outcome = Pipeline::new(asset_config(3)).run(input.path(), output.path()).unwrap();
    let partition = &outcome.prepared.partition;

    let train_machines = partition.train.machine_ids();
    let test_machines = partition.test.machine_ids();
    assert_eq!(train_machines.len(), 1);
    assert_eq!(test_machines.len(), 1);
    assert!(train_machines.is_disjoint(&test_machines));
    assert_eq!(partition.train.len() + partition.test.len(), 80);

    // Test keeps the population distribution: 33 NONE, 7 failures
    assert_eq!(outcome.prepared.test.class_counts().get(&Label::None), 33);
    assert_eq!(outcome.prepared.test.len(), 40);
    assert_eq!(outcome.evaluation.confusion.total(), 40);
}

#[test]
fn test_manifest_records_run() {
    let input = tempfile::tempdir().unwrap();
    write_parquet(&input.path().join("fleet.parquet"), &two_machine_fleet());
    let output = tempfile::tempdir().unwrap();

    let outcome = Pipeline::new(asset_config(9)).run(input.path(), output.path()).unwrap();

    let text = fs::read_to_string(output.path().join(MANIFEST_FILE)).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(manifest["run"]["status"], "success");
    assert_eq!(manifest["config"]["horizon"], 7);
    assert_eq!(manifest["config"]["split"]["strategy"], "asset_id");
    assert_eq!(manifest["feature_names"], serde_json::json!(["volt", "vibration"]));
    assert_eq!(manifest["artifacts"].as_array().unwrap().len(), 2);
    assert_eq!(
        manifest["artifacts"][0]["cas_hash"],
        outcome.manifest.artifacts()[0].cas_hash()
    );
    assert!(manifest["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["key"] == "majority_baseline"));

    let sample: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.path().join(SAMPLE_FILE)).unwrap()).unwrap();
    assert_eq!(sample.as_array().unwrap().len(), 5);
}

#[test]
fn test_time_split_end_to_end_with_truncation() {
    let input = tempfile::tempdir().unwrap();
    let batch = telemetry_batch(&[
        Run::failing("m1", "F1", 60),
        Run::failing("m2", "F2", 60),
        Run::censored("m3", 60),
    ]);
    write_parquet(&input.path().join("fleet.parquet"), &batch);
    let output = tempfile::tempdir().unwrap();

    let config = PipelineConfig::builder()
        .horizon(7)
        .time_split(5)
        .test_size(0.2)
        .tail_truncation(TailTruncation::TimeSplitOnly)
        .forest(small_forest())
        .build()
        .unwrap();
    let outcome = Pipeline::new(config).run(input.path(), output.path()).unwrap();
    let prepared = &outcome.prepared;

    assert_eq!(prepared.truncated, 7);
    let remaining = 180 - 7;
    let partition = &prepared.partition;
    assert_eq!(partition.train.len() + partition.test.len() + partition.excluded, remaining);

    // Every machine reaches the test period, so each loses its exclusion zone
    for machine in ["m1", "m2", "m3"] {
        let min_test = partition
            .test
            .records()
            .iter()
            .filter(|r| r.machine_id == machine)
            .map(|r| r.cycle)
            .min()
            .unwrap();
        assert!(partition
            .train
            .records()
            .iter()
            .filter(|r| r.machine_id == machine)
            .all(|r| r.cycle < min_test - 5));
    }
}

#[test]
fn test_truncation_with_sequence_ids_shared_across_machines() {
    let dir = tempfile::tempdir().unwrap();
    let batch = telemetry_batch_local_ids(&[
        Run::failing("m1", "F1", 40),
        Run::censored("m2", 40),
        Run::censored("m3", 40),
    ]);
    write_parquet(&dir.path().join("fleet.parquet"), &batch);
    let dataset = StorageEngine::load_dir(dir.path()).unwrap().to_dataset().unwrap();
    assert!(dataset.records().iter().all(|r| r.sequence_id == "0"));

    let config = PipelineConfig::builder()
        .horizon(7)
        .asset_split()
        .test_size(0.34)
        .tail_truncation(TailTruncation::Always)
        .forest(small_forest())
        .build()
        .unwrap();
    let prepared = prepare(&dataset, &config).unwrap();

    // Each censored machine loses its own tail; the failing run is untouched
    assert_eq!(prepared.truncated, 14);
    let kept = |machine: &str| {
        prepared
            .partition
            .train
            .records()
            .iter()
            .chain(prepared.partition.test.records())
            .filter(|r| r.machine_id == machine)
            .map(|r| r.cycle)
            .collect::<Vec<_>>()
    };
    assert_eq!(kept("m1").len(), 40);
    for machine in ["m2", "m3"] {
        let cycles = kept(machine);
        assert_eq!(cycles.len(), 33);
        assert_eq!(cycles.iter().max(), Some(&32));
    }
}

#[test]
fn test_label_distribution_over_loaded_fleet() {
    let dir = tempfile::tempdir().unwrap();
    write_parquet(&dir.path().join("a.parquet"), &two_machine_fleet());
    let dataset = StorageEngine::load_dir(dir.path()).unwrap().to_dataset().unwrap();

    let counts = label_distribution(&dataset, 7).unwrap();
    assert_eq!(counts.get(&Label::from("F1")), 7);
    assert_eq!(counts.get(&Label::from("F2")), 7);
    assert_eq!(counts.get(&Label::None), 66);
}
