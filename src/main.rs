//! Command line entry point
//!
//! Subcommands:
//!   run      -- Load, partition, label, balance, train, evaluate and persist
//!   inspect  -- Load a dataset and print its label distribution

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use failure_forecast::config::{
    PipelineConfig, DEFAULT_HORIZON, DEFAULT_LOOKBACK, DEFAULT_NEIGHBORS, DEFAULT_SAMPLE_ROWS,
    DEFAULT_SEED, DEFAULT_TEST_SIZE,
};
use failure_forecast::label::TailTruncation;
use failure_forecast::model::forest::ForestConfig;
use failure_forecast::partition::SplitStrategy;
use failure_forecast::pipeline::{label_distribution, Pipeline};
use failure_forecast::storage::StorageEngine;

#[derive(Parser)]
#[command(
    name = "failure-forecast",
    version,
    about = "Leakage-safe failure-mode dataset preparation and training"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write model.json, sample.json and run_manifest.json.
    Run {
        /// Directory of parquet/csv telemetry tables.
        #[arg(long)]
        input: PathBuf,

        /// Directory for the output artifacts (created if missing).
        #[arg(long)]
        output: PathBuf,

        /// Forecast horizon in cycles.
        #[arg(
            long,
            default_value_t = DEFAULT_HORIZON,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        horizon: u32,

        /// Rolling-window width minus one (time split only).
        #[arg(long, default_value_t = DEFAULT_LOOKBACK)]
        lookback: u32,

        /// Held-out fraction of records (time split) or machines (asset split).
        #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
        test_size: f64,

        /// Split chronologically on entryID (default).
        #[arg(long)]
        time_split: bool,

        /// Split on machine identifiers.
        #[arg(long)]
        asset_split: bool,

        /// Seed for the asset split, SMOTE, sampling and the forest.
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// SMOTE nearest-neighbour count.
        #[arg(long, default_value_t = DEFAULT_NEIGHBORS)]
        neighbors: usize,

        /// Drop the last `horizon` cycles of runs that never fail.
        #[arg(long, value_enum, default_value_t = TailTruncation::Disabled)]
        truncate_tails: TailTruncation,

        /// Number of trees in the random forest.
        #[arg(long)]
        trees: Option<usize>,

        /// Maximum tree depth.
        #[arg(long)]
        max_depth: Option<usize>,

        /// Test rows written to sample.json.
        #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
        sample_rows: usize,
    },

    /// Load a dataset and print its label distribution.
    Inspect {
        /// Directory of parquet/csv telemetry tables.
        #[arg(long)]
        input: PathBuf,

        /// Forecast horizon in cycles.
        #[arg(
            long,
            default_value_t = DEFAULT_HORIZON,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        horizon: u32,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            input,
            output,
            horizon,
            lookback,
            test_size,
            time_split,
            asset_split,
            seed,
            neighbors,
            truncate_tails,
            trees,
            max_depth,
            sample_rows,
        } => {
            let defaults = ForestConfig::default();
            let forest = ForestConfig {
                n_trees: trees.unwrap_or(defaults.n_trees),
                max_depth: max_depth.unwrap_or(defaults.max_depth),
                ..defaults
            };
            SplitStrategy::from_flags(time_split, asset_split, lookback)
                .and_then(|split| {
                    PipelineConfig::builder()
                        .horizon(horizon)
                        .split(split)
                        .test_size(test_size)
                        .seed(seed)
                        .neighbors(neighbors)
                        .tail_truncation(truncate_tails)
                        .sample_rows(sample_rows)
                        .forest(forest)
                        .build()
                })
                .context("invalid configuration")
                .and_then(|config| run(config, &input, &output))
        }
        Command::Inspect { input, horizon } => inspect(&input, horizon),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: PipelineConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    let outcome = Pipeline::new(config)
        .run(input, output)
        .with_context(|| format!("pipeline failed for input {}", input.display()))?;

    println!("{}", outcome.evaluation);
    println!(
        "balanced training classes: {} -> {}",
        outcome.prepared.balance_report.before, outcome.prepared.balance_report.after
    );
    if !outcome.prepared.partition.degenerate_machines.is_empty() {
        println!(
            "machines without training rows: {}",
            outcome.prepared.partition.degenerate_machines.join(", ")
        );
    }
    println!("artifacts written to {}", output.display());
    Ok(())
}

fn inspect(input: &Path, horizon: u32) -> anyhow::Result<()> {
    let storage = StorageEngine::load_dir(input)
        .with_context(|| format!("failed to load tables from {}", input.display()))?;
    let dataset = storage.to_dataset().context("failed to decode records")?;

    println!(
        "{} rows from {} tables, {} machines, {} features",
        dataset.len(),
        storage.sources().len(),
        dataset.machine_ids().len(),
        dataset.feature_names().len()
    );
    println!("features: {}", dataset.feature_names().join(", "));
    let counts = label_distribution(&dataset, horizon).context("invalid configuration")?;
    println!("labels (horizon {horizon}):");
    for (label, count) in counts.iter() {
        println!("  {label:>8} {count}");
    }
    Ok(())
}
