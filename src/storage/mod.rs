//! Record store loader (Arrow/Parquet + CSV)
//!
//! **Append-Only Design**:
//! - Every source table becomes one or more Arrow batches
//! - Batches are appended, never updated; the first source fixes the column
//!   order and every later source must carry exactly the same column set
//! - Each batch is cast to one canonical typed schema on append, so the
//!   concatenation is always well-typed
//!
//! Canonical column types:
//! - `entryID`, `cycle`: Int64
//! - `machineID`, `sequenceID`, `failure`: Utf8 (failure codes are never
//!   coerced to numbers)
//! - `rul` and every feature column: Float64

mod csv_table;

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::{self, CastOptions};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::util::display::FormatOptions;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, info};

use crate::record::{
    is_reserved, Dataset, Record, CYCLE, ENTRY_ID, FAILURE, MACHINE_ID, RESERVED_COLUMNS, RUL,
    SEQUENCE_ID,
};
use crate::{Error, Result};

pub use csv_table::read_csv_table;

/// Canonical Arrow type for a column name.
#[must_use]
pub fn canonical_type(column: &str) -> DataType {
    match column {
        ENTRY_ID | CYCLE => DataType::Int64,
        MACHINE_ID | SEQUENCE_ID | FAILURE => DataType::Utf8,
        _ => DataType::Float64,
    }
}

/// Storage engine holding the unified, canonically typed source tables
pub struct StorageEngine {
    schema: Option<SchemaRef>,
    batches: Vec<RecordBatch>,
    sources: Vec<String>,
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Create an empty storage engine
    #[must_use]
    pub const fn new() -> Self {
        Self {
            schema: None,
            batches: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Load every `*.parquet` and `*.csv` table in `dir`, in file-name order
    ///
    /// # Errors
    /// Returns error if the directory is unreadable or holds no tables, if a
    /// table cannot be parsed, or if the tables disagree on their columns
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut storage = Self::new();
        for path in paths {
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("parquet") => storage.load_parquet(&path)?,
                Some("csv") => storage.load_csv(&path)?,
                _ => debug!(path = %path.display(), "skipping non-tabular file"),
            }
        }

        if storage.sources.is_empty() {
            return Err(Error::Storage(format!(
                "No source tables (*.parquet, *.csv) in {}",
                dir.display()
            )));
        }

        info!(
            sources = storage.sources.len(),
            rows = storage.num_rows(),
            "loaded record store"
        );
        Ok(storage)
    }

    /// Append every batch of a Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed, or on schema mismatch
    pub fn load_parquet<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let source_name = source_name(path);

        let file = File::open(path).map_err(|e| {
            Error::Storage(format!("Failed to open Parquet file {source_name}: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::Storage(format!("Failed to parse Parquet file {source_name}: {e}"))
        })?;

        let reader = builder.build().map_err(|e| {
            Error::Storage(format!("Failed to create Parquet reader for {source_name}: {e}"))
        })?;

        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::Storage(format!("Failed to read record batch from {source_name}: {e}"))
            })?;
            self.append_batch(&source_name, batch)?;
        }

        self.sources.push(source_name);
        Ok(())
    }

    /// Append a CSV file (every cell read as text, then cast)
    ///
    /// # Errors
    /// Returns error if the file cannot be parsed, or on schema mismatch
    pub fn load_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let source_name = source_name(path);
        let batch = read_csv_table(path)?;
        self.append_batch(&source_name, batch)?;
        self.sources.push(source_name);
        Ok(())
    }

    /// Append a batch after checking its column set and casting it to the
    /// canonical schema
    ///
    /// # Errors
    ///
    /// - [`Error::MissingColumn`] if the first batch lacks an identifier column
    /// - [`Error::SchemaMismatch`] if the column set differs from the first batch
    /// - [`Error::InvalidRecord`] if a value cannot be cast to its canonical type
    pub fn append_batch(&mut self, source_name: &str, batch: RecordBatch) -> Result<()> {
        let found: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let schema = match &self.schema {
            Some(schema) => {
                let expected: Vec<String> =
                    schema.fields().iter().map(|f| f.name().clone()).collect();
                let expected_set: BTreeSet<&String> = expected.iter().collect();
                let found_set: BTreeSet<&String> = found.iter().collect();
                if expected_set != found_set || expected.len() != found.len() {
                    return Err(Error::SchemaMismatch {
                        source_name: source_name.to_string(),
                        expected,
                        found,
                    });
                }
                Arc::clone(schema)
            }
            None => {
                let schema = canonical_schema(source_name, &found)?;
                self.schema = Some(Arc::clone(&schema));
                schema
            }
        };

        let canonical = canonicalize(source_name, &batch, &schema)?;
        debug!(source = source_name, rows = canonical.num_rows(), "appended batch");
        self.batches.push(canonical);
        Ok(())
    }

    /// Canonical schema, once the first batch has been appended
    #[must_use]
    pub fn schema(&self) -> Option<SchemaRef> {
        self.schema.clone()
    }

    /// Source names, in load order
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Total rows across all batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Feature column names (non-reserved columns), in column order
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .map(|schema| {
                schema
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .filter(|name| !is_reserved(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Concatenate every batch into one order-preserving [`Dataset`]
    ///
    /// # Errors
    /// Returns error if nothing was loaded or a record holds an invalid value
    pub fn to_dataset(&self) -> Result<Dataset> {
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| Error::Storage("No data in storage".to_string()))?;

        let combined = compute::concat_batches(schema, &self.batches)?;
        let records = decode_records(&combined)?;
        Ok(Dataset::new(self.feature_names(), records))
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn canonical_schema(source_name: &str, columns: &[String]) -> Result<SchemaRef> {
    for required in RESERVED_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(Error::MissingColumn {
                source_name: source_name.to_string(),
                column: required.to_string(),
            });
        }
    }

    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name, canonical_type(name), true))
        .collect();
    Ok(Arc::new(Schema::new(fields)))
}

/// Project `batch` onto the canonical column order and cast every column.
fn canonicalize(source_name: &str, batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let options = CastOptions {
        safe: false,
        format_options: FormatOptions::default(),
    };

    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let column = batch.column_by_name(field.name()).ok_or_else(|| {
                Error::MissingColumn {
                    source_name: source_name.to_string(),
                    column: field.name().clone(),
                }
            })?;
            compute::cast_with_options(column, field.data_type(), &options).map_err(|e| {
                Error::InvalidRecord(format!(
                    "{source_name}: column '{}' cannot be read as {}: {e}",
                    field.name(),
                    field.data_type()
                ))
            })
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch.column_by_name(name).ok_or_else(|| Error::MissingColumn {
        source_name: "record store".to_string(),
        column: name.to_string(),
    })
}

fn ensure_present(array: &dyn Array, row: usize, entry_id: i64, column: &str) -> Result<()> {
    if array.is_null(row) {
        return Err(Error::InvalidRecord(format!(
            "{ENTRY_ID}={entry_id}: {column} is null"
        )));
    }
    Ok(())
}

/// NaN and `+inf` mean the run never fails. Fractional values are
/// truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn decode_rul(value: f64, entry_id: i64) -> Result<Option<u32>> {
    if value.is_nan() || (value.is_infinite() && value.is_sign_positive()) {
        return Ok(None);
    }
    if value < 0.0 {
        return Err(Error::InvalidRecord(format!(
            "{ENTRY_ID}={entry_id}: negative {RUL} {value}"
        )));
    }
    if value >= f64::from(u32::MAX) + 1.0 {
        return Err(Error::InvalidRecord(format!(
            "{ENTRY_ID}={entry_id}: {RUL} {value} out of range"
        )));
    }
    Ok(Some(value as u32))
}

fn decode_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let entry_ids = required_column(batch, ENTRY_ID)?.as_primitive::<Int64Type>();
    let machines = required_column(batch, MACHINE_ID)?.as_string::<i32>();
    let cycles = required_column(batch, CYCLE)?.as_primitive::<Int64Type>();
    let sequences = required_column(batch, SEQUENCE_ID)?.as_string::<i32>();
    let ruls = required_column(batch, RUL)?.as_primitive::<Float64Type>();
    let failures = required_column(batch, FAILURE)?.as_string::<i32>();

    let features: Vec<_> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !is_reserved(f.name()))
        .map(|(i, _)| batch.column(i).as_primitive::<Float64Type>().clone())
        .collect();

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if entry_ids.is_null(row) {
            return Err(Error::InvalidRecord(format!("row {row}: {ENTRY_ID} is null")));
        }
        let entry_id = entry_ids.value(row);

        ensure_present(machines, row, entry_id, MACHINE_ID)?;
        ensure_present(cycles, row, entry_id, CYCLE)?;
        ensure_present(sequences, row, entry_id, SEQUENCE_ID)?;

        let rul = if ruls.is_null(row) {
            None
        } else {
            decode_rul(ruls.value(row), entry_id)?
        };

        let failure = if failures.is_null(row) {
            String::new()
        } else {
            failures.value(row).to_string()
        };

        records.push(Record {
            entry_id,
            machine_id: machines.value(row).to_string(),
            cycle: cycles.value(row),
            sequence_id: sequences.value(row).to_string(),
            rul,
            failure,
            features: features
                .iter()
                .map(|f| if f.is_null(row) { f64::NAN } else { f.value(row) })
                .collect(),
        });
    }

    Ok(records)
}
