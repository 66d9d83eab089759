//! CSV source tables
//!
//! Every cell is read as text so that failure codes such as `"1"` or `"01"`
//! keep their exact spelling; numeric columns are cast afterwards by the
//! storage engine. Empty cells and `NaN` spellings become nulls.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};

use crate::Result;

fn cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Read a CSV file with a header row into a single all-`Utf8` batch.
///
/// # Errors
///
/// Returns [`crate::Error::Csv`] if the file cannot be opened or a row has a
/// different number of fields than the header.
pub fn read_csv_table(path: &Path) -> Result<RecordBatch> {
    let mut rdr = csv::Reader::from_path(path)?;

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for result in rdr.records() {
        let record = result?;
        for (column, value) in columns.iter_mut().zip(record.iter()) {
            column.push(cell(value));
        }
    }

    let schema = Schema::new(
        headers
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|values| Arc::new(StringArray::from(values)) as ArrayRef)
        .collect();

    Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use std::io::Write;

    #[test]
    fn test_failure_codes_stay_text() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "entryID,machineID,cycle,sequenceID,rul,failure,volt").unwrap();
        writeln!(file, "1,m1,1,s1,3,01,170.5").unwrap();
        writeln!(file, "2,m1,2,s1,,,NaN").unwrap();
        file.flush().unwrap();

        let batch = read_csv_table(file.path()).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let failure = batch.column_by_name("failure").unwrap().as_string::<i32>();
        assert_eq!(failure.value(0), "01");
        assert!(failure.is_null(1));

        let volt = batch.column_by_name("volt").unwrap();
        assert!(volt.is_null(1));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2,3").unwrap();
        file.flush().unwrap();

        assert!(read_csv_table(file.path()).is_err());
    }
}
