//! CSV loading
//!
//! Reads one or more station CSV files and stacks them into a single table.
//! Files are bound by column name: the first file fixes the column order and
//! every later file must carry the same set of columns.

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PipelineError, Result};

/// Read a single CSV file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    // The handle is moved into the reader and closed when it is dropped,
    // on success and on parse failure alike.
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    CsvReader::new(file)
        .has_header(true)
        .finish()
        .map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Load and row-concatenate every file in `paths`
pub fn load_tables<P: AsRef<Path>>(paths: &[P]) -> Result<DataFrame> {
    let mut combined: Option<DataFrame> = None;

    for path in paths {
        let path = path.as_ref();
        let frame = read_csv(path)?;
        info!(file = %path.display(), rows = frame.height(), "Loaded dataset");

        combined = Some(match combined {
            None => frame,
            Some(acc) => append(acc, frame, path)?,
        });
    }

    let combined = combined.ok_or(PipelineError::NoInputFiles)?;
    if combined.height() == 0 {
        return Err(PipelineError::EmptyTable);
    }

    let (rows, columns) = combined.shape();
    info!(rows, columns, "Combined dataset dimensions");
    Ok(combined)
}

/// Stack `next` under `acc`, reconciling column order and numeric dtypes
fn append(mut acc: DataFrame, next: DataFrame, path: &Path) -> Result<DataFrame> {
    let expected: Vec<String> = acc
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut found: Vec<String> = next
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut sorted_expected = expected.clone();
    sorted_expected.sort();
    found.sort();
    if sorted_expected != found {
        return Err(schema_mismatch(
            path,
            format!("expected columns [{}], found [{}]", expected.join(", "), found.join(", ")),
        ));
    }

    let mut next = next.select(&expected)?;

    for name in &expected {
        let left = acc.column(name)?.dtype().clone();
        let right = next.column(name)?.dtype().clone();
        if left == right {
            continue;
        }
        if left.is_numeric() && right.is_numeric() {
            let widened = acc.column(name)?.cast(&DataType::Float64)?;
            acc.with_column(widened)?;
            let widened = next.column(name)?.cast(&DataType::Float64)?;
            next.with_column(widened)?;
        } else {
            return Err(schema_mismatch(
                path,
                format!("column '{name}' is {left} in earlier files but {right} here"),
            ));
        }
    }

    acc.vstack_mut(&next)
        .map_err(|e| schema_mismatch(path, e.to_string()))?;
    Ok(acc)
}

fn schema_mismatch(path: &Path, detail: String) -> PipelineError {
    PipelineError::SchemaMismatch {
        path: PathBuf::from(path),
        detail,
    }
}
