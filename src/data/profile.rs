//! Dataset profiling
//!
//! Summary statistics and missing-value counts for the combined table, in the
//! shape of R's `summary()`: min, quartiles, mean and max per numeric column.

use polars::prelude::*;
use serde::Serialize;
use std::fmt;

use crate::error::Result;

/// Summary of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub nulls: usize,
    /// Present for numeric columns with at least one non-null value
    pub stats: Option<NumericSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub q3: f64,
    pub max: f64,
}

/// Whole-table profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: usize,
    pub total_missing: usize,
    pub summaries: Vec<ColumnSummary>,
}

impl DatasetProfile {
    /// Columns that get distribution charts: everything but the first and last
    pub fn distribution_columns(&self) -> impl Iterator<Item = &ColumnSummary> {
        let end = self.summaries.len().saturating_sub(1);
        self.summaries.iter().take(end).skip(1)
    }
}

/// Profile every column of `df`
pub fn profile(df: &DataFrame) -> Result<DatasetProfile> {
    let mut summaries = Vec::with_capacity(df.width());
    let mut total_missing = 0;

    for series in df.get_columns() {
        let nulls = series.null_count();
        total_missing += nulls;

        let stats = if series.dtype().is_numeric() {
            numeric_summary(series)?
        } else {
            None
        };

        summaries.push(ColumnSummary {
            name: series.name().to_string(),
            dtype: series.dtype().to_string(),
            nulls,
            stats,
        });
    }

    Ok(DatasetProfile {
        rows: df.height(),
        columns: df.width(),
        total_missing,
        summaries,
    })
}

fn numeric_summary(series: &Series) -> Result<Option<NumericSummary>> {
    let values = series.cast(&DataType::Float64)?;
    let ca = values.f64()?;

    let (Some(min), Some(max), Some(mean)) = (ca.min(), ca.max(), ca.mean()) else {
        return Ok(None);
    };
    let quantile = |q: f64| -> Result<f64> {
        Ok(ca
            .quantile(q, QuantileInterpolOptions::Linear)?
            .unwrap_or(f64::NAN))
    };

    Ok(Some(NumericSummary {
        min,
        q1: quantile(0.25)?,
        median: quantile(0.5)?,
        mean,
        q3: quantile(0.75)?,
        max,
    }))
}

impl fmt::Display for DatasetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows x {} columns, {} missing values", self.rows, self.columns, self.total_missing)?;
        writeln!(
            f,
            "{:<24} {:>10} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "column", "dtype", "NA", "min", "1st qu.", "median", "mean", "3rd qu.", "max"
        )?;
        for s in &self.summaries {
            match &s.stats {
                Some(n) => writeln!(
                    f,
                    "{:<24} {:>10} {:>6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                    s.name, s.dtype, s.nulls, n.min, n.q1, n.median, n.mean, n.q3, n.max
                )?,
                None => writeln!(f, "{:<24} {:>10} {:>6}", s.name, s.dtype, s.nulls)?,
            }
        }
        Ok(())
    }
}
