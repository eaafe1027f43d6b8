//! Feature and target selection
//!
//! Turns the combined table into a row-major feature matrix plus the target
//! vector. Features are the contiguous block of columns left after dropping
//! the configured number of leading and trailing columns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::FeatureConfig;
use crate::error::{PipelineError, Result};

/// Feature matrix and aligned target vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != targets.len() {
            return Err(PipelineError::RowCountMismatch {
                features: features.len(),
                targets: targets.len(),
            });
        }
        Ok(Self {
            features,
            targets,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// Reject tables too narrow to hold the feature block
pub fn check_column_count(found: usize, required: usize) -> Result<()> {
    if found < required {
        return Err(PipelineError::InsufficientColumns { found, required });
    }
    Ok(())
}

/// Build the modelling dataset from the combined table
pub fn select(df: &DataFrame, cfg: &FeatureConfig) -> Result<Dataset> {
    let skipped = cfg.leading_skip + cfg.trailing_skip;
    check_column_count(df.width(), cfg.min_columns.max(skipped + 1))?;

    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let feature_names = names[cfg.leading_skip..names.len() - cfg.trailing_skip].to_vec();

    if feature_names.contains(&cfg.target_column) {
        warn!(target = %cfg.target_column, "target column lies inside the feature block");
    }

    let target_series = df
        .column(&cfg.target_column)
        .map_err(|_| PipelineError::MissingTargetColumn {
            column: cfg.target_column.clone(),
        })?;
    let targets = numeric_values(target_series)?;

    let columns = feature_names
        .iter()
        .map(|name| numeric_values(df.column(name)?))
        .collect::<Result<Vec<_>>>()?;

    let features = (0..df.height())
        .map(|row| columns.iter().map(|col| col[row]).collect())
        .collect();

    Dataset::new(features, targets, feature_names)
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    if !series.dtype().is_numeric() {
        return Err(PipelineError::NonNumericColumn {
            column: series.name().to_string(),
            dtype: series.dtype().to_string(),
        });
    }
    let nulls = series.null_count();
    if nulls > 0 {
        return Err(PipelineError::MissingValues {
            column: series.name().to_string(),
            count: nulls,
        });
    }
    let values = series.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_no_null_iter().collect())
}

/// Z-score scaling fitted on one set of values and reused on others
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Standardizer {
    /// Fit per-column mean and population standard deviation
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let means: Vec<f64> = (0..width)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let stds = (0..width)
            .map(|j| {
                let var = rows.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();

        Self { means, stds }
    }

    /// Fit on a single column of values
    pub fn fit_column(values: &[f64]) -> Self {
        let rows: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        Self::fit(&rows)
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(v, (mean, std))| {
                if std.abs() < 1e-10 {
                    0.0 // constant column
                } else {
                    (v - mean) / std
                }
            })
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// Map a scaled value of column `j` back to original units
    pub fn inverse(&self, j: usize, value: f64) -> f64 {
        if self.stds[j].abs() < 1e-10 {
            self.means[j]
        } else {
            value * self.stds[j] + self.means[j]
        }
    }
}
