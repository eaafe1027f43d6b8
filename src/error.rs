//! Pipeline error types
//!
//! Every failure the forecasting pipeline can hit is a named variant here so
//! callers can tell a bad input file apart from a model that failed to train.

use std::path::PathBuf;
use thiserror::Error;

use crate::forecast::metrics::MetricsError;
use crate::ml::ModelType;

/// Errors raised by the loading, modelling and reporting stages
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("No input files configured")]
    NoInputFiles,

    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },

    #[error("Data frame operation failed: {0}")]
    Frame(#[from] polars::error::PolarsError),

    #[error("Combined dataset has no rows")]
    EmptyTable,

    #[error("Schema mismatch in {}: {detail}", path.display())]
    SchemaMismatch { path: PathBuf, detail: String },

    #[error("Not enough columns in the dataset: found {found}, need at least {required}")]
    InsufficientColumns { found: usize, required: usize },

    #[error("Feature and target count mismatch: {features} feature rows, {targets} targets")]
    RowCountMismatch { features: usize, targets: usize },

    #[error("Target column '{column}' not found")]
    MissingTargetColumn { column: String },

    #[error("Column '{column}' is not numeric ({dtype})")]
    NonNumericColumn { column: String, dtype: String },

    #[error("Column '{column}' has {count} missing values")]
    MissingValues { column: String, count: usize },

    #[error("Cannot sample {requested} rows from a table with {rows} rows")]
    InsufficientRowsForSample { rows: usize, requested: usize },

    #[error("{model} produced {found} predictions, expected {expected}")]
    PredictionShapeMismatch {
        model: ModelType,
        expected: usize,
        found: usize,
    },

    #[error("{model} failed: {message}")]
    Model { model: ModelType, message: String },

    #[error("Failed to render chart {}: {message}", path.display())]
    Chart { path: PathBuf, message: String },

    #[error("Failed to write report {}: {message}", path.display())]
    Report { path: PathBuf, message: String },

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl PipelineError {
    /// Wrap a failure reported by an underlying ML library
    pub fn model(model: ModelType, err: impl std::fmt::Display) -> Self {
        PipelineError::Model {
            model,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
