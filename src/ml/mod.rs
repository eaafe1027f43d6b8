//! Machine Learning Module
//!
//! Base learners for the stacked solar power forecaster and the linear
//! meta-learner that blends them:
//! - Sequence model (LSTM, burn)
//! - Gradient-boosted regression trees (smartcore trees)
//! - Random forest (smartcore)
//! - Ordinary least squares stacking (smartcore)
//!
//! Every base learner implements [`Regressor`], so the pipeline only needs
//! the fit/predict capability.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::config::Config;
use crate::error::{PipelineError, Result};

pub mod models;
pub mod stacking;

pub use models::{BoostedTreeRegressor, ForestRegressor, SequenceRegressor};
pub use stacking::{MetaLearner, StackFrame};

/// ML Model Type
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display, strum::EnumIter,
)]
pub enum ModelType {
    #[strum(serialize = "lstm")]
    Lstm,
    #[strum(serialize = "xgb")]
    GradientBoosting,
    #[strum(serialize = "rf")]
    RandomForest,
    #[strum(serialize = "meta")]
    LinearStack,
}

/// Fit/predict capability shared by every base learner
pub trait Regressor {
    fn model_type(&self) -> ModelType;

    /// Train on row-major features `x` and targets `y`
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// One prediction per row of `x`
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;
}

/// The three base learners configured from `cfg`, in stacking column order
pub fn base_learners(cfg: &Config) -> Vec<Box<dyn Regressor>> {
    vec![
        Box::new(SequenceRegressor::new(cfg.sequence.clone(), cfg.sampling.seed)),
        Box::new(BoostedTreeRegressor::new(cfg.boosting.clone())),
        Box::new(ForestRegressor::new(cfg.forest.clone(), cfg.sampling.seed)),
    ]
}

/// Validate `x`/`y` before handing them to a library fit
pub(crate) fn check_training_data(model: ModelType, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    if x.is_empty() || y.is_empty() {
        return Err(PipelineError::model(model, "cannot train on empty dataset"));
    }
    if x.len() != y.len() {
        return Err(PipelineError::RowCountMismatch {
            features: x.len(),
            targets: y.len(),
        });
    }
    Ok(())
}

/// Shared width of every row in `x`; ragged rows are rejected
pub(crate) fn row_width(model: ModelType, x: &[Vec<f64>]) -> Result<usize> {
    let n_features = x.first().map(|r| r.len()).unwrap_or(0);
    if x.iter().any(|row| row.len() != n_features) {
        return Err(PipelineError::model(
            model,
            "all feature vectors must have the same length",
        ));
    }
    Ok(n_features)
}

/// Row-major rows into a smartcore dense matrix
pub(crate) fn to_dense(model: ModelType, x: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let n_samples = x.len();
    let n_features = row_width(model, x)?;
    let flat_data: Vec<f64> = x.iter().flatten().copied().collect();
    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}

/// Fail unless `predictions` has one value per input row
pub(crate) fn check_prediction_count(model: ModelType, expected: usize, predictions: &[f64]) -> Result<()> {
    if predictions.len() != expected {
        return Err(PipelineError::PredictionShapeMismatch {
            model,
            expected,
            found: predictions.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_model_type_labels() {
        let labels: Vec<String> = ModelType::iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["lstm", "xgb", "rf", "meta"]);
    }

    #[test]
    fn test_base_learner_order() {
        let learners = base_learners(&Config::default());
        let kinds: Vec<ModelType> = learners.iter().map(|l| l.model_type()).collect();
        assert_eq!(
            kinds,
            vec![ModelType::Lstm, ModelType::GradientBoosting, ModelType::RandomForest]
        );
    }

    #[test]
    fn test_to_dense_rejects_ragged_rows() {
        let x = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(to_dense(ModelType::RandomForest, &x).is_err());
    }

    #[test]
    fn test_row_width() {
        assert_eq!(row_width(ModelType::Lstm, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap(), 2);
        assert_eq!(row_width(ModelType::Lstm, &[]).unwrap(), 0);
        assert!(row_width(ModelType::Lstm, &[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn test_check_training_data() {
        assert!(check_training_data(ModelType::RandomForest, &[], &[]).is_err());
        let x = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            check_training_data(ModelType::RandomForest, &x, &[1.0]),
            Err(PipelineError::RowCountMismatch { features: 2, targets: 1 })
        ));
    }

    #[test]
    fn test_check_prediction_count() {
        let err = check_prediction_count(ModelType::Lstm, 3, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PredictionShapeMismatch { expected: 3, found: 2, .. }
        ));
    }
}
