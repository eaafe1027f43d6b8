//! Stacked generalization
//!
//! The base learners' predictions become the columns of a [`StackFrame`];
//! an ordinary least squares fit over the training frame blends them.

use serde::Serialize;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};

use crate::error::{PipelineError, Result};
use crate::ml::{check_prediction_count, check_training_data, to_dense, ModelType};

/// Base learner predictions side by side, one column per learner
#[derive(Debug, Clone, Serialize)]
pub struct StackFrame {
    pub columns: Vec<(ModelType, Vec<f64>)>,
    rows: usize,
}

impl StackFrame {
    /// Build a frame whose every column must have exactly `rows` values
    pub fn new(rows: usize, columns: Vec<(ModelType, Vec<f64>)>) -> Result<Self> {
        for (model, values) in &columns {
            check_prediction_count(*model, rows, values)?;
        }
        Ok(Self { columns, rows })
    }

    /// (rows, learners)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn models(&self) -> Vec<ModelType> {
        self.columns.iter().map(|(m, _)| *m).collect()
    }

    /// Row-major view for the regression library
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|i| self.columns.iter().map(|(_, col)| col[i]).collect())
            .collect()
    }
}

/// Intercept and one coefficient per base learner
#[derive(Debug, Clone, Serialize)]
pub struct StackWeights {
    pub intercept: f64,
    pub coefficients: Vec<(ModelType, f64)>,
}

/// OLS meta-learner over base learner predictions
pub struct MetaLearner {
    model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    models: Vec<ModelType>,
}

impl MetaLearner {
    pub fn fit(frame: &StackFrame, y: &[f64]) -> Result<Self> {
        let rows = frame.to_rows();
        check_training_data(ModelType::LinearStack, &rows, y)?;

        let x = to_dense(ModelType::LinearStack, &rows)?;
        let params = LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let model = LinearRegression::fit(&x, &y.to_vec(), params)
            .map_err(|e| PipelineError::model(ModelType::LinearStack, e))?;

        Ok(Self {
            model,
            models: frame.models(),
        })
    }

    /// Blend a frame whose columns follow the training frame's learner order
    pub fn predict(&self, frame: &StackFrame) -> Result<Vec<f64>> {
        if frame.models() != self.models {
            return Err(PipelineError::model(
                ModelType::LinearStack,
                format!("expected columns {:?}, got {:?}", self.models, frame.models()),
            ));
        }
        let (rows, _) = frame.shape();
        let predictions = self.predict_rows(&frame.to_rows())?;
        check_prediction_count(ModelType::LinearStack, rows, &predictions)?;
        Ok(predictions)
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.model
            .predict(&to_dense(ModelType::LinearStack, rows)?)
            .map_err(|e| PipelineError::model(ModelType::LinearStack, e))
    }

    /// Fitted intercept and per-learner coefficients
    pub fn weights(&self) -> Result<StackWeights> {
        let coefficients: Vec<f64> = self.model.coefficients().iterator(0).copied().collect();
        if coefficients.len() != self.models.len() {
            return Err(PipelineError::model(
                ModelType::LinearStack,
                format!(
                    "expected {} coefficients, got {}",
                    self.models.len(),
                    coefficients.len()
                ),
            ));
        }

        Ok(StackWeights {
            intercept: *self.model.intercept(),
            coefficients: self.models.iter().copied().zip(coefficients).collect(),
        })
    }
}
