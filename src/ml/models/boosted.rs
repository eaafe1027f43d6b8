//! Gradient-boosted regression trees
//!
//! Squared-error boosting: start from the target mean, then fit each round's
//! tree to the current residuals and add it with shrinkage. The weak learner
//! is smartcore's CART regression tree capped at `max_depth`.

use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::{debug, info};

use crate::config::BoostingConfig;
use crate::error::{PipelineError, Result};
use crate::ml::{check_prediction_count, check_training_data, to_dense, ModelType, Regressor};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub struct BoostedTreeRegressor {
    config: BoostingConfig,
    base_score: f64,
    trees: Vec<Tree>,
}

impl BoostedTreeRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn rounds_fitted(&self) -> usize {
        self.trees.len()
    }

    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default().with_max_depth(self.config.max_depth)
    }

    fn tree_predict(tree: &Tree, x: &DenseMatrix<f64>) -> Result<Vec<f64>> {
        tree.predict(x)
            .map_err(|e| PipelineError::model(ModelType::GradientBoosting, e))
    }
}

impl Regressor for BoostedTreeRegressor {
    fn model_type(&self) -> ModelType {
        ModelType::GradientBoosting
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_training_data(ModelType::GradientBoosting, x, y)?;
        info!(
            rounds = self.config.rounds,
            eta = self.config.learning_rate,
            max_depth = self.config.max_depth,
            "Training gradient boosting model"
        );

        let x_matrix = to_dense(ModelType::GradientBoosting, x)?;
        self.base_score = y.iter().sum::<f64>() / y.len() as f64;
        self.trees.clear();

        let mut current = vec![self.base_score; y.len()];
        for round in 0..self.config.rounds {
            // negative gradient of 1/2 (y - f)^2
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, f)| t - f).collect();

            let tree = DecisionTreeRegressor::fit(&x_matrix, &residuals, self.tree_parameters())
                .map_err(|e| PipelineError::model(ModelType::GradientBoosting, e))?;
            let step = Self::tree_predict(&tree, &x_matrix)?;
            for (f, s) in current.iter_mut().zip(step) {
                *f += self.config.learning_rate * s;
            }
            self.trees.push(tree);

            let mse = y.iter().zip(&current).map(|(t, f)| (t - f).powi(2)).sum::<f64>() / y.len() as f64;
            debug!(round, train_rmse = mse.sqrt(), "boosting round");
        }
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::model(ModelType::GradientBoosting, "model not trained"));
        }

        let x_matrix = to_dense(ModelType::GradientBoosting, x)?;
        let mut predictions = vec![self.base_score; x.len()];
        for tree in &self.trees {
            let step = Self::tree_predict(tree, &x_matrix)?;
            check_prediction_count(ModelType::GradientBoosting, x.len(), &step)?;
            for (p, s) in predictions.iter_mut().zip(step) {
                *p += self.config.learning_rate * s;
            }
        }
        Ok(predictions)
    }
}
