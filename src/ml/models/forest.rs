//! SmartCore random forest base learner

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::config::ForestConfig;
use crate::error::{PipelineError, Result};
use crate::ml::{check_prediction_count, check_training_data, to_dense, ModelType, Regressor};

/// Random forest regressor
///
/// Tree count comes from config; split and leaf criteria stay at the
/// library defaults.
pub struct ForestRegressor {
    config: ForestConfig,
    seed: u64,
    model: Option<RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
}

impl ForestRegressor {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            model: None,
        }
    }

    pub fn parameters(&self) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            n_trees: self.config.n_trees,
            seed: self.seed,
            ..Default::default()
        }
    }
}

impl Regressor for ForestRegressor {
    fn model_type(&self) -> ModelType {
        ModelType::RandomForest
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_training_data(ModelType::RandomForest, x, y)?;
        info!(trees = self.config.n_trees, rows = x.len(), "Training random forest model");

        let x_matrix = to_dense(ModelType::RandomForest, x)?;
        let y_vec = y.to_vec();

        let model = RandomForestRegressor::fit(&x_matrix, &y_vec, self.parameters())
            .map_err(|e| PipelineError::model(ModelType::RandomForest, e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::model(ModelType::RandomForest, "model not trained"))?;

        let predictions = model
            .predict(&to_dense(ModelType::RandomForest, x)?)
            .map_err(|e| PipelineError::model(ModelType::RandomForest, e))?;
        check_prediction_count(ModelType::RandomForest, x.len(), &predictions)?;
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 2x1 + 3x2
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 8) as f64, (i / 8) as f64])
            .collect();
        let y = x.iter().map(|r| 2.0 * r[0] + 3.0 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_parameters_use_config() {
        let rf = ForestRegressor::new(ForestConfig { n_trees: 100 }, 42);
        let params = rf.parameters();
        assert_eq!(params.n_trees, 100);
        assert_eq!(params.seed, 42);
        assert_eq!(params.max_depth, None);
    }

    #[test]
    fn test_fit_predict() {
        let (x, y) = linear_data();
        let mut rf = ForestRegressor::new(ForestConfig { n_trees: 20 }, 42);
        rf.fit(&x, &y).unwrap();

        let preds = rf.predict(&[vec![3.0, 2.0]]).unwrap();
        assert_eq!(preds.len(), 1);
        // 2*3 + 3*2 = 12
        assert!(preds[0] > 8.0 && preds[0] < 16.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = ForestRegressor::new(ForestConfig::default(), 42);
        assert!(matches!(
            rf.predict(&[vec![1.0, 2.0]]),
            Err(PipelineError::Model { model: ModelType::RandomForest, .. })
        ));
    }
}
