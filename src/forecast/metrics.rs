//! Forecast Metrics and Evaluation
//!
//! RMSE and R² of the blended predictions, plus MAE and worst-case error
//! for context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecast metrics calculation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("Dimension mismatch: actual={actual}, predicted={predicted}")]
    DimensionMismatch { actual: usize, predicted: usize },

    #[error("Empty data provided")]
    EmptyData,

    #[error("R² is undefined: actual values have zero variance")]
    ConstantTargetVariance,
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<(), MetricsError> {
    if actual.len() != predicted.len() {
        return Err(MetricsError::DimensionMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(MetricsError::EmptyData);
    }
    Ok(())
}

/// Root mean squared error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(actual, predicted)?;
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    Ok(mse.sqrt())
}

/// Coefficient of determination, `1 - ss_res / ss_tot`
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(actual, predicted)?;
    let mean_actual = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    if ss_tot == 0.0 {
        return Err(MetricsError::ConstantTargetVariance);
    }
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    Ok(1.0 - ss_res / ss_tot)
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Root Mean Square Error
    pub rmse: f64,
    /// R² (coefficient of determination)
    pub r2: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Maximum absolute error observed
    pub max_error: f64,
    /// Number of samples evaluated
    pub sample_count: usize,
}

impl ForecastMetrics {
    /// Calculate metrics from actual and predicted values
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, MetricsError> {
        let rmse = rmse(actual, predicted)?;
        let r2 = r_squared(actual, predicted)?;

        let n = actual.len();
        let abs_errors = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs());
        let mae = abs_errors.clone().sum::<f64>() / n as f64;
        let max_error = abs_errors.fold(0.0f64, f64::max);

        Ok(ForecastMetrics {
            rmse,
            r2,
            mae,
            max_error,
            sample_count: n,
        })
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE={:.4}, R²={:.4}, MAE={:.4}, max error={:.4}, n={}",
            self.rmse, self.r2, self.mae, self.max_error, self.sample_count
        )
    }
}

/// Train and test metrics of the blended forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub train: ForecastMetrics,
    pub test: ForecastMetrics,
}

impl Evaluation {
    pub fn calculate(
        train_actual: &[f64],
        train_predicted: &[f64],
        test_actual: &[f64],
        test_predicted: &[f64],
    ) -> Result<Self, MetricsError> {
        Ok(Self {
            train: ForecastMetrics::calculate(train_actual, train_predicted)?,
            test: ForecastMetrics::calculate(test_actual, test_predicted)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_perfect_forecast() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = actual.clone();

        let metrics = ForecastMetrics::calculate(&actual, &predicted).unwrap();

        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.max_error, 0.0);
    }

    #[test]
    fn test_forecast_with_errors() {
        let actual = vec![100.0, 200.0, 300.0, 400.0, 500.0];
        let predicted = vec![110.0, 190.0, 310.0, 390.0, 510.0];

        let metrics = ForecastMetrics::calculate(&actual, &predicted).unwrap();

        assert!((metrics.rmse - 10.0).abs() < 1e-12);
        assert!((metrics.mae - 10.0).abs() < 1e-12);
        // ss_res = 500, ss_tot = 100000
        assert!((metrics.r2 - 0.995).abs() < 1e-12);
        assert_eq!(metrics.sample_count, 5);
    }

    #[test]
    fn test_rmse_hand_computed() {
        // squared errors 0, 4, 16 -> mean 20/3
        let r = rmse(&[1.0, 2.0, 3.0], &[1.0, 4.0, 7.0]).unwrap();
        assert!((r - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = ForecastMetrics::calculate(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        assert_eq!(
            result.unwrap_err(),
            MetricsError::DimensionMismatch { actual: 3, predicted: 2 }
        );
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(rmse(&[], &[]).unwrap_err(), MetricsError::EmptyData);
    }

    #[test]
    fn test_constant_target_variance() {
        let err = r_squared(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, MetricsError::ConstantTargetVariance);
        // RMSE is still defined
        assert!(rmse(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_ok());
    }

    proptest! {
        #[test]
        fn prop_rmse_non_negative(pairs in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 1..200)) {
            let (actual, predicted): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let r = rmse(&actual, &predicted).unwrap();
            prop_assert!(r >= 0.0);
        }

        #[test]
        fn prop_rmse_zero_iff_equal(actual in prop::collection::vec(-1e3f64..1e3, 1..100), idx in any::<prop::sample::Index>(), delta in 0.001f64..10.0) {
            prop_assert_eq!(rmse(&actual, &actual).unwrap(), 0.0);

            let mut predicted = actual.clone();
            let i = idx.index(predicted.len());
            predicted[i] += delta;
            prop_assert!(rmse(&actual, &predicted).unwrap() > 0.0);
        }

        #[test]
        fn prop_r2_is_one_for_exact_predictions(actual in prop::collection::vec(-1e3f64..1e3, 2..100)) {
            let mean = actual.iter().sum::<f64>() / actual.len() as f64;
            prop_assume!(actual.iter().any(|a| (a - mean).abs() > 1e-9));
            prop_assert_eq!(r_squared(&actual, &actual).unwrap(), 1.0);
        }
    }
}
