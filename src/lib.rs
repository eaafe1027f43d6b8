//! Solar Ensemble Forecast
//!
//! Stacked-generalization forecasting of solar power output from station
//! sensor and weather CSV data:
//! - [`data`]: loading, profiling, sampling/splitting, feature selection
//! - [`ml`]: LSTM, gradient-boosted trees and random forest base learners,
//!   blended by an OLS meta-learner
//! - [`forecast`]: RMSE / R² evaluation
//! - [`charts`]: distribution and evaluation charts
//! - [`pipeline`]: the end-to-end run

pub mod charts;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod ml;
pub mod pipeline;
pub mod telemetry;

pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineReport};
