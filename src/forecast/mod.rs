//! Forecast evaluation

pub mod metrics;

pub use metrics::{Evaluation, ForecastMetrics, MetricsError};
