//! Stacked forecasting pipeline
//!
//! load → profile → sample → select → split → base learners → meta-learner
//! → evaluate → charts. Configuration and the seeded random sources are
//! passed explicitly to each stage.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::charts;
use crate::config::Config;
use crate::data::{features, loader, profile, split, Dataset, DatasetProfile, SplitIndices};
use crate::error::{PipelineError, Result};
use crate::forecast::Evaluation;
use crate::ml::stacking::StackWeights;
use crate::ml::{base_learners, check_prediction_count, MetaLearner, ModelType, StackFrame};

/// Train and test predictions of one base learner
#[derive(Debug, Clone, Serialize)]
pub struct LearnerPredictions {
    pub model: ModelType,
    pub train: Vec<f64>,
    pub test: Vec<f64>,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: uuid::Uuid,
    pub generated_at: DateTime<Utc>,
    pub rows: usize,
    pub columns: usize,
    pub profile: DatasetProfile,
    pub sample_shape: Option<(usize, usize)>,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    #[serde(skip)]
    pub split: SplitIndices,
    #[serde(skip)]
    pub base_predictions: Vec<LearnerPredictions>,
    pub stack_shape: (usize, usize),
    pub meta_weights: StackWeights,
    #[serde(skip)]
    pub final_train: Vec<f64>,
    #[serde(skip)]
    pub final_test: Vec<f64>,
    pub evaluation: Evaluation,
    pub charts: Vec<PathBuf>,
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Validate `config` and build a pipeline around it
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the configured files and run every stage
    pub fn run(&self) -> Result<PipelineReport> {
        info!("Loading datasets...");
        let table = loader::load_tables(&self.config.data.files)?;
        self.run_on_table(&table)
    }

    /// Run every stage after loading on an in-memory table
    pub fn run_on_table(&self, table: &DataFrame) -> Result<PipelineReport> {
        validate(&self.config)?;
        let (rows, columns) = table.shape();
        let mut chart_paths = Vec::new();

        let profile = profile::profile(table)?;
        info!(total_missing = profile.total_missing, "Summary of combined dataset:\n{profile}");
        if self.config.output.render_charts {
            chart_paths.extend(self.render_distributions(table, &profile)?);
        }

        let sample_shape = self.diagnostic_sample(table)?;

        let dataset = features::select(table, &self.config.features)?;
        let split = split::train_test_split(
            dataset.len(),
            self.config.sampling.train_fraction,
            &mut StdRng::seed_from_u64(self.config.sampling.seed),
        );
        let train = dataset.subset(&split.train);
        let test = dataset.subset(&split.test);
        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            features = dataset.n_features(),
            "Training and test data split completed"
        );

        let base_predictions = self.train_base_learners(&train, &test)?;

        info!("Training meta-learner (linear regression)...");
        let stack_train = StackFrame::new(
            train.len(),
            base_predictions.iter().map(|p| (p.model, p.train.clone())).collect(),
        )?;
        let stack_test = StackFrame::new(
            test.len(),
            base_predictions.iter().map(|p| (p.model, p.test.clone())).collect(),
        )?;
        let meta = MetaLearner::fit(&stack_train, &train.targets)?;
        let meta_weights = meta.weights()?;
        info!(
            intercept = meta_weights.intercept,
            coefficients = ?meta_weights.coefficients,
            "Meta-learner fitted"
        );
        let final_train = meta.predict(&stack_train)?;
        let final_test = meta.predict(&stack_test)?;

        info!("Evaluating models using RMSE and R-squared...");
        let evaluation = Evaluation::calculate(&train.targets, &final_train, &test.targets, &final_test)?;
        info!(rmse = evaluation.train.rmse, r2 = evaluation.train.r2, "Train: {}", evaluation.train);
        info!(rmse = evaluation.test.rmse, r2 = evaluation.test.r2, "Test: {}", evaluation.test);

        if self.config.output.render_charts {
            chart_paths.extend(self.render_evaluation(&train, &test, &final_train, &final_test, &evaluation)?);
        }

        let report = PipelineReport {
            run_id: uuid::Uuid::new_v4(),
            generated_at: Utc::now(),
            rows,
            columns,
            profile,
            sample_shape,
            feature_names: dataset.feature_names.clone(),
            train_rows: train.len(),
            test_rows: test.len(),
            split,
            base_predictions,
            stack_shape: stack_train.shape(),
            meta_weights,
            final_train,
            final_test,
            evaluation,
            charts: chart_paths,
        };

        if let Some(path) = &self.config.output.report_path {
            write_report(path, &report)?;
            info!(path = %path.display(), "Report written");
        }

        info!("Model evaluation and visualizations completed.");
        Ok(report)
    }

    /// Exploratory subsample; only its shape is reported
    fn diagnostic_sample(&self, table: &DataFrame) -> Result<Option<(usize, usize)>> {
        let Some(size) = self.config.sampling.sample_size else {
            return Ok(None);
        };
        let mut rng = StdRng::seed_from_u64(self.config.sampling.seed);
        let indices = split::sample_indices(table.height(), size, &mut rng)?;
        let idx = IdxCa::from_vec(
            "sample",
            indices.iter().map(|&i| i as IdxSize).collect(),
        );
        let sample = table.take(&idx)?;
        info!(rows = sample.height(), columns = sample.width(), "Drew exploratory subsample");
        Ok(Some(sample.shape()))
    }

    fn train_base_learners(&self, train: &Dataset, test: &Dataset) -> Result<Vec<LearnerPredictions>> {
        let mut outputs = Vec::new();
        for mut learner in base_learners(&self.config) {
            let model = learner.model_type();
            learner.fit(&train.features, &train.targets)?;

            let train_pred = learner.predict(&train.features)?;
            check_prediction_count(model, train.len(), &train_pred)?;
            let test_pred = learner.predict(&test.features)?;
            check_prediction_count(model, test.len(), &test_pred)?;

            info!(%model, train = train_pred.len(), test = test_pred.len(), "Base learner predictions ready");
            outputs.push(LearnerPredictions {
                model,
                train: train_pred,
                test: test_pred,
            });
        }
        Ok(outputs)
    }

    fn chart_dir(&self) -> Result<&Path> {
        let dir = self.config.output.chart_dir.as_path();
        fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(dir)
    }

    fn render_distributions(&self, table: &DataFrame, profile: &DatasetProfile) -> Result<Vec<PathBuf>> {
        info!("Visualizing dataset distributions...");
        let dir = self.chart_dir()?;
        let mut paths = Vec::new();

        for summary in profile.distribution_columns() {
            if summary.stats.is_none() {
                warn!(column = %summary.name, "skipping distribution charts for non-numeric column");
                continue;
            }
            let values: Vec<f64> = table
                .column(&summary.name)?
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .flatten()
                .collect();
            let slug = charts::slug(&summary.name);
            paths.push(charts::histogram(&dir.join(format!("hist_{slug}.svg")), &summary.name, &values)?);
            paths.push(charts::boxplot(&dir.join(format!("box_{slug}.svg")), &summary.name, &values)?);
        }
        Ok(paths)
    }

    fn render_evaluation(
        &self,
        train: &Dataset,
        test: &Dataset,
        final_train: &[f64],
        final_test: &[f64],
        evaluation: &Evaluation,
    ) -> Result<Vec<PathBuf>> {
        info!("Visualizing RMSE comparison and predicted vs actual...");
        let dir = self.chart_dir()?;
        Ok(vec![
            charts::rmse_bars(&dir.join("rmse_comparison.svg"), evaluation.train.rmse, evaluation.test.rmse)?,
            charts::predicted_vs_actual(
                &dir.join("predicted_vs_actual_train.svg"),
                "Predicted vs Actual (Training Set)",
                &train.targets,
                final_train,
                true,
            )?,
            charts::predicted_vs_actual(
                &dir.join("predicted_vs_actual_test.svg"),
                "Predicted vs Actual (Testing Set)",
                &test.targets,
                final_test,
                false,
            )?,
        ])
    }
}

fn validate(config: &Config) -> Result<()> {
    config
        .validate()
        .map_err(|e| PipelineError::InvalidConfig { message: format!("{e:#}") })
}

fn write_report(path: &Path, report: &PipelineReport) -> Result<()> {
    let report_err = |message: String| PipelineError::Report {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| report_err(e.to_string()))?;
    }
    let file = fs::File::create(path).map_err(|e| report_err(e.to_string()))?;
    serde_json::to_writer_pretty(file, report).map_err(|e| report_err(e.to_string()))
}
