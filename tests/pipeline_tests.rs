//! End-to-end runs of the stacked forecasting pipeline on synthetic
//! station data written to CSV.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use solar_ensemble_forecast::config::Config;
use solar_ensemble_forecast::ml::ModelType;
use solar_ensemble_forecast::{Pipeline, PipelineError};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("solar-pipeline-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// `date_time`, `width - 2` weather features, then `power`
fn write_station_csv(path: &Path, rows: usize, width: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.05).unwrap();
    let n_features = width - 2;

    let mut out = String::from("date_time");
    for j in 0..n_features {
        write!(out, ",feature_{j}").unwrap();
    }
    out.push_str(",power\n");

    for i in 0..rows {
        let features: Vec<f64> = (0..n_features).map(|_| rng.gen_range(0.0..1.0)).collect();
        let power = 3.0 * features[0] + 2.0 * features[1] - features[2] + 0.5 * features[3] * features[4]
            + noise.sample(&mut rng);

        write!(out, "2019-01-01 {:02}:{:02}:00", (i / 4) % 24, (i % 4) * 15).unwrap();
        for f in &features {
            write!(out, ",{f:.6}").unwrap();
        }
        writeln!(out, ",{power:.6}").unwrap();
    }
    std::fs::write(path, out).unwrap();
}

fn config_for(dir: &Path, files: Vec<PathBuf>) -> Config {
    let mut cfg = Config::default();
    cfg.data.files = files;
    cfg.output.chart_dir = dir.join("charts");
    cfg.output.report_path = Some(dir.join("report.json"));
    cfg
}

/// Small models so repeated runs stay quick
fn quick(mut cfg: Config) -> Config {
    cfg.sequence.epochs = 2;
    cfg.boosting.rounds = 10;
    cfg.forest.n_trees = 10;
    cfg.output.render_charts = false;
    cfg
}

#[test]
fn test_end_to_end_stacked_forecast() {
    let dir = scratch_dir("e2e");
    let csv = dir.join("station00.csv");
    write_station_csv(&csv, 1000, 16, 7);

    let report = Pipeline::new(config_for(&dir, vec![csv])).unwrap().run().unwrap();

    assert_eq!((report.rows, report.columns), (1000, 16));
    assert_eq!(report.profile.total_missing, 0);
    assert_eq!(report.sample_shape, Some((300, 16)));
    assert_eq!(report.feature_names.len(), 14);
    assert_eq!((report.train_rows, report.test_rows), (800, 200));

    let models: Vec<ModelType> = report.base_predictions.iter().map(|p| p.model).collect();
    assert_eq!(
        models,
        vec![ModelType::Lstm, ModelType::GradientBoosting, ModelType::RandomForest]
    );
    for p in &report.base_predictions {
        assert_eq!(p.train.len(), 800, "{} train predictions", p.model);
        assert_eq!(p.test.len(), 200, "{} test predictions", p.model);
    }
    assert_eq!(report.stack_shape, (800, 3));
    assert_eq!(report.final_train.len(), 800);
    assert_eq!(report.final_test.len(), 200);

    let eval = &report.evaluation;
    for value in [eval.train.rmse, eval.test.rmse, eval.train.r2, eval.test.r2] {
        assert!(value.is_finite());
    }
    assert!(eval.train.rmse >= 0.0);
    assert!(eval.test.rmse >= 0.0);
    // The tree learners capture most of the signal
    assert!(eval.test.r2 > 0.5, "test R² {}", eval.test.r2);

    // 14 feature columns x (histogram + boxplot) + 3 evaluation charts
    assert_eq!(report.charts.len(), 31);
    assert!(report.charts.iter().all(|p| p.exists()));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["train_rows"], 800);
    assert_eq!(json["stack_shape"], serde_json::json!([800, 3]));
}

#[test]
fn test_insufficient_columns_fails_before_training() {
    let dir = scratch_dir("narrow");
    let csv = dir.join("narrow.csv");
    write_station_csv(&csv, 400, 14, 1);

    let err = Pipeline::new(quick(config_for(&dir, vec![csv]))).unwrap().run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InsufficientColumns { found: 14, required: 15 }
    ));
    assert!(!dir.join("report.json").exists());
}

#[test]
fn test_exactly_fifteen_columns_passes_guard() {
    let dir = scratch_dir("fifteen");
    let csv = dir.join("fifteen.csv");
    write_station_csv(&csv, 400, 15, 2);

    let report = Pipeline::new(quick(config_for(&dir, vec![csv]))).unwrap().run().unwrap();
    assert_eq!(report.feature_names.len(), 13);
    assert_eq!((report.train_rows, report.test_rows), (320, 80));
}

#[test]
fn test_concatenates_multiple_station_files() {
    let dir = scratch_dir("multi");
    let a = dir.join("station00.csv");
    let b = dir.join("station01.csv");
    write_station_csv(&a, 600, 16, 3);
    write_station_csv(&b, 400, 16, 4);

    let report = Pipeline::new(quick(config_for(&dir, vec![a, b]))).unwrap().run().unwrap();
    assert_eq!((report.rows, report.columns), (1000, 16));
    assert_eq!(report.train_rows + report.test_rows, 1000);
}

#[test]
fn test_too_few_rows_for_subsample() {
    let dir = scratch_dir("few-rows");
    let csv = dir.join("small.csv");
    write_station_csv(&csv, 200, 16, 5);

    let cfg = quick(config_for(&dir, vec![csv]));
    let err = Pipeline::new(cfg.clone()).unwrap().run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InsufficientRowsForSample { rows: 200, requested: 300 }
    ));

    let mut without_sample = cfg;
    without_sample.sampling.sample_size = None;
    let report = Pipeline::new(without_sample).unwrap().run().unwrap();
    assert_eq!(report.sample_shape, None);
    assert_eq!((report.train_rows, report.test_rows), (160, 40));
}

#[test]
fn test_same_seed_reproduces_partition_and_tree_predictions() {
    let dir = scratch_dir("determinism");
    let csv = dir.join("station.csv");
    write_station_csv(&csv, 400, 16, 6);

    let cfg = quick(config_for(&dir, vec![csv]));
    let first = Pipeline::new(cfg.clone()).unwrap().run().unwrap();
    let second = Pipeline::new(cfg).unwrap().run().unwrap();

    assert_eq!(first.split, second.split);
    for (a, b) in first.base_predictions.iter().zip(&second.base_predictions) {
        if a.model != ModelType::Lstm {
            assert_eq!(a.train, b.train, "{} train predictions differ", a.model);
            assert_eq!(a.test, b.test, "{} test predictions differ", a.model);
        }
    }
}

#[test]
fn test_missing_file_is_reported() {
    let dir = scratch_dir("missing");
    let cfg = quick(config_for(&dir, vec![dir.join("nope.csv")]));
    let err = Pipeline::new(cfg).unwrap().run().unwrap_err();
    assert!(matches!(err, PipelineError::FileNotFound { .. }));
}

#[test]
fn test_station_files_with_different_columns_are_rejected() {
    let dir = scratch_dir("schema");
    let a = dir.join("station00.csv");
    let b = dir.join("station01.csv");
    write_station_csv(&a, 300, 16, 8);
    write_station_csv(&b, 300, 15, 9);

    let err = Pipeline::new(quick(config_for(&dir, vec![a, b]))).unwrap().run().unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
}

#[test]
fn test_invalid_config_is_rejected_before_any_stage() {
    let dir = scratch_dir("invalid-config");
    let csv = dir.join("station.csv");
    write_station_csv(&csv, 400, 16, 10);

    let mut cfg = quick(config_for(&dir, vec![csv]));
    cfg.sequence.batch_size = 0;
    let err = Pipeline::new(cfg).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    assert!(err.to_string().contains("batch_size"));
    assert!(!dir.join("report.json").exists());
}
