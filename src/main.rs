use anyhow::Result;
use solar_ensemble_forecast::{config, telemetry, Pipeline};
use config::Config;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut cfg = Config::load()?;
    telemetry::init_tracing(&cfg.logging);

    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if !files.is_empty() {
        cfg.data.files = files;
    }

    info!(files = ?cfg.data.files, seed = cfg.sampling.seed, "starting solar ensemble forecast");

    let report = Pipeline::new(cfg)?.run()?;

    println!("Train RMSE: {:.4}", report.evaluation.train.rmse);
    println!("Test RMSE: {:.4}", report.evaluation.test.rmse);
    println!("Train R-squared: {:.4}", report.evaluation.train.r2);
    println!("Test R-squared: {:.4}", report.evaluation.test.r2);
    Ok(())
}
