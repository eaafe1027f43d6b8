use anyhow::{ensure, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the TOML configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub sampling: SamplingConfig,
    pub sequence: SequenceConfig,
    pub boosting: BoostingConfig,
    pub forest: ForestConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV files concatenated row-wise into one table
    pub files: Vec<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { files: vec![PathBuf::from("data/station00.csv")] }
    }
}

/// Which columns feed the models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub target_column: String,
    /// Columns dropped from the front of the table (identifier / timestamp)
    pub leading_skip: usize,
    /// Columns dropped from the back of the table
    pub trailing_skip: usize,
    /// Tables narrower than this are rejected before any training
    pub min_columns: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            target_column: "power".to_string(),
            leading_skip: 1,
            trailing_skip: 1,
            min_columns: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub seed: u64,
    /// Size of the exploratory subsample; `None` skips it
    pub sample_size: Option<usize>,
    pub train_fraction: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sample_size: Some(300),
            train_fraction: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub hidden_units: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            hidden_units: 10,
            epochs: 10,
            batch_size: 30,
            learning_rate: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub learning_rate: f64,
    pub max_depth: u16,
    pub rounds: usize,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_depth: 3,
            rounds: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self { n_trees: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub render_charts: bool,
    pub chart_dir: PathBuf,
    pub report_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            render_charts: true,
            chart_dir: PathBuf::from("charts"),
            report_path: Some(PathBuf::from("charts/report.json")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from `SOLAR_CONFIG` (or the default path) layered over built-in defaults
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("SOLAR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SOLAR__").split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.data.files.is_empty(), "data.files must list at least one CSV file");
        ensure!(
            self.sampling.train_fraction > 0.0 && self.sampling.train_fraction < 1.0,
            "sampling.train_fraction must be between 0 and 1, got {}",
            self.sampling.train_fraction
        );
        ensure!(
            self.features.min_columns > self.features.leading_skip + self.features.trailing_skip,
            "features.min_columns ({}) leaves no feature columns after skipping {} leading and {} trailing",
            self.features.min_columns,
            self.features.leading_skip,
            self.features.trailing_skip
        );
        ensure!(self.sequence.hidden_units > 0, "sequence.hidden_units must be positive");
        ensure!(self.sequence.epochs > 0, "sequence.epochs must be positive");
        ensure!(self.sequence.batch_size > 0, "sequence.batch_size must be positive");
        ensure!(self.sequence.learning_rate > 0.0, "sequence.learning_rate must be positive");
        ensure!(self.boosting.learning_rate > 0.0, "boosting.learning_rate must be positive");
        ensure!(self.boosting.max_depth > 0, "boosting.max_depth must be positive");
        ensure!(self.boosting.rounds > 0, "boosting.rounds must be positive");
        ensure!(self.forest.n_trees > 0, "forest.n_trees must be positive");
        Ok(())
    }
}
