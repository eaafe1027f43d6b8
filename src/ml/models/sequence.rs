//! LSTM sequence regressor
//!
//! Each feature row is read as a sequence of `n_features` time steps with a
//! single channel, i.e. a `[rows, features, 1]` tensor. An LSTM layer runs
//! over the sequence and a linear head maps the last hidden state to one
//! output. Trained with Adam on mean squared error in mini-batches.
//!
//! Inputs and target are z-scored with statistics from the training rows
//! only; predictions are mapped back to target units.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Linear, LinearConfig, Lstm, LstmConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::SequenceConfig;
use crate::data::Standardizer;
use crate::error::{PipelineError, Result};
use crate::ml::{check_prediction_count, check_training_data, row_width, ModelType, Regressor};

type InferenceBackend = NdArray<f32>;
type TrainingBackend = Autodiff<InferenceBackend>;

const PREDICT_CHUNK: usize = 512;

/// LSTM followed by a single linear output unit
#[derive(Module, Debug)]
pub struct SequenceNet<B: Backend> {
    lstm: Lstm<B>,
    head: Linear<B>,
}

impl<B: Backend> SequenceNet<B> {
    pub fn new(hidden_units: usize, device: &B::Device) -> Self {
        Self {
            lstm: LstmConfig::new(1, hidden_units, true).init(device),
            head: LinearConfig::new(hidden_units, 1).init(device),
        }
    }

    /// `[batch, steps, 1]` in, `[batch, 1]` out
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        let (output, _state) = self.lstm.forward(input, None);
        let [batch, steps, hidden] = output.dims();
        let last = output
            .slice([0..batch, steps - 1..steps, 0..hidden])
            .reshape([batch, hidden]);
        self.head.forward(last)
    }
}

struct Fitted {
    net: SequenceNet<InferenceBackend>,
    inputs: Standardizer,
    target: Standardizer,
    n_features: usize,
}

pub struct SequenceRegressor {
    config: SequenceConfig,
    seed: u64,
    device: NdArrayDevice,
    fitted: Option<Fitted>,
}

impl SequenceRegressor {
    pub fn new(config: SequenceConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            device: NdArrayDevice::default(),
            fitted: None,
        }
    }

    fn sequences<B: Backend>(rows: &[&[f64]], device: &B::Device) -> Tensor<B, 3> {
        let steps = rows.first().map(|r| r.len()).unwrap_or(0);
        let values: Vec<f32> = rows
            .iter()
            .flat_map(|r| r.iter().map(|&v| v as f32))
            .collect();
        Tensor::from_data(TensorData::new(values, [rows.len(), steps, 1]), device)
    }

    fn column<B: Backend>(values: &[f64], device: &B::Device) -> Tensor<B, 2> {
        let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        let n = values.len();
        Tensor::from_data(TensorData::new(values, [n, 1]), device)
    }
}

impl Regressor for SequenceRegressor {
    fn model_type(&self) -> ModelType {
        ModelType::Lstm
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_training_data(ModelType::Lstm, x, y)?;
        let n_features = row_width(ModelType::Lstm, x)?;
        if n_features == 0 || self.config.batch_size == 0 {
            return Err(PipelineError::model(
                ModelType::Lstm,
                "need at least one feature and a positive batch size",
            ));
        }
        info!(
            units = self.config.hidden_units,
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            steps = n_features,
            "Training LSTM model"
        );

        let inputs = Standardizer::fit(x);
        let target = Standardizer::fit_column(y);
        let x_scaled = inputs.transform(x);
        let y_scaled: Vec<f64> = y
            .iter()
            .map(|&v| target.transform_row(&[v])[0])
            .collect();

        TrainingBackend::seed(self.seed);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut model = SequenceNet::<TrainingBackend>::new(self.config.hidden_units, &self.device);
        let mut optim = AdamConfig::new().init::<TrainingBackend, SequenceNet<TrainingBackend>>();
        let loss_fn = MseLoss::new();

        let mut order: Vec<usize> = (0..x_scaled.len()).collect();
        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            let mut batches = 0usize;

            for batch in order.chunks(self.config.batch_size) {
                let rows: Vec<&[f64]> = batch.iter().map(|&i| x_scaled[i].as_slice()).collect();
                let targets: Vec<f64> = batch.iter().map(|&i| y_scaled[i]).collect();

                let input = Self::sequences::<TrainingBackend>(&rows, &self.device);
                let expected = Self::column::<TrainingBackend>(&targets, &self.device);

                let output = model.forward(input);
                let loss = loss_fn.forward(output, expected, Reduction::Mean);
                epoch_loss += loss.clone().into_scalar().elem::<f64>();
                batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.config.learning_rate, model, grads);
            }

            debug!(epoch = epoch + 1, loss = epoch_loss / batches.max(1) as f64, "LSTM epoch");
        }

        self.fitted = Some(Fitted {
            net: model.valid(),
            inputs,
            target,
            n_features,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| PipelineError::model(ModelType::Lstm, "model not trained"))?;
        if let Some(row) = x.iter().find(|r| r.len() != fitted.n_features) {
            return Err(PipelineError::model(
                ModelType::Lstm,
                format!("expected {} features, got {}", fitted.n_features, row.len()),
            ));
        }

        let scaled = fitted.inputs.transform(x);
        let mut predictions = Vec::with_capacity(x.len());
        for chunk in scaled.chunks(PREDICT_CHUNK) {
            let rows: Vec<&[f64]> = chunk.iter().map(|r| r.as_slice()).collect();
            let output = fitted
                .net
                .forward(Self::sequences::<InferenceBackend>(&rows, &self.device));
            let values = output
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| PipelineError::model(ModelType::Lstm, format!("{e:?}")))?;
            predictions.extend(
                values
                    .into_iter()
                    .map(|v| fitted.target.inverse(0, v as f64)),
            );
        }

        check_prediction_count(ModelType::Lstm, x.len(), &predictions)?;
        Ok(predictions)
    }
}
