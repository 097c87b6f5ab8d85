use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::error::{MetisError, Result};
use crate::layers::Layer;
use crate::loss::{create_loss, Loss};
use crate::matrix::{
    apply_row_permutation, argmax, is_label_column, is_one_hot, labels_to_one_hot, rand_perm,
};
use crate::network::Net;
use crate::optimizer::{Optimizer, OptimizerWrapper};
use super::config::{ProblemKind, TrainConfig};
use super::result::{Metric, TrainResult};

/// Hook invoked once per epoch on the training thread
pub type EpochCallback = Arc<dyn Fn(&NetTrain) + Send + Sync>;

/// Optimizers bound to the learnable tensors of one layer
#[derive(Clone)]
struct ParamOptimizers {
    weights: Option<OptimizerWrapper>,
    bias: Option<OptimizerWrapper>,
}

impl ParamOptimizers {
    /// Apply the accumulated gradients of `layer`, scaled by `scale`
    fn step(&mut self, layer: &mut Box<dyn Layer>, scale: f32) {
        if let Some(optimizer) = self.weights.as_mut() {
            if let Some((weights, gradient)) = layer.weights_and_gradient_mut() {
                let averaged = gradient * scale;
                optimizer.optimize(weights, &averaged);
            }
        }
        if let Some(optimizer) = self.bias.as_mut() {
            if let Some((bias, gradient)) = layer.bias_and_gradient_mut() {
                let averaged = gradient * scale;
                optimizer.optimize(bias, &averaged);
            }
        }
    }

    fn init(&mut self) {
        self.weights.iter_mut().chain(self.bias.iter_mut()).for_each(|o| o.init());
    }
}

/// Training-set matrices after truth preparation
struct Prepared {
    samples: Array2<f32>,
    truth: Array2<f32>,
}

/// Epoch-based training loop.
///
/// A `NetTrain` holds the configuration of a run (loss, optimizer and its
/// hyperparameters, batch size, epochs, keep-best, reboost), an optional data
/// set and its own random generator for shuffling. It is cheap to clone:
/// data matrices are shared through `Arc`.
#[derive(Clone)]
pub struct NetTrain {
    config: TrainConfig,
    loss: Box<dyn Loss>,
    rng: StdRng,
    train_samples: Option<Arc<Array2<f32>>>,
    train_truth: Option<Arc<Array2<f32>>>,
    validation_samples: Option<Arc<Array2<f32>>>,
    validation_truth: Option<Arc<Array2<f32>>>,
    epoch_callback: Option<EpochCallback>,
    epoch: usize,
    current_loss: f32,
    current_accuracy: f32,
    current_validation_loss: Option<f32>,
    current_validation_accuracy: Option<f32>,
}

impl Default for NetTrain {
    fn default() -> Self {
        Self::new()
    }
}

impl NetTrain {
    pub fn new() -> Self {
        let config = TrainConfig::default();
        let rng = seeded(config.seed);
        NetTrain {
            loss: Box::new(crate::loss::MSE),
            config,
            rng,
            train_samples: None,
            train_truth: None,
            validation_samples: None,
            validation_truth: None,
            epoch_callback: None,
            epoch: 0,
            current_loss: 0.0,
            current_accuracy: 0.0,
            current_validation_loss: None,
            current_validation_accuracy: None,
        }
    }

    pub fn with_config(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let loss = create_loss(&config.loss)
            .ok_or_else(|| MetisError::unknown_name("loss", config.loss.as_str()))?;
        let mut train = NetTrain::new();
        train.rng = seeded(config.seed);
        train.loss = loss;
        train.config = config;
        Ok(train)
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn set_optimizer(&mut self, name: &str) -> Result<()> {
        if OptimizerWrapper::create(name).is_none() {
            return Err(MetisError::unknown_name("optimizer", name));
        }
        self.config.optimizer = name.to_string();
        Ok(())
    }

    pub fn optimizer(&self) -> &str {
        &self.config.optimizer
    }

    pub fn set_loss(&mut self, name: &str) -> Result<()> {
        self.loss = create_loss(name).ok_or_else(|| MetisError::unknown_name("loss", name))?;
        self.config.loss = name.to_string();
        Ok(())
    }

    pub fn loss(&self) -> &str {
        &self.config.loss
    }

    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(MetisError::invalid_parameter("batch_size", "must be at least 1"));
        }
        self.config.batch_size = batch_size;
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn set_epochs(&mut self, epochs: usize) {
        self.config.epochs = epochs;
    }

    pub fn epochs(&self) -> usize {
        self.config.epochs
    }

    pub fn set_keep_best(&mut self, keep_best: bool) {
        self.config.keep_best = keep_best;
    }

    pub fn keep_best(&self) -> bool {
        self.config.keep_best
    }

    /// Reset optimizer state every `epochs` epochs, `None` disables it
    pub fn set_reboost_every_epochs(&mut self, epochs: Option<usize>) -> Result<()> {
        if epochs == Some(0) {
            return Err(MetisError::invalid_parameter("reboost_every_epochs", "must be at least 1"));
        }
        self.config.reboost_every_epochs = epochs;
        Ok(())
    }

    pub fn reboost_every_epochs(&self) -> Option<usize> {
        self.config.reboost_every_epochs
    }

    pub fn set_learning_rate(&mut self, learning_rate: Option<f32>) {
        self.config.learning_rate = learning_rate;
    }

    pub fn learning_rate(&self) -> Option<f32> {
        self.config.learning_rate
    }

    pub fn set_decay(&mut self, decay: Option<f32>) {
        self.config.decay = decay;
    }

    pub fn decay(&self) -> Option<f32> {
        self.config.decay
    }

    pub fn set_momentum(&mut self, momentum: Option<f32>) {
        self.config.momentum = momentum;
    }

    pub fn momentum(&self) -> Option<f32> {
        self.config.momentum
    }

    pub fn set_problem(&mut self, problem: ProblemKind) {
        self.config.problem = problem;
    }

    pub fn problem(&self) -> ProblemKind {
        self.config.problem
    }

    /// Reseed the shuffling generator
    pub fn set_seed(&mut self, seed: u64) {
        self.config.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn seed(&self) -> Option<u64> {
        self.config.seed
    }

    pub fn set_epoch_callback<F>(&mut self, callback: F)
    where
        F: Fn(&NetTrain) + Send + Sync + 'static,
    {
        self.epoch_callback = Some(Arc::new(callback));
    }

    pub fn clear_epoch_callback(&mut self) {
        self.epoch_callback = None;
    }

    pub fn set_train_data(&mut self, samples: Array2<f32>, truth: Array2<f32>) {
        self.train_samples = Some(Arc::new(samples));
        self.train_truth = Some(Arc::new(truth));
    }

    pub fn set_validation_data(&mut self, samples: Array2<f32>, truth: Array2<f32>) {
        self.validation_samples = Some(Arc::new(samples));
        self.validation_truth = Some(Arc::new(truth));
    }

    pub fn has_train_data(&self) -> bool {
        self.train_samples.is_some()
    }

    /// Number of epochs completed by the current (or last) run
    pub fn current_epoch(&self) -> usize {
        self.epoch
    }

    /// Mean loss per sample of the last completed epoch
    pub fn current_loss(&self) -> f32 {
        self.current_loss
    }

    /// Accuracy in percent of the last completed epoch, 0 for regression
    pub fn current_accuracy(&self) -> f32 {
        self.current_accuracy
    }

    pub fn current_validation_loss(&self) -> Option<f32> {
        self.current_validation_loss
    }

    pub fn current_validation_accuracy(&self) -> Option<f32> {
        self.current_validation_accuracy
    }

    /// Textual (JSON) form of the configuration
    pub fn write(&self) -> Result<String> {
        self.config.to_json()
    }

    pub fn read(text: &str) -> Result<NetTrain> {
        NetTrain::with_config(TrainConfig::from_json(text)?)
    }

    /// Train on the data given with [`NetTrain::set_train_data`]
    pub fn train_on_data(&mut self, net: &mut Net) -> Result<TrainResult> {
        let (samples, truth) = match (&self.train_samples, &self.train_truth) {
            (Some(samples), Some(truth)) => (Arc::clone(samples), Arc::clone(truth)),
            _ => return Err(MetisError::Training("no training data set".to_string())),
        };
        self.train(net, samples.view(), truth.view())
    }

    /// Train `net` in place for the configured number of epochs.
    ///
    /// `truth` is either one row per sample of target values, a one-hot matrix
    /// or a single label column (expanded to one-hot when the net has several
    /// outputs). An empty net or an empty sample set returns an empty result.
    pub fn train(
        &mut self,
        net: &mut Net,
        samples: ArrayView2<f32>,
        truth: ArrayView2<f32>,
    ) -> Result<TrainResult> {
        self.epoch = 0;
        if net.is_empty() || samples.nrows() == 0 {
            return Ok(TrainResult::default());
        }

        let output_size = net.output_size();
        let classification = self.is_classification(output_size, truth);
        let data = self.prepare(net, samples, truth)?;
        let validation = match (&self.validation_samples, &self.validation_truth) {
            (Some(samples), Some(truth)) if samples.nrows() > 0 => {
                Some(self.prepare(net, samples.view(), truth.view())?)
            }
            _ => None,
        };

        let mut optimizers = self.bind_optimizers(net)?;
        let nb_samples = data.samples.nrows();
        let batch_size = self.config.batch_size.min(nb_samples).max(1);
        let mut result = TrainResult { classification, ..Default::default() };
        let mut best: Option<(Metric, Net)> = None;

        info!(
            "Training {} samples for {} epochs, batch size {}, optimizer {}, loss {}",
            nb_samples, self.config.epochs, batch_size, self.config.optimizer, self.config.loss
        );

        for epoch in 0..self.config.epochs {
            let permutation = rand_perm(nb_samples, &mut self.rng);
            let samples = apply_row_permutation(&permutation, data.samples.view());
            let truth = apply_row_permutation(&permutation, data.truth.view());

            net.set_train_mode(true);
            let mut loss_sum = 0.0;
            let mut correct = 0;
            for start in (0..nb_samples).step_by(batch_size) {
                let end = (start + batch_size).min(nb_samples);
                let batch_samples = samples.slice(s![start..end, ..]);
                let batch_truth = truth.slice(s![start..end, ..]);
                let output = self.train_batch(net, &mut optimizers, batch_samples, batch_truth);
                loss_sum += self.loss.compute(output.view(), batch_truth);
                if classification {
                    correct += count_correct(output.view(), batch_truth);
                }
            }
            net.set_train_mode(false);

            self.epoch = epoch + 1;
            self.current_loss = loss_sum / nb_samples as f32;
            self.current_accuracy = if classification {
                100.0 * correct as f32 / nb_samples as f32
            } else {
                0.0
            };
            result.loss.push(self.current_loss);
            if classification {
                result.accuracy.push(self.current_accuracy);
            }

            if let Some(validation) = &validation {
                let loss = self.loss_on(net, validation);
                result.validation_loss.push(loss);
                self.current_validation_loss = Some(loss);
                if classification {
                    let accuracy = accuracy_on(net, validation);
                    result.validation_accuracy.push(accuracy);
                    self.current_validation_accuracy = Some(accuracy);
                }
            }
            result.epochs = self.epoch;

            debug!(
                "Epoch {}: loss={:.6}, accuracy={:.2}, validation_loss={:?}",
                self.epoch, self.current_loss, self.current_accuracy, self.current_validation_loss
            );

            if let Some(callback) = self.epoch_callback.clone() {
                callback(self);
            }

            if self.config.keep_best {
                if let Some(metric) = result.epoch_metric(epoch) {
                    let improves = best
                        .as_ref()
                        .map_or(true, |(best_metric, _)| metric.improves_on(best_metric));
                    if improves {
                        debug!("Keeping net of epoch {} ({:?})", self.epoch, metric);
                        best = Some((metric, net.clone()));
                        result.best_epoch = Some(epoch);
                    }
                }
            }

            if let Some(every) = self.config.reboost_every_epochs {
                if every > 0 && self.epoch % every == 0 {
                    debug!("Reboosting optimizers at epoch {}", self.epoch);
                    optimizers.iter_mut().flatten().for_each(|o| o.init());
                }
            }
        }

        if let Some((metric, best_net)) = best {
            *net = best_net;
            info!(
                "Training done, kept epoch {:?} with {:?}",
                result.best_epoch.map(|e| e + 1),
                metric
            );
        } else {
            info!(
                "Training done after {} epochs, final loss {:?}",
                result.epochs,
                result.final_loss()
            );
        }
        Ok(result)
    }

    /// Mean loss per sample of `net` on the given data
    pub fn compute_loss(
        &self,
        net: &Net,
        samples: ArrayView2<f32>,
        truth: ArrayView2<f32>,
    ) -> Result<f32> {
        if samples.nrows() == 0 {
            return Ok(0.0);
        }
        let data = self.prepare(net, samples, truth)?;
        Ok(self.loss_on(net, &data))
    }

    /// Accuracy of `net` in percent on the given data
    pub fn compute_accuracy(
        &self,
        net: &Net,
        samples: ArrayView2<f32>,
        truth: ArrayView2<f32>,
    ) -> Result<f32> {
        if samples.nrows() == 0 {
            return Ok(0.0);
        }
        let data = self.prepare(net, samples, truth)?;
        Ok(accuracy_on(net, &data))
    }

    fn is_classification(&self, output_size: usize, truth: ArrayView2<f32>) -> bool {
        match self.config.problem {
            ProblemKind::Classification => true,
            ProblemKind::Regression => false,
            ProblemKind::Auto => output_size > 1 && (is_label_column(truth) || is_one_hot(truth)),
        }
    }

    /// Check shapes and expand a label column to one-hot when the net has several outputs
    fn prepare(
        &self,
        net: &Net,
        samples: ArrayView2<f32>,
        truth: ArrayView2<f32>,
    ) -> Result<Prepared> {
        if truth.nrows() != samples.nrows() {
            return Err(MetisError::dimension_mismatch(
                format!("{} truth rows", samples.nrows()),
                format!("{}", truth.nrows()),
            ));
        }
        let input_size = net.input_size();
        if input_size != 0 && samples.ncols() != input_size {
            return Err(MetisError::dimension_mismatch(
                format!("samples of width {}", input_size),
                format!("{}", samples.ncols()),
            ));
        }
        let output_size = net.output_size();
        let truth = if output_size > 1 && truth.ncols() == 1 {
            labels_to_one_hot(truth, output_size)
        } else {
            truth.to_owned()
        };
        if output_size != 0 && truth.ncols() != output_size {
            return Err(MetisError::dimension_mismatch(
                format!("truth of width {}", output_size),
                format!("{}", truth.ncols()),
            ));
        }
        Ok(Prepared { samples: samples.to_owned(), truth })
    }

    fn make_optimizer(&self) -> Result<OptimizerWrapper> {
        let mut optimizer = OptimizerWrapper::create(&self.config.optimizer)
            .ok_or_else(|| MetisError::unknown_name("optimizer", self.config.optimizer.as_str()))?;
        optimizer.set_params(self.config.learning_rate, self.config.decay, self.config.momentum);
        Ok(optimizer)
    }

    /// One optimizer per learnable tensor, indexed like the net's layers
    fn bind_optimizers(&self, net: &Net) -> Result<Vec<Option<ParamOptimizers>>> {
        net.layers()
            .iter()
            .map(|layer| {
                if !layer.has_weight() && !layer.has_bias() {
                    return Ok(None);
                }
                let weights = if layer.has_weight() { Some(self.make_optimizer()?) } else { None };
                let bias = if layer.has_bias() { Some(self.make_optimizer()?) } else { None };
                Ok(Some(ParamOptimizers { weights, bias }))
            })
            .collect()
    }

    /// Forward, backward and per-layer optimizer step on one batch. Returns the batch output.
    fn train_batch(
        &self,
        net: &mut Net,
        optimizers: &mut [Option<ParamOptimizers>],
        samples: ArrayView2<f32>,
        truth: ArrayView2<f32>,
    ) -> Array2<f32> {
        net.zero_gradients();
        let mut trace = net.forward_trace(samples);
        let output = trace.pop().unwrap_or_else(|| samples.to_owned());
        let scale = 1.0 / samples.nrows() as f32;

        let mut gradient = self.loss.gradient(output.view(), truth);
        for (index, layer) in net.layers_mut().iter_mut().enumerate().rev() {
            gradient = layer.backpropagation(trace[index].view(), gradient.view());
            if let Some(Some(optimizer)) = optimizers.get_mut(index) {
                optimizer.step(layer, scale);
            }
        }
        output
    }

    fn loss_on(&self, net: &Net, data: &Prepared) -> f32 {
        let output = net.forward(data.samples.view());
        self.loss.compute(output.view(), data.truth.view()) / data.samples.nrows().max(1) as f32
    }
}

impl fmt::Debug for NetTrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetTrain")
            .field("config", &self.config)
            .field("has_train_data", &self.train_samples.is_some())
            .field("has_validation_data", &self.validation_samples.is_some())
            .field("epoch", &self.epoch)
            .field("current_loss", &self.current_loss)
            .finish()
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn accuracy_on(net: &Net, data: &Prepared) -> f32 {
    let output = net.forward(data.samples.view());
    let correct = count_correct(output.view(), data.truth.view());
    100.0 * correct as f32 / data.samples.nrows().max(1) as f32
}

/// Number of rows where the predicted class matches the truth.
///
/// A single output is rounded and compared as is to the truth value, so a
/// negative prediction never matches label 0. Wider outputs compare argmax
/// against argmax (one-hot truth) or against the label (label column truth).
pub(crate) fn count_correct(predicted: ArrayView2<f32>, truth: ArrayView2<f32>) -> usize {
    predicted
        .rows()
        .into_iter()
        .zip(truth.rows())
        .filter(|(p, t)| match (p.len(), t.len()) {
            (1, _) => p[0].round() == t[0],
            (_, 1) => argmax(p.view()) as f32 == t[0],
            _ => argmax(p.view()) == argmax(t.view()),
        })
        .count()
}
