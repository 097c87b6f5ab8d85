use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{MetisError, Result};
use crate::loss::{create_loss, DEFAULT_LOSS};
use crate::optimizer::{OptimizerWrapper, DEFAULT_OPTIMIZER};

/// How predictions are scored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemKind {
    /// Classification when the net has several outputs and the truth is a
    /// label column or one-hot, regression otherwise. A single output is never
    /// guessed to be a classifier, even on 0/1 truth: set `Classification` to
    /// score it by rounding the output against the truth value.
    #[default]
    Auto,
    Classification,
    Regression,
}

/// Hyperparameters of a training run.
///
/// Missing fields take their default when deserialized, so a partial JSON
/// document such as `{"epochs": 10}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub optimizer: String,
    pub loss: String,
    pub batch_size: usize,
    pub epochs: usize,
    pub keep_best: bool,
    /// Reset optimizer state every N epochs
    pub reboost_every_epochs: Option<usize>,
    /// `None` keeps the optimizer's own default
    pub learning_rate: Option<f32>,
    pub decay: Option<f32>,
    pub momentum: Option<f32>,
    pub problem: ProblemKind,
    /// Seed of the shuffling generator; entropy when absent
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            optimizer: DEFAULT_OPTIMIZER.to_string(),
            loss: DEFAULT_LOSS.to_string(),
            batch_size: 16,
            epochs: 100,
            keep_best: true,
            reboost_every_epochs: None,
            learning_rate: None,
            decay: None,
            momentum: None,
            problem: ProblemKind::Auto,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: TrainConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check names and numeric ranges
    pub fn validate(&self) -> Result<()> {
        if OptimizerWrapper::create(&self.optimizer).is_none() {
            return Err(MetisError::unknown_name("optimizer", self.optimizer.as_str()));
        }
        if create_loss(&self.loss).is_none() {
            return Err(MetisError::unknown_name("loss", self.loss.as_str()));
        }
        if self.batch_size == 0 {
            return Err(MetisError::invalid_parameter("batch_size", "must be at least 1"));
        }
        if self.reboost_every_epochs == Some(0) {
            return Err(MetisError::invalid_parameter("reboost_every_epochs", "must be at least 1"));
        }
        if let Some(lr) = self.learning_rate {
            if !(lr > 0.0 && lr.is_finite()) {
                return Err(MetisError::invalid_parameter(
                    "learning_rate",
                    "must be finite and > 0",
                ));
            }
        }
        Ok(())
    }
}
