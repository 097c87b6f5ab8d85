use serde::{Serialize, Deserialize};

/// Score of a training run
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    /// Percent of correctly classified samples, higher is better
    Accuracy(f32),
    /// Mean loss per sample, lower is better
    Loss(f32),
}

impl Metric {
    pub fn value(&self) -> f32 {
        match self {
            Metric::Accuracy(v) | Metric::Loss(v) => *v,
        }
    }

    /// Strict improvement. Metrics of different kinds never improve on each other.
    /// Any finite value improves on NaN.
    pub fn improves_on(&self, other: &Metric) -> bool {
        match (self, other) {
            (Metric::Accuracy(a), Metric::Accuracy(b)) => a > b || (b.is_nan() && !a.is_nan()),
            (Metric::Loss(a), Metric::Loss(b)) => a < b || (b.is_nan() && !a.is_nan()),
            _ => false,
        }
    }
}

/// Per-epoch history of one training run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainResult {
    pub loss: Vec<f32>,
    /// Empty for regression problems
    pub accuracy: Vec<f32>,
    /// Empty when no validation data was given
    pub validation_loss: Vec<f32>,
    pub validation_accuracy: Vec<f32>,
    pub epochs: usize,
    /// Epoch (0-based) whose net was kept, when keep-best is enabled
    pub best_epoch: Option<usize>,
    pub classification: bool,
}

impl TrainResult {
    pub fn is_empty(&self) -> bool {
        self.epochs == 0
    }

    /// Metric scored at `epoch`, on validation data when available
    pub fn epoch_metric(&self, epoch: usize) -> Option<Metric> {
        if self.classification {
            let series = if self.validation_accuracy.is_empty() {
                &self.accuracy
            } else {
                &self.validation_accuracy
            };
            series.get(epoch).copied().map(Metric::Accuracy)
        } else {
            let series = if self.validation_loss.is_empty() {
                &self.loss
            } else {
                &self.validation_loss
            };
            series.get(epoch).copied().map(Metric::Loss)
        }
    }

    /// Metric of the net returned by the run: the kept epoch, or the last one
    pub fn metric(&self) -> Option<Metric> {
        let epoch = self.best_epoch.or_else(|| self.epochs.checked_sub(1))?;
        self.epoch_metric(epoch)
    }

    pub fn final_loss(&self) -> Option<f32> {
        self.loss.last().copied()
    }
}
