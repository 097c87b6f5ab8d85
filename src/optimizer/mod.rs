//! Per-tensor parameter update rules.
//!
//! One optimizer instance is bound to exactly one weight (or bias) tensor for
//! the duration of a training run. Its state buffers are created lazily in
//! the shape of that tensor on the first step and dropped again by
//! [`Optimizer::init`], which is also how periodic reboosting resets them.

pub mod adaptive;
pub mod sgd;

use ndarray::Array2;
use serde::{Serialize, Deserialize};

pub use adaptive::{Adagrad, Adam, Nadam, RMSProp};
pub use sgd::{Momentum, Nesterov, SGD};

/// Name of the optimizer used when none is configured
pub const DEFAULT_OPTIMIZER: &str = "Adam";

pub trait Optimizer {
    fn name(&self) -> &'static str;

    /// Update `weights` in place from an already batch-averaged gradient
    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>);

    /// Reset internal state (moments, step counter) to its initial condition
    fn init(&mut self);

    /// Override hyperparameters; `None` keeps the optimizer's own default.
    ///
    /// `momentum` is the momentum coefficient for Momentum/Nesterov, `rho` for
    /// RMSProp and `beta1` for Adam/Nadam. It is ignored by SGD and Adagrad.
    fn set_params(&mut self, learning_rate: Option<f32>, decay: Option<f32>, momentum: Option<f32>);
}

/// Learning rate after inverse-time decay
pub(crate) fn decayed(learning_rate: f32, decay: f32, step: u64) -> f32 {
    learning_rate / (1.0 + decay * step as f32)
}

/// State buffer shaped like `like`, created (or recreated) on demand
pub(crate) fn state_like<'a>(
    slot: &'a mut Option<Array2<f32>>,
    like: &Array2<f32>,
) -> &'a mut Array2<f32> {
    if slot.as_ref().map_or(true, |s| s.dim() != like.dim()) {
        *slot = Some(Array2::zeros(like.dim()));
    }
    slot.get_or_insert_with(|| Array2::zeros(like.dim()))
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Momentum(Momentum),
    Nesterov(Nesterov),
    Adagrad(Adagrad),
    RMSProp(RMSProp),
    Adam(Adam),
    Nadam(Nadam),
}

const OPTIMIZER_NAMES: [&str; 7] =
    ["SGD", "Momentum", "Nesterov", "Adagrad", "RMSProp", "Adam", "Nadam"];

impl OptimizerWrapper {
    /// Build an optimizer with its default hyperparameters. Returns `None` for unknown names.
    pub fn create(name: &str) -> Option<Self> {
        let optimizer = match name {
            "SGD" => OptimizerWrapper::SGD(SGD::new()),
            "Momentum" => OptimizerWrapper::Momentum(Momentum::new()),
            "Nesterov" => OptimizerWrapper::Nesterov(Nesterov::new()),
            "Adagrad" => OptimizerWrapper::Adagrad(Adagrad::new()),
            "RMSProp" => OptimizerWrapper::RMSProp(RMSProp::new()),
            "Adam" => OptimizerWrapper::Adam(Adam::new()),
            "Nadam" => OptimizerWrapper::Nadam(Nadam::new()),
            _ => return None,
        };
        Some(optimizer)
    }

    fn inner(&self) -> &dyn Optimizer {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer,
            OptimizerWrapper::Momentum(optimizer) => optimizer,
            OptimizerWrapper::Nesterov(optimizer) => optimizer,
            OptimizerWrapper::Adagrad(optimizer) => optimizer,
            OptimizerWrapper::RMSProp(optimizer) => optimizer,
            OptimizerWrapper::Adam(optimizer) => optimizer,
            OptimizerWrapper::Nadam(optimizer) => optimizer,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Optimizer {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer,
            OptimizerWrapper::Momentum(optimizer) => optimizer,
            OptimizerWrapper::Nesterov(optimizer) => optimizer,
            OptimizerWrapper::Adagrad(optimizer) => optimizer,
            OptimizerWrapper::RMSProp(optimizer) => optimizer,
            OptimizerWrapper::Adam(optimizer) => optimizer,
            OptimizerWrapper::Nadam(optimizer) => optimizer,
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        self.inner_mut().optimize(weights, gradient)
    }

    fn init(&mut self) {
        self.inner_mut().init()
    }

    fn set_params(
        &mut self,
        learning_rate: Option<f32>,
        decay: Option<f32>,
        momentum: Option<f32>,
    ) {
        self.inner_mut().set_params(learning_rate, decay, momentum)
    }
}

/// Names accepted by [`OptimizerWrapper::create`]
pub fn list_optimizer_available() -> Vec<&'static str> {
    OPTIMIZER_NAMES.to_vec()
}
