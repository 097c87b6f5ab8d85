//! Optimizers with per-parameter adaptive step sizes.

use ndarray::{Array2, Zip};
use serde::{Serialize, Deserialize};

use super::{decayed, state_like, Optimizer};

pub const EPSILON: f32 = 1e-7;

/// Adagrad: accumulates squared gradients
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adagrad {
    pub learning_rate: f32,
    pub decay: f32,
    pub epsilon: f32,
    step: u64,
    accumulator: Option<Array2<f32>>,
}

impl Adagrad {
    pub fn new() -> Adagrad {
        Adagrad { learning_rate: 0.01, decay: 0.0, epsilon: EPSILON, step: 0, accumulator: None }
    }
}

impl Default for Adagrad {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for Adagrad {
    fn name(&self) -> &'static str {
        "Adagrad"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.step);
        let eps = self.epsilon;
        let accumulator = state_like(&mut self.accumulator, weights);
        Zip::from(weights)
            .and(accumulator)
            .and(gradient)
            .for_each(|w, acc, &g| {
                *acc += g * g;
                *w -= lr * g / (acc.sqrt() + eps);
            });
        self.step += 1;
    }

    fn init(&mut self) {
        self.step = 0;
        self.accumulator = None;
    }

    fn set_params(
        &mut self,
        learning_rate: Option<f32>,
        decay: Option<f32>,
        _momentum: Option<f32>,
    ) {
        if let Some(lr) = learning_rate {
            self.learning_rate = lr;
        }
        if let Some(decay) = decay {
            self.decay = decay;
        }
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RMSProp {
    pub learning_rate: f32,
    pub decay: f32,
    pub rho: f32,
    pub epsilon: f32,
    step: u64,
    mean_square: Option<Array2<f32>>,
}

impl RMSProp {
    pub fn new() -> RMSProp {
        RMSProp {
            learning_rate: 0.001,
            decay: 0.0,
            rho: 0.9,
            epsilon: EPSILON,
            step: 0,
            mean_square: None,
        }
    }
}

impl Default for RMSProp {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for RMSProp {
    fn name(&self) -> &'static str {
        "RMSProp"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.step);
        let (rho, eps) = (self.rho, self.epsilon);
        let mean_square = state_like(&mut self.mean_square, weights);
        Zip::from(weights)
            .and(mean_square)
            .and(gradient)
            .for_each(|w, ms, &g| {
                *ms = rho * *ms + (1.0 - rho) * g * g;
                *w -= lr * g / (ms.sqrt() + eps);
            });
        self.step += 1;
    }

    fn init(&mut self) {
        self.step = 0;
        self.mean_square = None;
    }

    fn set_params(
        &mut self,
        learning_rate: Option<f32>,
        decay: Option<f32>,
        momentum: Option<f32>,
    ) {
        if let Some(lr) = learning_rate {
            self.learning_rate = lr;
        }
        if let Some(decay) = decay {
            self.decay = decay;
        }
        if let Some(rho) = momentum {
            self.rho = rho;
        }
    }
}

/// First and second moment estimates shared by Adam and Nadam
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
struct Moments {
    m: Option<Array2<f32>>,
    v: Option<Array2<f32>>,
}

impl Moments {
    fn clear(&mut self) {
        self.m = None;
        self.v = None;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub decay: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    t: u64,
    moments: Moments,
}

impl Adam {
    pub fn new() -> Adam {
        Adam {
            learning_rate: 0.001,
            decay: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: EPSILON,
            t: 0,
            moments: Moments::default(),
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &'static str {
        "Adam"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.t);
        self.t += 1;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let correction1 = 1.0 - b1.powi(self.t as i32);
        let correction2 = 1.0 - b2.powi(self.t as i32);

        let m = state_like(&mut self.moments.m, weights);
        let v = state_like(&mut self.moments.v, weights);
        Zip::from(weights)
            .and(m)
            .and(v)
            .and(gradient)
            .for_each(|w, m, v, &g| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                *w -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }

    fn init(&mut self) {
        self.t = 0;
        self.moments.clear();
    }

    fn set_params(
        &mut self,
        learning_rate: Option<f32>,
        decay: Option<f32>,
        momentum: Option<f32>,
    ) {
        if let Some(lr) = learning_rate {
            self.learning_rate = lr;
        }
        if let Some(decay) = decay {
            self.decay = decay;
        }
        if let Some(beta1) = momentum {
            self.beta1 = beta1;
        }
    }
}

/// Adam with Nesterov momentum
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Nadam {
    pub learning_rate: f32,
    pub decay: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    t: u64,
    moments: Moments,
}

impl Nadam {
    pub fn new() -> Nadam {
        Nadam {
            learning_rate: 0.002,
            decay: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: EPSILON,
            t: 0,
            moments: Moments::default(),
        }
    }
}

impl Default for Nadam {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for Nadam {
    fn name(&self) -> &'static str {
        "Nadam"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.t);
        self.t += 1;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let correction1 = 1.0 - b1.powi(self.t as i32);
        let correction1_next = 1.0 - b1.powi(self.t as i32 + 1);
        let correction2 = 1.0 - b2.powi(self.t as i32);

        let m = state_like(&mut self.moments.m, weights);
        let v = state_like(&mut self.moments.v, weights);
        Zip::from(weights)
            .and(m)
            .and(v)
            .and(gradient)
            .for_each(|w, m, v, &g| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                let m_hat = b1 * *m / correction1_next + (1.0 - b1) * g / correction1;
                let v_hat = *v / correction2;
                *w -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }

    fn init(&mut self) {
        self.t = 0;
        self.moments.clear();
    }

    fn set_params(
        &mut self,
        learning_rate: Option<f32>,
        decay: Option<f32>,
        momentum: Option<f32>,
    ) {
        if let Some(lr) = learning_rate {
            self.learning_rate = lr;
        }
        if let Some(decay) = decay {
            self.decay = decay;
        }
        if let Some(beta1) = momentum {
            self.beta1 = beta1;
        }
    }
}
