use ndarray::Array2;
use serde::{Serialize, Deserialize};

use super::{decayed, state_like, Optimizer};

/// Plain stochastic gradient descent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD {
    pub learning_rate: f32,
    pub decay: f32,
    step: u64,
}

impl SGD {
    pub fn new() -> SGD {
        SGD { learning_rate: 0.01, decay: 0.0, step: 0 }
    }
}

impl Default for SGD {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for SGD {
    fn name(&self) -> &'static str {
        "SGD"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.step);
        weights.zip_mut_with(gradient, |w, &g| *w -= lr * g);
        self.step += 1;
    }

    fn init(&mut self) {
        self.step = 0;
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

/// SGD with classical momentum: `v = m*v - lr*g; w += v`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Momentum {
    pub learning_rate: f32,
    pub decay: f32,
    pub momentum: f32,
    step: u64,
    velocity: Option<Array2<f32>>,
}

impl Momentum {
    pub fn new() -> Momentum {
        Momentum { learning_rate: 0.01, decay: 0.0, momentum: 0.9, step: 0, velocity: None }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for Momentum {
    fn name(&self) -> &'static str {
        "Momentum"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.step);
        let m = self.momentum;
        let velocity = state_like(&mut self.velocity, weights);
        velocity.zip_mut_with(gradient, |v, &g| *v = m * *v - lr * g);
        *weights += &*velocity;
        self.step += 1;
    }

    fn init(&mut self) {
        self.step = 0;
        self.velocity = None;
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
        if let Some(momentum) = momentum {
            self.momentum = momentum;
        }
    }
}

/// Nesterov accelerated gradient, in the look-ahead reformulation
/// `w += -m*v_prev + (1+m)*v`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Nesterov {
    pub learning_rate: f32,
    pub decay: f32,
    pub momentum: f32,
    step: u64,
    velocity: Option<Array2<f32>>,
}

impl Nesterov {
    pub fn new() -> Nesterov {
        Nesterov { learning_rate: 0.01, decay: 0.0, momentum: 0.9, step: 0, velocity: None }
    }
}

impl Default for Nesterov {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for Nesterov {
    fn name(&self) -> &'static str {
        "Nesterov"
    }

    fn optimize(&mut self, weights: &mut Array2<f32>, gradient: &Array2<f32>) {
        let lr = decayed(self.learning_rate, self.decay, self.step);
        let m = self.momentum;
        let velocity = state_like(&mut self.velocity, weights);
        let previous = velocity.clone();
        velocity.zip_mut_with(gradient, |v, &g| *v = m * *v - lr * g);
        ndarray::Zip::from(weights)
            .and(&previous)
            .and(&*velocity)
            .for_each(|w, &vp, &v| *w += -m * vp + (1.0 + m) * v);
        self.step += 1;
    }

    fn init(&mut self) {
        self.step = 0;
        self.velocity = None;
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
        if let Some(momentum) = momentum {
            self.momentum = momentum;
        }
    }
}
