use ndarray::{Array2, ArrayView2, Zip};

/// Floor used to keep logarithms and divisions finite
pub const EPSILON: f32 = 1e-7;

/// Trait defining the interface for loss functions.
///
/// `compute` returns the SUM over samples (rows) of the per-sample loss so
/// that a training epoch can add batch results and divide by the sample count.
/// `gradient` is the per-sample gradient w.r.t. the predictions; it is not
/// divided by the batch size.
pub trait Loss: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sum over rows of the per-sample loss
    fn compute(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> f32;

    /// Gradient of the loss with respect to the predictions
    fn gradient(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32>;

    fn clone_box(&self) -> Box<dyn Loss>;
}

impl Clone for Box<dyn Loss> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn columns(m: &ArrayView2<f32>) -> f32 {
    m.ncols().max(1) as f32
}

/// Mean Squared Error loss, averaged over the output columns of each sample
#[derive(Clone, Copy, Debug, Default)]
pub struct MSE;

impl Loss for MSE {
    fn name(&self) -> &'static str {
        "MeanSquaredError"
    }

    fn compute(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> f32 {
        let diff = &predicted - &target;
        (&diff * &diff).sum() / columns(&predicted)
    }

    fn gradient(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        (&predicted - &target) * (2.0 / columns(&predicted))
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(*self)
    }
}

/// Mean Absolute Error loss
#[derive(Clone, Copy, Debug, Default)]
pub struct MAE;

impl Loss for MAE {
    fn name(&self) -> &'static str {
        "MeanAbsoluteError"
    }

    fn compute(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> f32 {
        (&predicted - &target).mapv(f32::abs).sum() / columns(&predicted)
    }

    fn gradient(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        let cols = columns(&predicted);
        (&predicted - &target).mapv(|d| {
            if d > 0.0 { 1.0 / cols } else if d < 0.0 { -1.0 / cols } else { 0.0 }
        })
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(*self)
    }
}

/// Huber loss (smooth L1)
#[derive(Clone, Copy, Debug)]
pub struct HuberLoss {
    pub delta: f32,
}

impl HuberLoss {
    pub fn new(delta: f32) -> Self {
        HuberLoss { delta }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Loss for HuberLoss {
    fn name(&self) -> &'static str {
        "Huber"
    }

    fn compute(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> f32 {
        let delta = self.delta;
        (&predicted - &target).mapv(|x| {
            let abs_x = x.abs();
            if abs_x <= delta {
                0.5 * x * x
            } else {
                delta * abs_x - 0.5 * delta * delta
            }
        }).sum() / columns(&predicted)
    }

    fn gradient(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        let delta = self.delta;
        let cols = columns(&predicted);
        (&predicted - &target).mapv(|x| {
            if x.abs() <= delta { x / cols } else { delta * x.signum() / cols }
        })
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(*self)
    }
}

/// Categorical cross-entropy, expects probabilities (e.g. after a softmax layer)
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossEntropyLoss;

impl Loss for CrossEntropyLoss {
    fn name(&self) -> &'static str {
        "CrossEntropy"
    }

    fn compute(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> f32 {
        let mut total = 0.0;
        Zip::from(&predicted).and(&target).for_each(|&p, &t| {
            total -= t * p.max(EPSILON).ln();
        });
        total
    }

    fn gradient(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        Zip::from(&predicted)
            .and(&target)
            .map_collect(|&p, &t| -t / p.max(EPSILON))
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(*self)
    }
}

/// Binary cross-entropy, averaged over the output columns of each sample
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryCrossEntropyLoss;

impl Loss for BinaryCrossEntropyLoss {
    fn name(&self) -> &'static str {
        "BinaryCrossEntropy"
    }

    fn compute(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> f32 {
        let mut total = 0.0;
        Zip::from(&predicted).and(&target).for_each(|&p, &y| {
            let p = p.clamp(EPSILON, 1.0 - EPSILON);
            total -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();
        });
        total / columns(&predicted)
    }

    fn gradient(&self, predicted: ArrayView2<f32>, target: ArrayView2<f32>) -> Array2<f32> {
        let cols = columns(&predicted);
        Zip::from(&predicted).and(&target).map_collect(|&p, &y| {
            let p = p.clamp(EPSILON, 1.0 - EPSILON);
            -(y / p - (1.0 - y) / (1.0 - p)) / cols
        })
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(*self)
    }
}
