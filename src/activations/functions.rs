use ndarray::{Array2, ArrayView2};
use serde::{Serialize, Deserialize};

const SELU_LAMBDA: f32 = 1.050_701;
const SELU_ALPHA: f32 = 1.673_263_2;
// sqrt(2 / pi)
const GELU_SCALE: f32 = 0.797_884_6;
const GELU_CUBIC: f32 = 0.044_715;

/// An enumeration of the element-wise nonlinearities available to activation
/// and gated-activation layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    Linear,
    #[default]
    Relu,
    LeakyRelu { alpha: f32 },
    Elu { alpha: f32 },
    Selu,
    Sigmoid,
    Tanh,
    Softplus,
    Softsign,
    Swish,
    Mish,
    Gelu,
    Gauss,
    Absolute,
    HardTanh,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softplus(x: f32) -> f32 {
    // ln(1 + e^x) without overflowing for large x
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

// tanh approximation of x * Phi(x)
fn gelu(x: f32) -> f32 {
    let t = (GELU_SCALE * (x + GELU_CUBIC * x * x * x)).tanh();
    0.5 * x * (1.0 + t)
}

fn gelu_derivative(x: f32) -> f32 {
    let t = (GELU_SCALE * (x + GELU_CUBIC * x * x * x)).tanh();
    let inner = GELU_SCALE * (1.0 + 3.0 * GELU_CUBIC * x * x);
    0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * inner
}

impl Activation {
    /// Names accepted by [`Activation::from_name`], in registry order.
    pub const NAMES: [&'static str; 15] = [
        "Linear", "Relu", "LeakyRelu", "Elu", "Selu", "Sigmoid", "Tanh", "Softplus",
        "Softsign", "Swish", "Mish", "Gelu", "Gauss", "Absolute", "HardTanh",
    ];

    /// Look up an activation by name. Parameterised variants get their usual defaults.
    pub fn from_name(name: &str) -> Option<Activation> {
        let activation = match name {
            "Linear" | "Identity" => Activation::Linear,
            "Relu" => Activation::Relu,
            "LeakyRelu" => Activation::LeakyRelu { alpha: 0.01 },
            "Elu" => Activation::Elu { alpha: 1.0 },
            "Selu" => Activation::Selu,
            "Sigmoid" | "Logistic" => Activation::Sigmoid,
            "Tanh" => Activation::Tanh,
            "Softplus" => Activation::Softplus,
            "Softsign" => Activation::Softsign,
            "Swish" | "SiLU" => Activation::Swish,
            "Mish" => Activation::Mish,
            "Gelu" => Activation::Gelu,
            "Gauss" => Activation::Gauss,
            "Absolute" => Activation::Absolute,
            "HardTanh" => Activation::HardTanh,
            _ => return None,
        };
        Some(activation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Linear => "Linear",
            Activation::Relu => "Relu",
            Activation::LeakyRelu { .. } => "LeakyRelu",
            Activation::Elu { .. } => "Elu",
            Activation::Selu => "Selu",
            Activation::Sigmoid => "Sigmoid",
            Activation::Tanh => "Tanh",
            Activation::Softplus => "Softplus",
            Activation::Softsign => "Softsign",
            Activation::Swish => "Swish",
            Activation::Mish => "Mish",
            Activation::Gelu => "Gelu",
            Activation::Gauss => "Gauss",
            Activation::Absolute => "Absolute",
            Activation::HardTanh => "HardTanh",
        }
    }

    /// Apply the activation function to a single value.
    pub fn apply(&self, x: f32) -> f32 {
        match *self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu { alpha } => if x > 0.0 { x } else { alpha * x },
            Activation::Elu { alpha } => if x > 0.0 { x } else { alpha * (x.exp() - 1.0) },
            Activation::Selu => {
                if x > 0.0 { SELU_LAMBDA * x } else { SELU_LAMBDA * SELU_ALPHA * (x.exp() - 1.0) }
            }
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Softplus => softplus(x),
            Activation::Softsign => x / (1.0 + x.abs()),
            Activation::Swish => x * sigmoid(x),
            Activation::Mish => x * softplus(x).tanh(),
            Activation::Gelu => gelu(x),
            Activation::Gauss => (-x * x).exp(),
            Activation::Absolute => x.abs(),
            Activation::HardTanh => x.clamp(-1.0, 1.0),
        }
    }

    /// Derivative of the activation, evaluated at the pre-activation value `x`.
    pub fn derivative(&self, x: f32) -> f32 {
        match *self {
            Activation::Linear => 1.0,
            Activation::Relu => if x > 0.0 { 1.0 } else { 0.0 },
            Activation::LeakyRelu { alpha } => if x > 0.0 { 1.0 } else { alpha },
            Activation::Elu { alpha } => if x > 0.0 { 1.0 } else { alpha * x.exp() },
            Activation::Selu => {
                if x > 0.0 { SELU_LAMBDA } else { SELU_LAMBDA * SELU_ALPHA * x.exp() }
            }
            Activation::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activation::Softplus => sigmoid(x),
            Activation::Softsign => {
                let d = 1.0 + x.abs();
                1.0 / (d * d)
            }
            Activation::Swish => {
                let s = sigmoid(x);
                s + x * s * (1.0 - s)
            }
            Activation::Mish => {
                let t = softplus(x).tanh();
                t + x * (1.0 - t * t) * sigmoid(x)
            }
            Activation::Gelu => gelu_derivative(x),
            Activation::Gauss => -2.0 * x * (-x * x).exp(),
            Activation::Absolute => {
                if x > 0.0 { 1.0 } else if x < 0.0 { -1.0 } else { 0.0 }
            }
            Activation::HardTanh => if (-1.0..=1.0).contains(&x) { 1.0 } else { 0.0 },
        }
    }

    /// Apply the activation function to a batch of inputs in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        if *self == Activation::Linear {
            return;
        }
        inputs.mapv_inplace(|v| self.apply(v));
    }

    /// Compute the derivative of the activation function for a batch of pre-activation inputs.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.mapv(|v| self.derivative(v))
    }
}

/// Names of every activation known to [`Activation::from_name`].
pub fn list_activation_available() -> Vec<&'static str> {
    Activation::NAMES.to_vec()
}
