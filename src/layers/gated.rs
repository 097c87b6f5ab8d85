use ndarray::{concatenate, s, Array2, ArrayView2, Axis};

use crate::activations::Activation;
use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Gated linear unit family.
///
/// The input of width `2 * n` is split into a value half `a` (first `n`
/// columns) and a gate half `b` (last `n` columns); the output is
/// `a ⊙ gate(b)`. GLU gates with a sigmoid, SwiGLU with swish, ReGLU with
/// relu and GEGLU with gelu.
#[derive(Clone, Debug)]
pub struct GatedActivationLayer {
    pub gate: Activation,
    output_size: usize,
}

impl GatedActivationLayer {
    pub fn new(gate: Activation, output_size: usize) -> Self {
        GatedActivationLayer { gate, output_size }
    }

    pub fn glu(output_size: usize) -> Self {
        Self::new(Activation::Sigmoid, output_size)
    }

    pub fn swiglu(output_size: usize) -> Self {
        Self::new(Activation::Swish, output_size)
    }

    pub fn reglu(output_size: usize) -> Self {
        Self::new(Activation::Relu, output_size)
    }

    pub fn geglu(output_size: usize) -> Self {
        Self::new(Activation::Gelu, output_size)
    }

    /// Gate activation registered under `name`, if it is a gated variant
    pub fn gate_for_name(name: &str) -> Option<Activation> {
        match name {
            "GLU" => Some(Activation::Sigmoid),
            "SwiGLU" => Some(Activation::Swish),
            "ReGLU" => Some(Activation::Relu),
            "GEGLU" => Some(Activation::Gelu),
            _ => None,
        }
    }
}

impl Layer for GatedActivationLayer {
    fn type_name(&self) -> &'static str {
        match self.gate {
            Activation::Sigmoid => "GLU",
            Activation::Swish => "SwiGLU",
            Activation::Relu => "ReGLU",
            Activation::Gelu => "GEGLU",
            _ => "GatedActivation",
        }
    }

    fn input_size(&self) -> usize {
        2 * self.output_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let n = self.output_size;
        assert_eq!(input.ncols(), 2 * n, "Gated activation expects {} input columns", 2 * n);

        let mut gate = input.slice(s![.., n..]).to_owned();
        self.gate.apply_batch(&mut gate);
        gate * &input.slice(s![.., ..n])
    }

    fn backpropagation(
        &mut self,
        input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        let n = self.output_size;
        let a = input.slice(s![.., ..n]);
        let b = input.slice(s![.., n..]);

        let mut gate = b.to_owned();
        self.gate.apply_batch(&mut gate);
        let gradient_a = gate * &gradient_out;
        let gradient_b = self.gate.derivative_batch(b) * &a * &gradient_out;

        // both halves have the same shape, so concatenation cannot fail
        concatenate(Axis(1), &[gradient_a.view(), gradient_b.view()])
            .unwrap_or_else(|_| Array2::zeros((input.nrows(), 2 * n)))
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::GatedActivation {
            gate: self.gate,
            output_size: self.output_size,
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
