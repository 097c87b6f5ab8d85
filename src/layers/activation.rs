use ndarray::{Array2, ArrayView2};

use crate::activations::Activation;
use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Element-wise nonlinearity. Shape preserving; `size` 0 accepts any width.
#[derive(Clone, Debug)]
pub struct ActivationLayer {
    pub activation: Activation,
    size: usize,
}

impl ActivationLayer {
    pub fn new(activation: Activation) -> Self {
        ActivationLayer { activation, size: 0 }
    }

    pub fn with_size(activation: Activation, size: usize) -> Self {
        ActivationLayer { activation, size }
    }
}

impl Layer for ActivationLayer {
    fn type_name(&self) -> &'static str {
        self.activation.name()
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let mut output = input.to_owned();
        self.activation.apply_batch(&mut output);
        output
    }

    fn backpropagation(
        &mut self,
        input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        self.activation.derivative_batch(input) * &gradient_out
    }

    fn activation_mut(&mut self) -> Option<&mut Activation> {
        Some(&mut self.activation)
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Activation {
            activation: self.activation,
            size: self.size,
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
