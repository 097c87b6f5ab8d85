use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use crate::activations::Activation;
use super::snapshot::LayerSnapshot;

/// Trait defining the interface for neural network layers.
///
/// A layer maps a `(samples, input_size)` matrix to a `(samples, output_size)`
/// matrix. `forward` never touches learnable tensors; `backpropagation` must be
/// given the same input that produced the output being differentiated and
/// accumulates (sums) into the layer's gradient buffers until
/// [`Layer::zero_gradients`] is called.
pub trait Layer: Send + Sync {
    /// Registry name of the layer type
    fn type_name(&self) -> &'static str;

    /// Number of input columns, 0 when the layer accepts any width
    fn input_size(&self) -> usize;

    /// Number of output columns, 0 when the layer keeps the input width
    fn output_size(&self) -> usize;

    /// Perform forward propagation for a batch of inputs
    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32>;

    /// Accumulate parameter gradients and return the gradient w.r.t. the input
    fn backpropagation(
        &mut self,
        input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32>;

    fn has_weight(&self) -> bool {
        self.weights().is_some()
    }

    fn has_bias(&self) -> bool {
        self.bias().is_some()
    }

    fn weights(&self) -> Option<&Array2<f32>> {
        None
    }

    fn bias(&self) -> Option<&Array2<f32>> {
        None
    }

    fn gradient_weights(&self) -> Option<&Array2<f32>> {
        None
    }

    fn gradient_bias(&self) -> Option<&Array2<f32>> {
        None
    }

    /// Weights together with their accumulated gradient, for the optimizer step
    fn weights_and_gradient_mut(&mut self) -> Option<(&mut Array2<f32>, &Array2<f32>)> {
        None
    }

    /// Bias together with its accumulated gradient, for the optimizer step
    fn bias_and_gradient_mut(&mut self) -> Option<(&mut Array2<f32>, &Array2<f32>)> {
        None
    }

    /// Clear the accumulated gradients
    fn zero_gradients(&mut self) {}

    /// Switch between training (stochastic layers active) and inference
    fn set_train_mode(&mut self, _train_mode: bool) {}

    /// The first layer of a net does not need to compute its input gradient
    fn set_first_layer(&mut self, _first_layer: bool) {}

    /// Re-initialize learnable tensors and reseed internal randomness from `rng`
    fn init(&mut self, _rng: &mut StdRng) {}

    /// Reseed internal randomness only, leaving learnable tensors untouched
    fn reseed(&mut self, _rng: &mut StdRng) {}

    /// Nonlinearity of the layer, if it has a swappable one
    fn activation_mut(&mut self) -> Option<&mut Activation> {
        None
    }

    /// Persistable description of the layer, learnable tensors included
    fn snapshot(&self) -> LayerSnapshot;

    /// Clone the layer into a boxed trait object
    fn clone_box(&self) -> Box<dyn Layer>;
}

impl Clone for Box<dyn Layer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
