use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;

use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Adds a learnable row vector to every sample.
#[derive(Clone, Debug)]
pub struct BiasLayer {
    /// Bias row, shape `(1, size)`
    pub bias: Array2<f32>,
    gradient_bias: Array2<f32>,
}

impl BiasLayer {
    pub fn new(size: usize) -> Self {
        BiasLayer {
            bias: Array2::zeros((1, size)),
            gradient_bias: Array2::zeros((1, size)),
        }
    }

    pub fn with_bias_values(mut self, bias: Array2<f32>) -> Self {
        assert_eq!(bias.dim(), self.bias.dim());
        self.bias = bias;
        self
    }
}

impl Layer for BiasLayer {
    fn type_name(&self) -> &'static str {
        "Bias"
    }

    fn input_size(&self) -> usize {
        self.bias.ncols()
    }

    fn output_size(&self) -> usize {
        self.bias.ncols()
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        &input + &self.bias
    }

    fn backpropagation(
        &mut self,
        _input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        self.gradient_bias += &gradient_out.sum_axis(Axis(0)).insert_axis(Axis(0));
        gradient_out.to_owned()
    }

    fn bias(&self) -> Option<&Array2<f32>> {
        Some(&self.bias)
    }

    fn gradient_bias(&self) -> Option<&Array2<f32>> {
        Some(&self.gradient_bias)
    }

    fn bias_and_gradient_mut(&mut self) -> Option<(&mut Array2<f32>, &Array2<f32>)> {
        Some((&mut self.bias, &self.gradient_bias))
    }

    fn zero_gradients(&mut self) {
        self.gradient_bias.fill(0.0);
    }

    fn init(&mut self, _rng: &mut StdRng) {
        self.bias.fill(0.0);
        self.gradient_bias.fill(0.0);
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Bias { bias: self.bias.clone() }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
