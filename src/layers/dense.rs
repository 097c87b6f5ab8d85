use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;

use super::initialization::WeightInit;
use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// A fully connected (dense) layer: `output = input · W (+ bias)`
#[derive(Clone, Debug)]
pub struct DenseLayer {
    /// Weights, shape `(input_size, output_size)`
    pub weights: Array2<f32>,
    /// Optional bias row, shape `(1, output_size)`
    pub bias: Option<Array2<f32>>,
    pub weight_init: WeightInit,
    gradient_weights: Array2<f32>,
    gradient_bias: Option<Array2<f32>>,
    first_layer: bool,
}

impl DenseLayer {
    /// Create a dense layer without bias, Xavier-uniform initialized.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self::new_with_init(input_size, output_size, false, WeightInit::XavierUniform)
    }

    /// Create a dense layer with a zero-initialized bias row.
    pub fn with_bias(input_size: usize, output_size: usize) -> Self {
        Self::new_with_init(input_size, output_size, true, WeightInit::XavierUniform)
    }

    pub fn new_with_init(
        input_size: usize,
        output_size: usize,
        use_bias: bool,
        weight_init: WeightInit,
    ) -> Self {
        let weights = weight_init.initialize((input_size, output_size), input_size, output_size);
        let bias = use_bias.then(|| Array2::zeros((1, output_size)));
        DenseLayer {
            gradient_weights: Array2::zeros(weights.dim()),
            gradient_bias: bias.as_ref().map(|b| Array2::zeros(b.dim())),
            weights,
            bias,
            weight_init,
            first_layer: false,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_bias_values(mut self, bias: Array2<f32>) -> Self {
        assert_eq!(bias.dim(), (1, self.weights.ncols()));
        self.gradient_bias = Some(Array2::zeros(bias.dim()));
        self.bias = Some(bias);
        self
    }
}

impl Layer for DenseLayer {
    fn type_name(&self) -> &'static str {
        if self.bias.is_some() { "DenseAndBias" } else { "Dense" }
    }

    fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let mut output = input.dot(&self.weights);
        if let Some(bias) = &self.bias {
            output += bias;
        }
        output
    }

    fn backpropagation(
        &mut self,
        input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        self.gradient_weights += &input.t().dot(&gradient_out);
        if let Some(gradient_bias) = &mut self.gradient_bias {
            *gradient_bias += &gradient_out.sum_axis(Axis(0)).insert_axis(Axis(0));
        }

        if self.first_layer {
            return Array2::zeros((gradient_out.nrows(), 0));
        }
        gradient_out.dot(&self.weights.t())
    }

    fn weights(&self) -> Option<&Array2<f32>> {
        Some(&self.weights)
    }

    fn bias(&self) -> Option<&Array2<f32>> {
        self.bias.as_ref()
    }

    fn gradient_weights(&self) -> Option<&Array2<f32>> {
        Some(&self.gradient_weights)
    }

    fn gradient_bias(&self) -> Option<&Array2<f32>> {
        self.gradient_bias.as_ref()
    }

    fn weights_and_gradient_mut(&mut self) -> Option<(&mut Array2<f32>, &Array2<f32>)> {
        Some((&mut self.weights, &self.gradient_weights))
    }

    fn bias_and_gradient_mut(&mut self) -> Option<(&mut Array2<f32>, &Array2<f32>)> {
        match (&mut self.bias, &self.gradient_bias) {
            (Some(bias), Some(gradient)) => Some((bias, gradient)),
            _ => None,
        }
    }

    fn zero_gradients(&mut self) {
        self.gradient_weights.fill(0.0);
        if let Some(gradient_bias) = &mut self.gradient_bias {
            gradient_bias.fill(0.0);
        }
    }

    fn set_first_layer(&mut self, first_layer: bool) {
        self.first_layer = first_layer;
    }

    fn init(&mut self, rng: &mut StdRng) {
        let (input_size, output_size) = self.weights.dim();
        self.weights = self.weight_init.initialize_using(
            (input_size, output_size),
            input_size,
            output_size,
            rng,
        );
        if let Some(bias) = &mut self.bias {
            bias.fill(0.0);
        }
        self.zero_gradients();
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Dense {
            weights: self.weights.clone(),
            bias: self.bias.clone(),
            weight_init: self.weight_init,
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
