use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// One learnable bias per channel of a flattened `channels x rows x cols` input.
#[derive(Clone, Debug)]
pub struct ChannelBiasLayer {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
    /// Bias row, shape `(1, channels)`
    pub bias: Array2<f32>,
    gradient_bias: Array2<f32>,
}

impl ChannelBiasLayer {
    pub fn new(rows: usize, cols: usize, channels: usize) -> Self {
        ChannelBiasLayer {
            rows,
            cols,
            channels,
            bias: Array2::zeros((1, channels)),
            gradient_bias: Array2::zeros((1, channels)),
        }
    }

    pub fn with_bias_values(mut self, bias: Array2<f32>) -> Self {
        assert_eq!(bias.dim(), (1, self.channels));
        self.bias = bias;
        self
    }

    fn plane(&self) -> usize {
        self.rows * self.cols
    }
}

impl Layer for ChannelBiasLayer {
    fn type_name(&self) -> &'static str {
        "ChannelBias"
    }

    fn input_size(&self) -> usize {
        self.channels * self.plane()
    }

    fn output_size(&self) -> usize {
        self.channels * self.plane()
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        assert_eq!(input.ncols(), self.input_size(), "Channel bias input width");
        let plane = self.plane();
        let mut output = input.to_owned();
        for mut row in output.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v += self.bias[[0, j / plane]];
            }
        }
        output
    }

    fn backpropagation(
        &mut self,
        _input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        let plane = self.plane();
        for row in gradient_out.rows() {
            for (j, &g) in row.iter().enumerate() {
                self.gradient_bias[[0, j / plane]] += g;
            }
        }
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
        LayerSnapshot::ChannelBias {
            rows: self.rows,
            cols: self.cols,
            bias: self.bias.clone(),
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
