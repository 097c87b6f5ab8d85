//! Convolutional layers for processing spatial data
//!
//! Samples stay one row each: an image of `channels x rows x cols` is
//! flattened channel-major, so the element `(c, r, k)` lives in column
//! `c * rows * cols + r * cols + k`. Outputs use the same layout.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::error::{MetisError, Result};
use super::initialization::WeightInit;
use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Shape parameters of a 2D convolution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvGeometry {
    pub in_rows: usize,
    pub in_cols: usize,
    pub in_channels: usize,
    pub kernel_rows: usize,
    pub kernel_cols: usize,
    pub out_channels: usize,
    pub stride_rows: usize,
    pub stride_cols: usize,
}

impl ConvGeometry {
    pub fn out_rows(&self) -> usize {
        (self.in_rows - self.kernel_rows) / self.stride_rows + 1
    }

    pub fn out_cols(&self) -> usize {
        (self.in_cols - self.kernel_cols) / self.stride_cols + 1
    }

    pub fn input_size(&self) -> usize {
        self.in_channels * self.in_rows * self.in_cols
    }

    pub fn output_size(&self) -> usize {
        self.out_channels * self.out_rows() * self.out_cols()
    }

    /// Kernel must fit in the input and strides must be positive
    pub fn validate(&self) -> Result<()> {
        if self.kernel_rows == 0
            || self.kernel_cols == 0
            || self.kernel_rows > self.in_rows
            || self.kernel_cols > self.in_cols
        {
            return Err(MetisError::invalid_parameter(
                "kernel".to_string(),
                format!(
                    "{}x{} kernel does not fit a {}x{} input",
                    self.kernel_rows, self.kernel_cols, self.in_rows, self.in_cols
                ),
            ));
        }
        if self.stride_rows == 0 || self.stride_cols == 0 {
            return Err(MetisError::invalid_parameter("stride", "must be positive"));
        }
        Ok(())
    }

    fn kernel_size(&self) -> usize {
        self.in_channels * self.kernel_rows * self.kernel_cols
    }

    #[inline]
    fn input_index(&self, channel: usize, row: usize, col: usize) -> usize {
        (channel * self.in_rows + row) * self.in_cols + col
    }

    #[inline]
    fn kernel_index(&self, channel: usize, row: usize, col: usize) -> usize {
        (channel * self.kernel_rows + row) * self.kernel_cols + col
    }
}

/// 2D Convolutional Layer (valid padding)
///
/// Weights are stored as a matrix of shape
/// `[out_channels, in_channels * kernel_rows * kernel_cols]`
/// so that the optimizers see the same 2D tensors as for dense layers.
/// Pair it with a [`ChannelBiasLayer`](super::ChannelBiasLayer) for per-channel bias.
#[derive(Clone, Debug)]
pub struct Convolution2DLayer {
    pub geometry: ConvGeometry,
    pub weights: Array2<f32>,
    gradient_weights: Array2<f32>,
    first_layer: bool,
}

impl Convolution2DLayer {
    /// Create a stride-1 convolution
    pub fn new(
        in_rows: usize,
        in_cols: usize,
        in_channels: usize,
        kernel_rows: usize,
        kernel_cols: usize,
        out_channels: usize,
    ) -> Self {
        Self::with_stride(
            in_rows,
            in_cols,
            in_channels,
            kernel_rows,
            kernel_cols,
            out_channels,
            1,
            1,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_stride(
        in_rows: usize,
        in_cols: usize,
        in_channels: usize,
        kernel_rows: usize,
        kernel_cols: usize,
        out_channels: usize,
        stride_rows: usize,
        stride_cols: usize,
    ) -> Self {
        assert!(kernel_rows <= in_rows && kernel_cols <= in_cols, "Kernel larger than input");
        assert!(stride_rows > 0 && stride_cols > 0, "Stride must be positive");

        let geometry = ConvGeometry {
            in_rows,
            in_cols,
            in_channels,
            kernel_rows,
            kernel_cols,
            out_channels,
            stride_rows,
            stride_cols,
        };
        let weights = Self::initial_weights(&geometry, &mut rand::thread_rng());
        Self::from_parts(geometry, weights)
    }

    pub fn from_geometry(geometry: ConvGeometry) -> Self {
        Self::with_stride(
            geometry.in_rows,
            geometry.in_cols,
            geometry.in_channels,
            geometry.kernel_rows,
            geometry.kernel_cols,
            geometry.out_channels,
            geometry.stride_rows,
            geometry.stride_cols,
        )
    }

    pub(crate) fn from_parts(geometry: ConvGeometry, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), (geometry.out_channels, geometry.kernel_size()));
        Convolution2DLayer {
            gradient_weights: Array2::zeros(weights.dim()),
            geometry,
            weights,
            first_layer: false,
        }
    }

    fn initial_weights<R: rand::Rng>(geometry: &ConvGeometry, rng: &mut R) -> Array2<f32> {
        let fan_in = geometry.kernel_size();
        let fan_out = geometry.out_channels * geometry.kernel_rows * geometry.kernel_cols;
        WeightInit::XavierUniform.initialize_using(
            (geometry.out_channels, fan_in),
            fan_in,
            fan_out,
            rng,
        )
    }
}

impl Layer for Convolution2DLayer {
    fn type_name(&self) -> &'static str {
        "Convolution2D"
    }

    fn input_size(&self) -> usize {
        self.geometry.input_size()
    }

    fn output_size(&self) -> usize {
        self.geometry.output_size()
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let g = &self.geometry;
        assert_eq!(input.ncols(), g.input_size(), "Convolution input width");

        let (out_rows, out_cols) = (g.out_rows(), g.out_cols());
        let mut output = Array2::zeros((input.nrows(), g.output_size()));

        for b in 0..input.nrows() {
            for oc in 0..g.out_channels {
                for oh in 0..out_rows {
                    for ow in 0..out_cols {
                        let h_start = oh * g.stride_rows;
                        let w_start = ow * g.stride_cols;

                        let mut sum = 0.0;
                        for ic in 0..g.in_channels {
                            for kh in 0..g.kernel_rows {
                                for kw in 0..g.kernel_cols {
                                    sum += input[[b, g.input_index(ic, h_start + kh, w_start + kw)]]
                                        * self.weights[[oc, g.kernel_index(ic, kh, kw)]];
                                }
                            }
                        }

                        output[[b, (oc * out_rows + oh) * out_cols + ow]] = sum;
                    }
                }
            }
        }

        output
    }

    fn backpropagation(
        &mut self,
        input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        let g = self.geometry;
        let (out_rows, out_cols) = (g.out_rows(), g.out_cols());
        let mut gradient_in = if self.first_layer {
            Array2::zeros((gradient_out.nrows(), 0))
        } else {
            Array2::zeros((gradient_out.nrows(), g.input_size()))
        };

        for b in 0..gradient_out.nrows() {
            for oc in 0..g.out_channels {
                for oh in 0..out_rows {
                    for ow in 0..out_cols {
                        let delta = gradient_out[[b, (oc * out_rows + oh) * out_cols + ow]];
                        if delta == 0.0 {
                            continue;
                        }
                        let h_start = oh * g.stride_rows;
                        let w_start = ow * g.stride_cols;

                        for ic in 0..g.in_channels {
                            for kh in 0..g.kernel_rows {
                                for kw in 0..g.kernel_cols {
                                    let i = g.input_index(ic, h_start + kh, w_start + kw);
                                    let k = g.kernel_index(ic, kh, kw);
                                    self.gradient_weights[[oc, k]] += delta * input[[b, i]];
                                    if !self.first_layer {
                                        gradient_in[[b, i]] += delta * self.weights[[oc, k]];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        gradient_in
    }

    fn weights(&self) -> Option<&Array2<f32>> {
        Some(&self.weights)
    }

    fn gradient_weights(&self) -> Option<&Array2<f32>> {
        Some(&self.gradient_weights)
    }

    fn weights_and_gradient_mut(&mut self) -> Option<(&mut Array2<f32>, &Array2<f32>)> {
        Some((&mut self.weights, &self.gradient_weights))
    }

    fn zero_gradients(&mut self) {
        self.gradient_weights.fill(0.0);
    }

    fn set_first_layer(&mut self, first_layer: bool) {
        self.first_layer = first_layer;
    }

    fn init(&mut self, rng: &mut StdRng) {
        self.weights = Self::initial_weights(&self.geometry, rng);
        self.zero_gradients();
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Convolution2D {
            geometry: self.geometry,
            weights: self.weights.clone(),
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
