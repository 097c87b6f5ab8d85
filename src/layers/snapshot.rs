use ndarray::Array2;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{MetisError, Result};
use super::conv::ConvGeometry;
use super::initialization::WeightInit;
use super::{
    ActivationLayer, BiasLayer, ChannelBiasLayer, Convolution2DLayer, DenseLayer, DropoutLayer,
    GatedActivationLayer, GaussianNoiseLayer, Layer, SoftmaxLayer,
};

/// Persisted form of a layer: type, sizes, hyperparameters and learnable tensors.
///
/// Stochastic state (dropout masks, noise, generators) is not persisted; it is
/// redrawn when the layer is rebuilt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LayerSnapshot {
    Dense {
        weights: Array2<f32>,
        bias: Option<Array2<f32>>,
        weight_init: WeightInit,
    },
    Bias {
        bias: Array2<f32>,
    },
    Activation {
        activation: Activation,
        size: usize,
    },
    Dropout {
        size: usize,
        rate: f32,
    },
    GaussianNoise {
        size: usize,
        std_dev: f32,
    },
    Softmax,
    GatedActivation {
        gate: Activation,
        output_size: usize,
    },
    Convolution2D {
        geometry: ConvGeometry,
        weights: Array2<f32>,
    },
    ChannelBias {
        rows: usize,
        cols: usize,
        bias: Array2<f32>,
    },
}

impl LayerSnapshot {
    /// Rebuild the layer described by this snapshot.
    pub fn build(self) -> Result<Box<dyn Layer>> {
        let layer: Box<dyn Layer> = match self {
            LayerSnapshot::Dense { weights, bias, weight_init } => {
                let (input_size, output_size) = weights.dim();
                let mut layer =
                    DenseLayer::new_with_init(input_size, output_size, false, weight_init)
                    .with_weights(weights);
                if let Some(bias) = bias {
                    check_row(&bias, output_size, "bias")?;
                    layer = layer.with_bias_values(bias);
                }
                Box::new(layer)
            }
            LayerSnapshot::Bias { bias } => {
                let size = bias.ncols();
                check_row(&bias, size, "bias")?;
                Box::new(BiasLayer::new(size).with_bias_values(bias))
            }
            LayerSnapshot::Activation { activation, size } => {
                Box::new(ActivationLayer::with_size(activation, size))
            }
            LayerSnapshot::Dropout { size, rate } => {
                if !(0.0..1.0).contains(&rate) {
                    return Err(MetisError::invalid_parameter(
                        "rate",
                        "dropout rate must be in [0, 1)",
                    ));
                }
                Box::new(DropoutLayer::new(size, rate))
            }
            LayerSnapshot::GaussianNoise { size, std_dev } => {
                if !(std_dev >= 0.0 && std_dev.is_finite()) {
                    return Err(MetisError::invalid_parameter(
                        "std_dev",
                        "noise std_dev must be finite and >= 0",
                    ));
                }
                Box::new(GaussianNoiseLayer::new(size, std_dev))
            }
            LayerSnapshot::Softmax => Box::new(SoftmaxLayer::new()),
            LayerSnapshot::GatedActivation { gate, output_size } => {
                Box::new(GatedActivationLayer::new(gate, output_size))
            }
            LayerSnapshot::Convolution2D { geometry, weights } => {
                geometry.validate()?;
                let expected = (
                    geometry.out_channels,
                    geometry.in_channels * geometry.kernel_rows * geometry.kernel_cols,
                );
                if weights.dim() != expected {
                    return Err(MetisError::dimension_mismatch(
                        format!("convolution weights {:?}", expected),
                        format!("{:?}", weights.dim()),
                    ));
                }
                Box::new(Convolution2DLayer::from_parts(geometry, weights))
            }
            LayerSnapshot::ChannelBias { rows, cols, bias } => {
                let channels = bias.ncols();
                check_row(&bias, channels, "bias")?;
                Box::new(ChannelBiasLayer::new(rows, cols, channels).with_bias_values(bias))
            }
        };
        Ok(layer)
    }
}

fn check_row(m: &Array2<f32>, size: usize, what: &str) -> Result<()> {
    if m.dim() != (1, size) {
        return Err(MetisError::dimension_mismatch(
            format!("{} of shape (1, {})", what, size),
            format!("{:?}", m.dim()),
        ));
    }
    Ok(())
}
