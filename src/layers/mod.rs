//! # Layers
//!
//! Every layer implements the [`Layer`] trait: a batch forward pass that does
//! not touch learnable tensors, and a backward pass that accumulates parameter
//! gradients and returns the gradient w.r.t. its input.
//!
//! Layers that can be built from a name and two sizes are available through
//! [`create_layer`]; convolution and channel-bias layers need their geometry and
//! are constructed directly.

pub mod traits;
pub mod activation;
pub mod bias;
pub mod channel_bias;
pub mod conv;
pub mod dense;
pub mod dropout;
pub mod gated;
pub mod initialization;
pub mod noise;
pub mod snapshot;
pub mod softmax;

pub use traits::Layer;
pub use activation::ActivationLayer;
pub use bias::BiasLayer;
pub use channel_bias::ChannelBiasLayer;
pub use conv::{ConvGeometry, Convolution2DLayer};
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use gated::GatedActivationLayer;
pub use initialization::WeightInit;
pub use noise::GaussianNoiseLayer;
pub use snapshot::LayerSnapshot;
pub use softmax::SoftmaxLayer;

use crate::activations::Activation;

/// Rate used when a dropout layer is created by name
pub const DEFAULT_DROPOUT_RATE: f32 = 0.2;

/// Standard deviation used when a noise layer is created by name
pub const DEFAULT_NOISE_STD_DEV: f32 = 0.1;

const LAYER_NAMES: [&str; 10] = [
    "Dense", "DenseAndBias", "Bias", "Dropout", "GaussianNoise", "Softmax",
    "GLU", "SwiGLU", "ReGLU", "GEGLU",
];

/// Build a layer from its registry name. Returns `None` for unknown names.
///
/// Shape-preserving layers (activations, dropout, bias...) use `output_size`
/// as their width.
pub fn create_layer(name: &str, input_size: usize, output_size: usize) -> Option<Box<dyn Layer>> {
    let layer: Box<dyn Layer> = match name {
        "Dense" => Box::new(DenseLayer::new(input_size, output_size)),
        "DenseAndBias" => Box::new(DenseLayer::with_bias(input_size, output_size)),
        "Bias" => Box::new(BiasLayer::new(output_size)),
        "Dropout" => Box::new(DropoutLayer::new(output_size, DEFAULT_DROPOUT_RATE)),
        "GaussianNoise" => Box::new(GaussianNoiseLayer::new(output_size, DEFAULT_NOISE_STD_DEV)),
        "Softmax" => Box::new(SoftmaxLayer::new()),
        _ => {
            if let Some(gate) = GatedActivationLayer::gate_for_name(name) {
                Box::new(GatedActivationLayer::new(gate, output_size))
            } else {
                let activation = Activation::from_name(name)?;
                Box::new(ActivationLayer::with_size(activation, output_size))
            }
        }
    };
    Some(layer)
}

/// Names accepted by [`create_layer`]
pub fn list_layers_available() -> Vec<&'static str> {
    LAYER_NAMES
        .iter()
        .copied()
        .chain(Activation::NAMES.iter().copied())
        .collect()
}
