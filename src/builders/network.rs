use crate::activations::Activation;
use crate::error::{MetisError, Result};
use crate::layers::{
    create_layer, ActivationLayer, ConvGeometry, Convolution2DLayer, DenseLayer, DropoutLayer,
    GaussianNoiseLayer, Layer, SoftmaxLayer, WeightInit,
};
use crate::network::Net;

/// Builder for constructing nets with a fluent API.
///
/// Layers are collected first and checked for shape compatibility in
/// [`NetBuilder::build`]. Errors from named layers are deferred to `build`
/// as well, so a chain of calls never panics.
pub struct NetBuilder {
    layers: Vec<Box<dyn Layer>>,
    error: Option<MetisError>,
}

impl NetBuilder {
    /// Create a new net builder
    pub fn new() -> Self {
        NetBuilder {
            layers: Vec::new(),
            error: None,
        }
    }

    /// Add any layer
    pub fn layer(mut self, layer: Box<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Add a layer by registry name
    pub fn named(mut self, name: &str, input_size: usize, output_size: usize) -> Self {
        match create_layer(name, input_size, output_size) {
            Some(layer) => self.layers.push(layer),
            None => {
                self.error.get_or_insert_with(|| MetisError::unknown_name("layer", name));
            }
        }
        self
    }

    /// Add a dense layer with bias followed by an activation
    pub fn add_dense(self, input_size: usize, output_size: usize, activation: Activation) -> Self {
        self.layer(Box::new(DenseLayer::with_bias(input_size, output_size)))
            .layer(Box::new(ActivationLayer::with_size(activation, output_size)))
    }

    /// Add a dense layer with an explicit initializer
    pub fn add_dense_with_init(
        self,
        input_size: usize,
        output_size: usize,
        use_bias: bool,
        init: WeightInit,
    ) -> Self {
        self.layer(Box::new(DenseLayer::new_with_init(input_size, output_size, use_bias, init)))
    }

    /// Add a sequence of dense layers, one activation per transition
    pub fn add_layers(mut self, layer_sizes: &[usize], activations: &[Activation]) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(MetisError::invalid_parameter(
                "layer_sizes",
                "Must have at least 2 layer sizes",
            ));
        }

        if layer_sizes.len() - 1 != activations.len() {
            return Err(MetisError::DimensionMismatch {
                expected: format!("{} activations", layer_sizes.len() - 1),
                actual: format!("{} activations", activations.len()),
            });
        }

        for (window, &activation) in layer_sizes.windows(2).zip(activations.iter()) {
            self = self.add_dense(window[0], window[1], activation);
        }

        Ok(self)
    }

    pub fn add_dropout(self, size: usize, rate: f32) -> Self {
        if !(0.0..1.0).contains(&rate) {
            return self.fail(MetisError::invalid_parameter(
                "rate",
                "dropout rate must be in [0, 1)",
            ));
        }
        self.layer(Box::new(DropoutLayer::new(size, rate)))
    }

    pub fn add_noise(self, size: usize, std_dev: f32) -> Self {
        if !(std_dev >= 0.0 && std_dev.is_finite()) {
            return self.fail(MetisError::invalid_parameter(
                "std_dev",
                "noise std_dev must be finite and >= 0",
            ));
        }
        self.layer(Box::new(GaussianNoiseLayer::new(size, std_dev)))
    }

    pub fn add_softmax(self) -> Self {
        self.layer(Box::new(SoftmaxLayer::new()))
    }

    pub fn add_convolution(self, geometry: ConvGeometry) -> Self {
        match geometry.validate() {
            Ok(()) => self.layer(Box::new(Convolution2DLayer::from_geometry(geometry))),
            Err(error) => self.fail(error),
        }
    }

    fn fail(mut self, error: MetisError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Build the net
    pub fn build(self) -> Result<Net> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.layers.is_empty() {
            return Err(MetisError::invalid_parameter("layers", "Net must have at least one layer"));
        }

        let mut net = Net::new();
        for layer in self.layers {
            net.add(layer)?;
        }
        Ok(net)
    }
}

impl Default for NetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_builder() {
        let net = NetBuilder::new()
            .add_dense(4, 32, Activation::Relu)
            .add_dense(32, 32, Activation::Relu)
            .add_dense(32, 2, Activation::Linear)
            .build()
            .unwrap();

        assert_eq!(net.len(), 6);
        assert_eq!(net.input_size(), 4);
        assert_eq!(net.output_size(), 2);
    }

    #[test]
    fn test_net_builder_with_layers() {
        let net = NetBuilder::new()
            .add_layers(&[4, 8, 3], &[Activation::Tanh, Activation::Linear])
            .unwrap()
            .add_softmax()
            .build()
            .unwrap();

        assert_eq!(net.len(), 5);
        assert_eq!(net.output_size(), 3);
    }

    #[test]
    fn test_builder_errors() {
        // No layers
        assert!(NetBuilder::new().build().is_err());

        // Unknown name
        let result = NetBuilder::new().named("NotALayer", 2, 2).build();
        assert!(matches!(result, Err(MetisError::UnknownName { .. })));

        // Incompatible widths
        let result = NetBuilder::new()
            .named("Dense", 4, 3)
            .named("Dense", 2, 1)
            .build();
        assert!(matches!(result, Err(MetisError::DimensionMismatch { .. })));

        // Mismatched layer sizes and activations
        let result = NetBuilder::new().add_layers(&[4, 32, 2], &[Activation::Relu]);
        assert!(result.is_err());

        assert!(NetBuilder::new().add_dropout(4, 1.5).build().is_err());
    }
}
