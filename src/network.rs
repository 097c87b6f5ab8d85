use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{MetisError, Result};
use crate::layers::{create_layer, DropoutLayer, Layer, LayerSnapshot};
use crate::matrix::argmax;

/// An ordered stack of layers.
///
/// The net owns its layers exclusively; cloning deep-copies every layer
/// (weights, gradient buffers and random generators included), so clones can
/// be trained on different threads without sharing any state.
#[derive(Clone, Default)]
pub struct Net {
    layers: Vec<Box<dyn Layer>>,
    train_mode: bool,
}

/// Persisted form of a [`Net`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetSnapshot {
    pub layers: Vec<LayerSnapshot>,
}

impl Net {
    pub fn new() -> Self {
        Net { layers: Vec::new(), train_mode: false }
    }

    /// Append a layer, taking ownership of it.
    ///
    /// Fails when the layer's declared input width differs from the current
    /// output width of the net. Size-agnostic layers (width 0) always fit.
    pub fn add(&mut self, mut layer: Box<dyn Layer>) -> Result<()> {
        let current = self.output_size();
        let expected = layer.input_size();
        if current != 0 && expected != 0 && current != expected {
            return Err(MetisError::dimension_mismatch(
                format!("{} input of width {}", layer.type_name(), current),
                format!("{}", expected),
            ));
        }
        layer.set_first_layer(self.layers.is_empty());
        layer.set_train_mode(self.train_mode);
        self.layers.push(layer);
        Ok(())
    }

    /// Append a layer built by name, see [`create_layer`]
    pub fn add_layer(&mut self, name: &str, input_size: usize, output_size: usize) -> Result<()> {
        let layer = create_layer(name, input_size, output_size)
            .ok_or_else(|| MetisError::unknown_name("layer", name))?;
        self.add(layer)
    }

    pub fn add_dropout_layer(&mut self, size: usize, rate: f32) -> Result<()> {
        if !(0.0..1.0).contains(&rate) {
            return Err(MetisError::invalid_parameter("rate", "dropout rate must be in [0, 1)"));
        }
        self.add(Box::new(DropoutLayer::new(size, rate)))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Re-initialize every layer's learnable tensors and internal randomness from `rng`
    pub fn init(&mut self, rng: &mut StdRng) {
        for layer in self.layers.iter_mut() {
            layer.init(rng);
        }
    }

    /// Give every stochastic layer a fresh random stream drawn from `rng`.
    /// Weights are kept, and the pending dropout masks and noise are redrawn.
    pub fn reseed(&mut self, rng: &mut StdRng) {
        for layer in self.layers.iter_mut() {
            layer.reseed(rng);
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&dyn Layer> {
        self.layers.get(index).map(|layer| layer.as_ref())
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Box<dyn Layer>> {
        self.layers.get_mut(index)
    }

    /// Swap the layer at `index`, returning the previous one.
    ///
    /// The replacement must be shape compatible with its neighbours; on
    /// failure the net is left unchanged.
    pub fn replace_layer(
        &mut self,
        index: usize,
        mut layer: Box<dyn Layer>,
    ) -> Result<Box<dyn Layer>> {
        if index >= self.layers.len() {
            return Err(MetisError::invalid_parameter(
                "index".to_string(),
                format!(
                    "layer index {} out of range for a net of {} layers",
                    index,
                    self.layers.len()
                ),
            ));
        }
        layer.set_first_layer(index == 0);
        layer.set_train_mode(self.train_mode);
        let previous = std::mem::replace(&mut self.layers[index], layer);
        if let Err(err) = check_chain(&self.layers) {
            self.layers[index] = previous;
            return Err(err);
        }
        Ok(previous)
    }

    /// Width expected by the first layer that declares one, 0 for an empty or size-agnostic net
    pub fn input_size(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.input_size())
            .find(|&size| size != 0)
            .unwrap_or(0)
    }

    /// Width produced by the last layer that declares one
    pub fn output_size(&self) -> usize {
        self.layers
            .iter()
            .rev()
            .map(|layer| layer.output_size())
            .find(|&size| size != 0)
            .unwrap_or(0)
    }

    /// Run every layer in order. Works for any number of rows.
    pub fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let mut output = input.to_owned();
        for layer in &self.layers {
            output = layer.forward(output.view());
        }
        output
    }

    /// Forward pass keeping the input of every layer plus the final output.
    ///
    /// Entry `i` is the input of layer `i`; the last entry is the net output.
    pub(crate) fn forward_trace(&self, input: ArrayView2<f32>) -> Vec<Array2<f32>> {
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(input.to_owned());
        for layer in &self.layers {
            let next = match trace.last() {
                Some(previous) => layer.forward(previous.view()),
                None => break,
            };
            trace.push(next);
        }
        trace
    }

    /// Class of one sample: argmax of the output, or the rounded value for a single output
    pub fn classify(&self, sample: ArrayView1<f32>) -> usize {
        let output = self.forward(sample.insert_axis(Axis(0)));
        output_label(output.row(0))
    }

    pub fn classify_all(&self, samples: ArrayView2<f32>) -> Vec<usize> {
        let output = self.forward(samples);
        output.rows().into_iter().map(output_label).collect()
    }

    /// Propagate the train/inference switch to every layer
    pub fn set_train_mode(&mut self, train_mode: bool) {
        self.train_mode = train_mode;
        for layer in self.layers.iter_mut() {
            layer.set_train_mode(train_mode);
        }
    }

    pub fn is_train_mode(&self) -> bool {
        self.train_mode
    }

    pub fn zero_gradients(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.zero_gradients();
        }
    }

    /// Set the nonlinearity of every activation layer. Returns how many were changed.
    pub fn replace_activations(&mut self, activation: Activation) -> usize {
        let mut replaced = 0;
        for layer in self.layers.iter_mut() {
            if let Some(current) = layer.activation_mut() {
                *current = activation;
                replaced += 1;
            }
        }
        replaced
    }

    pub fn snapshot(&self) -> NetSnapshot {
        NetSnapshot {
            layers: self.layers.iter().map(|layer| layer.snapshot()).collect(),
        }
    }

    pub fn from_snapshot(snapshot: NetSnapshot) -> Result<Net> {
        let mut net = Net::new();
        for layer in snapshot.layers {
            net.add(layer.build()?)?;
        }
        Ok(net)
    }

    /// Textual (JSON) form of the net, weights included
    pub fn write(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn read(text: &str) -> Result<Net> {
        let snapshot: NetSnapshot = serde_json::from_str(text)?;
        Net::from_snapshot(snapshot)
    }

    /// Save the net to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(&self.snapshot())?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    /// Load a net previously written by [`Net::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Net> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let snapshot: NetSnapshot = deserialize(&buffer)?;
        Net::from_snapshot(snapshot)
    }
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .layers
            .iter()
            .map(|layer| {
                format!("{}({}->{})", layer.type_name(), layer.input_size(), layer.output_size())
            })
            .collect();
        f.debug_struct("Net")
            .field("layers", &names)
            .field("train_mode", &self.train_mode)
            .finish()
    }
}

/// Label predicted by one output row.
///
/// A single output is rounded to the nearest non-negative integer, wider
/// outputs use the index of the maximum.
pub fn output_label(row: ArrayView1<f32>) -> usize {
    if row.len() == 1 {
        row[0].round().max(0.0) as usize
    } else {
        argmax(row)
    }
}

fn check_chain(layers: &[Box<dyn Layer>]) -> Result<()> {
    let mut width = 0;
    for layer in layers {
        let expected = layer.input_size();
        if width != 0 && expected != 0 && width != expected {
            return Err(MetisError::dimension_mismatch(
                format!("{} input of width {}", layer.type_name(), width),
                format!("{}", expected),
            ));
        }
        if layer.output_size() != 0 {
            width = layer.output_size();
        }
    }
    Ok(())
}
