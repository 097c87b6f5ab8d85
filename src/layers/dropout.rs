use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Dropout Layer
///
/// In training mode each feature is zeroed with probability `dropout_rate` and
/// the survivors are scaled by `1 / (1 - dropout_rate)` (inverted dropout), so
/// inference is a plain identity. The mask is drawn ahead of the forward call
/// and redrawn right after the paired backward call.
#[derive(Clone, Debug)]
pub struct DropoutLayer {
    /// Dropout probability (probability of dropping a unit)
    pub dropout_rate: f32,

    /// Whether we're in training mode
    pub training: bool,

    /// Size of the layer
    size: usize,

    /// Mask used by the next forward call, shape `(1, size)`
    mask: Array2<f32>,

    rng: StdRng,
}

impl DropoutLayer {
    /// Create a new dropout layer
    pub fn new(size: usize, dropout_rate: f32) -> Self {
        Self::with_rng(size, dropout_rate, StdRng::from_entropy())
    }

    /// Create a dropout layer drawing its masks from a seeded generator
    pub fn with_seed(size: usize, dropout_rate: f32, seed: u64) -> Self {
        Self::with_rng(size, dropout_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: usize, dropout_rate: f32, rng: StdRng) -> Self {
        assert!((0.0..1.0).contains(&dropout_rate),
                "Dropout rate must be in [0, 1)");

        let mut layer = DropoutLayer {
            dropout_rate,
            training: false,
            size,
            mask: Array2::ones((1, size)),
            rng,
        };
        layer.create_mask();
        layer
    }

    /// Mask that the next training-mode forward call will apply
    pub fn mask(&self) -> &Array2<f32> {
        &self.mask
    }

    fn create_mask(&mut self) {
        let scale = 1.0 / (1.0 - self.dropout_rate);
        let rate = self.dropout_rate;
        let rng = &mut self.rng;
        self.mask.mapv_inplace(|_| if rng.gen::<f32>() < rate { 0.0 } else { scale });
    }
}

impl Layer for DropoutLayer {
    fn type_name(&self) -> &'static str {
        "Dropout"
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        if !self.training || self.dropout_rate == 0.0 {
            return input.to_owned();
        }
        &input * &self.mask
    }

    fn backpropagation(
        &mut self,
        _input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        if !self.training || self.dropout_rate == 0.0 {
            return gradient_out.to_owned();
        }
        let gradient_in = &gradient_out * &self.mask;
        self.create_mask();
        gradient_in
    }

    fn set_train_mode(&mut self, train_mode: bool) {
        self.training = train_mode;
    }

    fn init(&mut self, rng: &mut StdRng) {
        self.reseed(rng);
    }

    fn reseed(&mut self, rng: &mut StdRng) {
        self.rng = StdRng::seed_from_u64(rng.gen());
        self.create_mask();
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Dropout {
            size: self.size,
            rate: self.dropout_rate,
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
