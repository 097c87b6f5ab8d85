use ndarray::{Array2, ArrayView2};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Additive gaussian noise, active in training mode only.
///
/// Like dropout, the noise row is drawn ahead of the forward call and redrawn
/// after the paired backward call. The gradient passes through unchanged.
#[derive(Clone, Debug)]
pub struct GaussianNoiseLayer {
    pub std_dev: f32,
    pub training: bool,
    size: usize,
    noise: Array2<f32>,
    rng: StdRng,
}

impl GaussianNoiseLayer {
    pub fn new(size: usize, std_dev: f32) -> Self {
        assert!(std_dev >= 0.0 && std_dev.is_finite(), "Noise std_dev must be finite and >= 0");

        let mut layer = GaussianNoiseLayer {
            std_dev,
            training: false,
            size,
            noise: Array2::zeros((1, size)),
            rng: StdRng::from_entropy(),
        };
        layer.create_noise();
        layer
    }

    fn create_noise(&mut self) {
        // std_dev is validated in the constructor
        if let Ok(distribution) = Normal::new(0.0, self.std_dev) {
            self.noise = Array2::random_using((1, self.size), distribution, &mut self.rng);
        }
    }
}

impl Layer for GaussianNoiseLayer {
    fn type_name(&self) -> &'static str {
        "GaussianNoise"
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        if !self.training {
            return input.to_owned();
        }
        &input + &self.noise
    }

    fn backpropagation(
        &mut self,
        _input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        if self.training {
            self.create_noise();
        }
        gradient_out.to_owned()
    }

    fn set_train_mode(&mut self, train_mode: bool) {
        self.training = train_mode;
    }

    fn init(&mut self, rng: &mut StdRng) {
        self.reseed(rng);
    }

    fn reseed(&mut self, rng: &mut StdRng) {
        self.rng = StdRng::seed_from_u64(rng.gen());
        self.create_noise();
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::GaussianNoise {
            size: self.size,
            std_dev: self.std_dev,
        }
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
