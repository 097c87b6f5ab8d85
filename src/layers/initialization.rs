use ndarray::Array2;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::{Normal, Uniform};
use rand::Rng;
use serde::{Serialize, Deserialize};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    #[default]
    XavierUniform,

    /// Xavier/Glorot normal initialization
    XavierNormal,

    /// He/Kaiming uniform initialization (for ReLU)
    HeUniform,

    /// He/Kaiming normal initialization (for ReLU)
    HeNormal,

    /// Uniform distribution with custom range
    Uniform { min: f32, max: f32 },

    /// Normal distribution with custom mean and std
    Normal { mean: f32, std: f32 },

    /// All zeros
    Zeros,

    /// All ones
    Ones,
}

impl WeightInit {
    /// Initialize a weight tensor of `shape` drawing from `rng`.
    ///
    /// `fan_in` and `fan_out` drive the Xavier and He scales; they are the
    /// matrix dimensions for dense layers and the receptive-field sizes for
    /// convolutions.
    pub fn initialize_using<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Array2<f32> {
        let fan_in = fan_in.max(1) as f32;
        let fan_out = fan_out.max(1) as f32;

        match *self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out)).sqrt();
                Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }

            WeightInit::XavierNormal => {
                let std = (2.0 / (fan_in + fan_out)).sqrt();
                normal_or_zeros(shape, 0.0, std, rng)
            }

            WeightInit::HeUniform => {
                let limit = (6.0 / fan_in).sqrt();
                Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }

            WeightInit::HeNormal => {
                let std = (2.0 / fan_in).sqrt();
                normal_or_zeros(shape, 0.0, std, rng)
            }

            WeightInit::Uniform { min, max } => {
                Array2::random_using(shape, Uniform::new_inclusive(min, max), rng)
            }

            WeightInit::Normal { mean, std } => normal_or_zeros(shape, mean, std, rng),

            WeightInit::Zeros => Array2::zeros(shape),

            WeightInit::Ones => Array2::ones(shape),
        }
    }

    /// Same as [`WeightInit::initialize_using`] with the thread-local generator.
    pub fn initialize(&self, shape: (usize, usize), fan_in: usize, fan_out: usize) -> Array2<f32> {
        self.initialize_using(shape, fan_in, fan_out, &mut rand::thread_rng())
    }
}

fn normal_or_zeros<R: Rng + ?Sized>(
    shape: (usize, usize),
    mean: f32,
    std: f32,
    rng: &mut R,
) -> Array2<f32> {
    match Normal::new(mean, std) {
        Ok(distribution) => Array2::random_using(shape, distribution, rng),
        Err(_) => Array2::from_elem(shape, mean),
    }
}
