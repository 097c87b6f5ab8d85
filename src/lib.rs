//! # Metis - Feed-Forward Neural Network Training Library
//!
//! Metis trains small feed-forward networks built as a linear stack of layers.
//! It provides the layers, losses and optimizers, an epoch-based training loop
//! with best-model retention, and a multi-threaded search over independent
//! training runs.
//!
//! ## Key Features
//!
//! - **Layers**: Dense, Bias, Activation, Dropout, GaussianNoise, Softmax, gated
//!   activations (GLU family), Convolution2D and ChannelBias
//! - **Losses**: mean squared/absolute error, Huber, cross-entropy
//! - **Optimizers**: SGD, Momentum, Nesterov, Adagrad, RMSProp, Adam, Nadam with
//!   one state per learnable tensor
//! - **Training**: paired shuffling, batch-averaged gradients, keep-best,
//!   periodic optimizer reboosting, validation tracking
//! - **Meta optimizer**: parallel runs with per-run seeds and variations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metis::activations::Activation;
//! use metis::builders::NetBuilder;
//! use metis::train::NetTrain;
//! use ndarray::array;
//!
//! let mut net = NetBuilder::new()
//!     .add_dense(2, 3, Activation::Tanh)
//!     .add_dense(3, 1, Activation::Linear)
//!     .build()
//!     .unwrap();
//!
//! let samples = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
//! let truth = array![[0.0], [1.0], [1.0], [0.0]];
//!
//! let mut train = NetTrain::new();
//! train.set_epochs(2000);
//! train.set_batch_size(4).unwrap();
//! train.set_learning_rate(Some(0.1));
//! train.train(&mut net, samples.view(), truth.view()).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Sigmoid, Tanh, etc.)
//! - [`builders`] - Fluent construction of nets
//! - [`error`] - Error types and result handling
//! - [`layers`] - Layer trait, variants and factory
//! - [`loss`] - Loss functions for training
//! - [`matrix`] - Row helpers (argmax, one-hot, permutations)
//! - [`meta_optimizer`] - Parallel search over training runs
//! - [`metrics`] - Confusion matrix
//! - [`network`] - The layer stack
//! - [`optimizer`] - Optimization algorithms
//! - [`persistence`] - Saving a net with its training configuration
//! - [`train`] - The training loop

pub mod activations;
pub mod builders;
pub mod error;
pub mod layers;
pub mod loss;
pub mod matrix;
pub mod meta_optimizer;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod persistence;
pub mod train;

pub use error::{MetisError, Result};
pub use meta_optimizer::{MetaOptimizer, Variation};
pub use network::Net;
pub use train::{NetTrain, TrainResult};

#[cfg(test)]
mod tests;
