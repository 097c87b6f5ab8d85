//! # Training
//!
//! [`NetTrain`] drives the epoch loop over a [`Net`](crate::network::Net):
//! paired shuffling of samples and truth, batching, forward and backward
//! passes, a per-layer optimizer step on the batch-averaged gradient,
//! keep-best snapshots and periodic optimizer reboosting.
//!
//! ```no_run
//! use metis::network::Net;
//! use metis::train::NetTrain;
//! use ndarray::array;
//!
//! let mut net = Net::new();
//! net.add_layer("DenseAndBias", 2, 3).unwrap();
//! net.add_layer("Tanh", 3, 3).unwrap();
//! net.add_layer("DenseAndBias", 3, 1).unwrap();
//!
//! let samples = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
//! let truth = array![[0.0], [1.0], [1.0], [0.0]];
//!
//! let mut train = NetTrain::new();
//! train.set_epochs(1000);
//! train.set_batch_size(4).unwrap();
//! train.set_learning_rate(Some(0.1));
//! let result = train.train(&mut net, samples.view(), truth.view()).unwrap();
//! println!("final loss {:?}", result.final_loss());
//! ```

pub mod config;
pub mod net_train;
pub mod result;

pub use config::{ProblemKind, TrainConfig};
pub use net_train::{EpochCallback, NetTrain};
pub use result::{Metric, TrainResult};
