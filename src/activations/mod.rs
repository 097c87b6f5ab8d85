//! # Activation Functions Module
//!
//! Element-wise nonlinearities used by [`ActivationLayer`](crate::layers::ActivationLayer)
//! and as gates inside [`GatedActivationLayer`](crate::layers::GatedActivationLayer).
//!
//! ## Available Activations
//!
//! - **Relu**, **LeakyRelu**, **Elu**, **Selu**: rectifier family
//! - **Sigmoid**, **Tanh**, **Softsign**, **HardTanh**: bounded squashing functions
//! - **Softplus**, **Swish**, **Mish**, **Gelu**: smooth rectifiers
//! - **Gauss**, **Absolute**, **Linear**: the rest
//!
//! Derivatives are always evaluated at the pre-activation input, so a layer only
//! needs the input it was given in the forward pass to run backpropagation.
//!
//! ## Usage Example
//!
//! ```rust
//! use metis::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5, 0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0, 0.0, 2.0]]);
//!
//! assert_eq!(Activation::from_name("Tanh"), Some(Activation::Tanh));
//! assert_eq!(Activation::from_name("NoSuchThing"), None);
//! ```

pub mod functions;

pub use functions::{list_activation_available, Activation};
