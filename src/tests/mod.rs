// Test modules for all components
pub mod test_activations;
pub mod test_loss;
pub mod test_meta_optimizer;
pub mod test_optimizer;
pub mod test_train;
