pub mod confusion;

pub use confusion::{ClassificationResult, ConfusionMatrix};
