//! Loss functions and their by-name registry.

pub mod functions;

pub use functions::{BinaryCrossEntropyLoss, CrossEntropyLoss, HuberLoss, Loss, MAE, MSE};

/// Name of the loss used when none is configured
pub const DEFAULT_LOSS: &str = "MeanSquaredError";

const LOSS_NAMES: [&str; 5] = [
    "MeanSquaredError",
    "MeanAbsoluteError",
    "Huber",
    "CrossEntropy",
    "BinaryCrossEntropy",
];

/// Build a loss from its name. Returns `None` for unknown names.
pub fn create_loss(name: &str) -> Option<Box<dyn Loss>> {
    let loss: Box<dyn Loss> = match name {
        "MeanSquaredError" | "MeanSquareError" => Box::new(MSE),
        "MeanAbsoluteError" => Box::new(MAE),
        "Huber" => Box::new(HuberLoss::default()),
        "CrossEntropy" => Box::new(CrossEntropyLoss),
        "BinaryCrossEntropy" => Box::new(BinaryCrossEntropyLoss),
        _ => return None,
    };
    Some(loss)
}

/// Names accepted by [`create_loss`]
pub fn list_loss_available() -> Vec<&'static str> {
    LOSS_NAMES.to_vec()
}
