/***
# XOR Example

* Trains a 2-4-1 net on the XOR truth table:
  - Dense + Tanh hidden layer, linear output
  - Adam with a per-epoch progress callback
  - Keeps the best epoch and prints the final predictions
***/

use metis::{
    activations::Activation,
    builders::NetBuilder,
    train::NetTrain,
};
use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> metis::Result<()> {
    tracing_subscriber::fmt::init();

    let samples = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let truth = array![[0.0], [1.0], [1.0], [0.0]];

    let mut net = NetBuilder::new()
        .add_dense(2, 4, Activation::Tanh)
        .named("DenseAndBias", 4, 1)
        .build()?;
    net.init(&mut StdRng::seed_from_u64(1));

    let mut train = NetTrain::new();
    train.set_learning_rate(Some(0.05));
    train.set_epochs(1500);
    train.set_batch_size(4)?;
    train.set_seed(1);
    train.set_epoch_callback(|train| {
        if train.current_epoch() % 250 == 0 {
            println!("  epoch {:>5}: loss {:.6}", train.current_epoch(), train.current_loss());
        }
    });

    println!("=== XOR ===\n");
    let result = train.train(&mut net, samples.view(), truth.view())?;
    println!("\nKept epoch {:?} of {}", result.best_epoch.map(|e| e + 1), result.epochs);

    let output = net.forward(samples.view());
    for (sample, value) in samples.rows().into_iter().zip(output.iter()) {
        println!("  {} xor {} -> {:.3}", sample[0], sample[1], value);
    }
    Ok(())
}
