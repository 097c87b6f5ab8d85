/***
# Meta Optimizer Example

* Fits sin(x) on [-pi, pi] with several independent runs:
  - one variation per hidden activation, three runs each
  - runs are spread over every hardware thread
  - each strictly better solution is reported as it is found
  - the best net is saved together with its training configuration
***/

use std::f32::consts::PI;

use metis::{
    activations::Activation,
    builders::NetBuilder,
    meta_optimizer::{MetaOptimizer, Variation},
    persistence::save_solution,
    train::NetTrain,
};
use ndarray::Array2;

fn main() -> metis::Result<()> {
    tracing_subscriber::fmt::init();

    let n = 64;
    let samples =
        Array2::from_shape_fn((n, 1), |(i, _)| -PI + 2.0 * PI * i as f32 / (n - 1) as f32);
    let truth = samples.mapv(f32::sin);

    let net = NetBuilder::new()
        .add_dense(1, 16, Activation::Tanh)
        .named("DenseAndBias", 16, 1)
        .build()?;

    let mut train = NetTrain::new();
    train.set_learning_rate(Some(0.01));
    train.set_epochs(300);
    train.set_batch_size(16)?;
    train.set_train_data(samples, truth);

    let mut meta = MetaOptimizer::new();
    meta.set_net(&net);
    meta.set_train(&train);
    meta.set_seed(42);
    for activation in [Activation::Tanh, Activation::Sigmoid, Activation::Gelu, Activation::Swish] {
        meta.add_variation(3, Variation::activation(activation));
    }
    meta.set_better_solution_callback(|train, _net, result| {
        println!(
            "  better solution: loss {:?} after {} epochs ({})",
            result.metric(),
            result.epochs,
            train.optimizer()
        );
    });

    println!("=== Meta optimizer on sin(x) ===\n");
    let report = meta.run()?;

    println!();
    for run in &report.runs {
        println!(
            "  run {:>2} on thread {} [{}]: {:?}",
            run.job,
            run.thread,
            run.variation.as_deref().unwrap_or("-"),
            run.metric()
        );
    }

    if let (Some(best), Some(best_net)) = (report.best(), report.best_net.as_ref()) {
        println!("\nBest run {} with {:?}", best.job, best.variation);
        save_solution("sin_solution.json", &train, best_net)?;
        println!("Saved to sin_solution.json");
    }
    Ok(())
}
