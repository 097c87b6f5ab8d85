use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ndarray::{array, Array2};

use crate::activations::Activation;
use crate::builders::NetBuilder;
use crate::error::MetisError;
use crate::layers::Layer;
use crate::meta_optimizer::{MetaOptimizer, Variation};
use crate::network::Net;
use crate::train::{Metric, NetTrain};

fn regression_data() -> (Array2<f32>, Array2<f32>) {
    let samples = array![[-1.0], [-0.6], [-0.2], [0.2], [0.6], [1.0]];
    let truth = samples.mapv(|x| x * x);
    (samples, truth)
}

fn reference_net() -> Net {
    NetBuilder::new()
        .add_dense(1, 4, Activation::Tanh)
        .named("DenseAndBias", 4, 1)
        .build()
        .unwrap()
}

fn reference_train(epochs: usize) -> NetTrain {
    let (samples, truth) = regression_data();
    let mut train = NetTrain::new();
    train.set_learning_rate(Some(0.01));
    train.set_epochs(epochs);
    train.set_train_data(samples, truth);
    train
}

fn meta(nb_threads: usize, epochs: usize) -> MetaOptimizer {
    let mut meta = MetaOptimizer::new();
    meta.set_net(&reference_net());
    meta.set_train(&reference_train(epochs));
    meta.set_nb_threads(nb_threads);
    meta.set_seed(2024);
    meta
}

#[test]
fn test_one_run_per_thread_without_variations() {
    let report = meta(4, 15).run().unwrap();

    assert_eq!(report.runs.len(), 4);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.runs.iter().map(|run| run.job).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert!(report.runs.iter().all(|run| run.variation.is_none()));

    // every run starts from its own weights
    let first_losses: Vec<f32> = report
        .runs
        .iter()
        .map(|run| run.result.as_ref().unwrap().loss[0])
        .collect();
    assert!(first_losses.iter().any(|&l| l != first_losses[0]));

    let best = report.best().unwrap();
    let best_loss = best.metric().unwrap().value();
    assert!(report
        .runs
        .iter()
        .all(|run| run.metric().unwrap().value() >= best_loss));
    assert!(report.best_net.is_some());
}

#[test]
fn test_jobs_are_spread_round_robin() {
    let mut optimizer = meta(3, 2);
    optimizer.add_variation(7, Variation::learning_rate(0.05));
    let report = optimizer.run().unwrap();

    assert_eq!(report.runs.len(), 7);
    for run in &report.runs {
        assert_eq!(run.thread, run.job % 3);
        assert_eq!(run.variation.as_deref(), Some("learning_rate=0.05"));
    }
}

#[test]
fn test_better_solution_callback_is_serialized() {
    let mut optimizer = meta(4, 10);
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let metrics = Arc::new(Mutex::new(Vec::new()));
    {
        let inside = Arc::clone(&inside);
        let overlaps = Arc::clone(&overlaps);
        let metrics = Arc::clone(&metrics);
        optimizer.set_better_solution_callback(move |_train, net, result| {
            if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            assert_eq!(net.output_size(), 1);
            metrics.lock().unwrap().push(result.metric().unwrap());
            thread::sleep(Duration::from_millis(20));
            inside.fetch_sub(1, Ordering::SeqCst);
        });
    }
    optimizer.add_variation(8, Variation::learning_rate(0.02));
    let report = optimizer.run().unwrap();

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    let metrics = metrics.lock().unwrap();
    assert!(!metrics.is_empty());
    for pair in metrics.windows(2) {
        assert!(pair[1].improves_on(&pair[0]));
    }
    assert_eq!(metrics.last().copied(), report.best().and_then(|run| run.metric()));
}

#[test]
fn test_failing_runs_are_recorded() {
    let mut optimizer = meta(2, 5);
    optimizer.add_variation(
        2,
        Variation::new("broken", |_net| Err(MetisError::Training("cannot vary".to_string()))),
    );
    optimizer.add_variation(1, Variation::new("panicking", |_net| panic!("variation blew up")));
    optimizer.add_variation(2, Variation::activation(Activation::Relu));

    let report = optimizer.run().unwrap();
    assert_eq!(report.runs.len(), 5);
    assert_eq!(report.failures(), 3);
    assert_eq!(
        report.runs[2].result,
        Err(MetisError::Training("variation blew up".to_string()))
    );
    let best = report.best().unwrap();
    assert_eq!(best.variation.as_deref(), Some("Relu"));
    assert!(best.is_ok());
}

#[test]
fn test_activation_variation_changes_the_net() {
    let variation = Variation::activation(Activation::Sigmoid);
    assert_eq!(variation.name(), "Sigmoid");

    let mut net = reference_net();
    let mut train = NetTrain::new();
    variation.apply(&mut net, &mut train).unwrap();
    assert_eq!(net.layer(1).unwrap().type_name(), "Sigmoid");

    let mut no_activation = Net::new();
    no_activation.add_layer("Dense", 1, 1).unwrap();
    assert!(variation.apply(&mut no_activation, &mut train).is_err());
}

#[test]
fn test_seeded_search_is_reproducible() {
    let first = meta(3, 8).run().unwrap();
    let second = meta(3, 8).run().unwrap();
    let seeds = |report: &crate::meta_optimizer::MetaReport| {
        report.runs.iter().map(|run| run.seed).collect::<Vec<_>>()
    };
    assert_eq!(seeds(&first), seeds(&second));
    for (a, b) in first.runs.iter().zip(second.runs.iter()) {
        assert_eq!(a.result, b.result);
    }
    assert_eq!(first.best_run, second.best_run);
}

#[test]
fn test_run_requires_net_and_data() {
    let empty = MetaOptimizer::new();
    assert!(empty.run().is_err());

    let mut no_data = MetaOptimizer::new();
    no_data.set_net(&reference_net());
    no_data.set_train(&NetTrain::new());
    assert!(matches!(no_data.run(), Err(MetisError::Training(_))));
}

#[test]
fn test_runs_share_weights_without_reinit() {
    let mut optimizer = meta(3, 4);
    optimizer.set_reinit_weights(false);
    let report = optimizer.run().unwrap();

    // same starting weights: the first epoch loss only differs by summation order
    let first_losses: Vec<f32> = report
        .runs
        .iter()
        .map(|run| run.result.as_ref().unwrap().loss[0])
        .collect();
    for loss in &first_losses {
        assert!((loss - first_losses[0]).abs() <= 1e-5 * first_losses[0].abs().max(1.0));
    }
    assert!(matches!(report.best().and_then(|run| run.metric()), Some(Metric::Loss(_))));
}

/// Train-mode dropout output of every worker's clone on a row of ones
fn worker_dropout_masks(reinit_weights: bool) -> Vec<Array2<f32>> {
    let net = NetBuilder::new()
        .add_dense(1, 32, Activation::Tanh)
        .add_dropout(32, 0.5)
        .named("DenseAndBias", 32, 1)
        .build()
        .unwrap();
    let masks = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&masks);

    let mut optimizer = MetaOptimizer::new();
    optimizer.set_net(&net);
    optimizer.set_train(&reference_train(2));
    optimizer.set_nb_threads(3);
    optimizer.set_seed(99);
    optimizer.set_reinit_weights(reinit_weights);
    optimizer.add_variation(
        3,
        Variation::new("record dropout", move |net| {
            let mut dropout = net.layer(2).unwrap().clone_box();
            dropout.set_train_mode(true);
            let output = dropout.forward(Array2::ones((1, 32)).view());
            recorded.lock().unwrap().push(output);
            Ok(())
        }),
    );
    let report = optimizer.run().unwrap();
    assert_eq!(report.failures(), 0);

    let mut seeds: Vec<u64> = report.runs.iter().map(|run| run.seed).collect();
    seeds.sort_unstable();
    seeds.dedup();
    assert_eq!(seeds.len(), 3);

    let drawn = masks.lock().unwrap().clone();
    drawn
}

#[test]
fn test_workers_draw_independent_dropout_masks() {
    for reinit_weights in [true, false] {
        let masks = worker_dropout_masks(reinit_weights);
        assert_eq!(masks.len(), 3);
        for i in 0..masks.len() {
            for j in i + 1..masks.len() {
                assert_ne!(masks[i], masks[j], "reinit_weights = {}", reinit_weights);
            }
        }
    }
}
