use std::sync::{Arc, Mutex};

use ndarray::{array, Array2};

use crate::activations::Activation;
use crate::builders::NetBuilder;
use crate::error::MetisError;
use crate::layers::SoftmaxLayer;
use crate::network::Net;
use crate::train::{Metric, NetTrain, ProblemKind, TrainConfig};

/// y = 2x + 1 on a few points
fn linear_data() -> (Array2<f32>, Array2<f32>) {
    let samples = array![[-1.0], [-0.5], [0.0], [0.5], [1.0], [1.5], [-1.5], [0.25]];
    let truth = samples.mapv(|x| 2.0 * x + 1.0);
    (samples, truth)
}

fn linear_net() -> Net {
    let mut net = Net::new();
    net.add_layer("DenseAndBias", 1, 1).unwrap();
    net
}

fn sgd_trainer(learning_rate: f32, epochs: usize, batch_size: usize) -> NetTrain {
    let mut train = NetTrain::new();
    train.set_optimizer("SGD").unwrap();
    train.set_learning_rate(Some(learning_rate));
    train.set_epochs(epochs);
    train.set_batch_size(batch_size).unwrap();
    train.set_seed(7);
    train
}

/// Three well separated clusters, one label per sample
fn cluster_data() -> (Array2<f32>, Array2<f32>) {
    let samples = array![
        [-2.0, 0.0], [-2.2, 0.3], [-1.8, -0.2],
        [2.0, 0.0], [2.1, -0.3], [1.9, 0.2],
        [0.0, 3.0], [0.3, 2.8], [-0.2, 3.1]
    ];
    let labels = array![[0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [2.0], [2.0], [2.0]];
    (samples, labels)
}

#[test]
fn test_linear_regression_converges() {
    let (samples, truth) = linear_data();
    let mut net = linear_net();
    let mut train = sgd_trainer(0.1, 200, 4);

    let result = train.train(&mut net, samples.view(), truth.view()).unwrap();

    assert_eq!(result.epochs, 200);
    assert_eq!(result.loss.len(), 200);
    assert!(!result.classification);
    assert!(result.accuracy.is_empty());
    assert!(result.final_loss().unwrap() < result.loss[0]);
    assert!(train.compute_loss(&net, samples.view(), truth.view()).unwrap() < 1e-3);

    let weights = net.layer(0).unwrap().weights().unwrap();
    assert!((weights[[0, 0]] - 2.0).abs() < 0.05);
}

#[test]
fn test_classification_from_label_column() {
    let (samples, labels) = cluster_data();
    let mut net = NetBuilder::new()
        .named("DenseAndBias", 2, 3)
        .layer(Box::new(SoftmaxLayer::new()))
        .build()
        .unwrap();
    let mut train = NetTrain::new();
    train.set_loss("CrossEntropy").unwrap();
    train.set_learning_rate(Some(0.05));
    train.set_epochs(150);
    train.set_batch_size(9).unwrap();
    train.set_keep_best(false);
    train.set_seed(1);

    let result = train.train(&mut net, samples.view(), labels.view()).unwrap();

    assert!(result.classification);
    assert_eq!(result.accuracy.len(), 150);
    assert_eq!(result.metric(), Some(Metric::Accuracy(100.0)));
    assert_eq!(net.classify_all(samples.view()), vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
    assert_eq!(train.compute_accuracy(&net, samples.view(), labels.view()).unwrap(), 100.0);
}

#[test]
fn test_problem_kind_override() {
    let (samples, labels) = cluster_data();
    let mut net = NetBuilder::new().named("DenseAndBias", 2, 3).build().unwrap();
    let mut train = sgd_trainer(0.01, 3, 4);
    train.set_problem(ProblemKind::Regression);

    let result = train.train(&mut net, samples.view(), labels.view()).unwrap();
    assert!(!result.classification);
    assert!(result.accuracy.is_empty());
    assert_eq!(result.metric().map(|m| matches!(m, Metric::Loss(_))), Some(true));
}

#[test]
fn test_keep_best_restores_best_epoch() {
    let (samples, truth) = linear_data();
    let initial = linear_net();

    // far too large a step: every epoch is worse than the previous one
    let mut diverging = initial.clone();
    let mut train = sgd_trainer(5.0, 10, 8);
    let result = train.train(&mut diverging, samples.view(), truth.view()).unwrap();
    assert_eq!(result.best_epoch, Some(0));
    assert!(result.loss[9] > result.loss[0]);

    let mut one_epoch = initial.clone();
    let mut train = sgd_trainer(5.0, 1, 8);
    train.set_keep_best(false);
    train.train(&mut one_epoch, samples.view(), truth.view()).unwrap();
    assert_eq!(diverging.forward(samples.view()), one_epoch.forward(samples.view()));

    let mut last = initial.clone();
    let mut train = sgd_trainer(5.0, 10, 8);
    train.set_keep_best(false);
    let result = train.train(&mut last, samples.view(), truth.view()).unwrap();
    assert_eq!(result.best_epoch, None);
    assert_ne!(last.forward(samples.view()), one_epoch.forward(samples.view()));
}

#[test]
fn test_reboost_resets_optimizer_state() {
    let (samples, truth) = linear_data();
    let initial = linear_net();

    // momentum whose velocity is reset before every step behaves like SGD
    let mut reboosted = initial.clone();
    let mut train = sgd_trainer(0.05, 5, 8);
    train.set_optimizer("Momentum").unwrap();
    train.set_keep_best(false);
    train.set_reboost_every_epochs(Some(1)).unwrap();
    train.train(&mut reboosted, samples.view(), truth.view()).unwrap();

    let mut plain = initial.clone();
    let mut train = sgd_trainer(0.05, 5, 8);
    train.set_keep_best(false);
    train.train(&mut plain, samples.view(), truth.view()).unwrap();

    let a = reboosted.forward(samples.view());
    let b = plain.forward(samples.view());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-5);
    }

    let mut with_momentum = initial.clone();
    let mut train = sgd_trainer(0.05, 5, 8);
    train.set_optimizer("Momentum").unwrap();
    train.set_keep_best(false);
    train.train(&mut with_momentum, samples.view(), truth.view()).unwrap();
    assert_ne!(with_momentum.forward(samples.view()), b);
}

#[test]
fn test_epoch_callback() {
    let (samples, truth) = linear_data();
    let mut net = linear_net();
    let mut train = sgd_trainer(0.05, 7, 3);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    train.set_epoch_callback(move |train| {
        sink.lock().unwrap().push((train.current_epoch(), train.current_loss()));
    });
    let result = train.train(&mut net, samples.view(), truth.view()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.iter().map(|(epoch, _)| *epoch).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 7]);
    let losses: Vec<f32> = seen.iter().map(|(_, loss)| *loss).collect();
    assert_eq!(losses, result.loss);
    assert_eq!(train.current_epoch(), 7);
}

#[test]
fn test_validation_tracking() {
    let (samples, truth) = linear_data();
    let mut net = linear_net();
    let mut train = sgd_trainer(0.1, 20, 4);
    train.set_validation_data(array![[2.0], [-2.0]], array![[5.0], [-3.0]]);

    let result = train.train(&mut net, samples.view(), truth.view()).unwrap();
    assert_eq!(result.validation_loss.len(), 20);
    assert!(result.validation_accuracy.is_empty());
    assert_eq!(train.current_validation_loss(), result.validation_loss.last().copied());
    assert_eq!(result.metric(), result.epoch_metric(result.best_epoch.unwrap()));
    assert_eq!(
        result.metric(),
        Some(Metric::Loss(result.validation_loss[result.best_epoch.unwrap()]))
    );
}

#[test]
fn test_train_on_data() {
    let (samples, truth) = linear_data();
    let mut net = linear_net();
    let mut train = sgd_trainer(0.1, 5, 4);
    assert!(matches!(train.train_on_data(&mut net), Err(MetisError::Training(_))));

    train.set_train_data(samples, truth);
    assert!(train.has_train_data());
    let result = train.train_on_data(&mut net).unwrap();
    assert_eq!(result.epochs, 5);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let (samples, truth) = linear_data();
    let initial = linear_net();
    let mut a = initial.clone();
    let mut b = initial.clone();

    let result_a = sgd_trainer(0.05, 10, 3).train(&mut a, samples.view(), truth.view()).unwrap();
    let result_b = sgd_trainer(0.05, 10, 3).train(&mut b, samples.view(), truth.view()).unwrap();
    assert_eq!(result_a, result_b);
    assert_eq!(a.forward(samples.view()), b.forward(samples.view()));
}

#[test]
fn test_batch_larger_than_data() {
    let (samples, truth) = linear_data();
    let mut net = linear_net();
    let mut train = sgd_trainer(0.1, 3, 1000);
    let result = train.train(&mut net, samples.view(), truth.view()).unwrap();
    assert_eq!(result.loss.len(), 3);
}

#[test]
fn test_dropout_net_trains() {
    let (samples, truth) = linear_data();
    let mut net = NetBuilder::new()
        .add_dense(1, 8, Activation::Tanh)
        .add_dropout(8, 0.2)
        .named("DenseAndBias", 8, 1)
        .build()
        .unwrap();
    let mut train = NetTrain::new();
    train.set_learning_rate(Some(0.01));
    train.set_epochs(30);
    train.set_seed(3);
    let result = train.train(&mut net, samples.view(), truth.view()).unwrap();
    assert!(result.loss.iter().all(|l| l.is_finite()));
    assert!(!net.is_train_mode());
}

#[test]
fn test_setters_validate() {
    let mut train = NetTrain::new();
    assert!(matches!(train.set_optimizer("LBFGS"), Err(MetisError::UnknownName { .. })));
    assert!(matches!(train.set_loss("Hinge"), Err(MetisError::UnknownName { .. })));
    assert!(train.set_batch_size(0).is_err());
    assert!(train.set_reboost_every_epochs(Some(0)).is_err());
    assert_eq!(train.optimizer(), "Adam");
    assert_eq!(train.loss(), "MeanSquaredError");
    assert_eq!(train.batch_size(), 16);

    train.set_reboost_every_epochs(Some(10)).unwrap();
    assert_eq!(train.reboost_every_epochs(), Some(10));
    train.set_momentum(Some(0.5));
    train.set_decay(Some(0.01));
    assert_eq!((train.momentum(), train.decay()), (Some(0.5), Some(0.01)));
}

#[test]
fn test_write_read_config() {
    let mut train = NetTrain::new();
    train.set_optimizer("Nesterov").unwrap();
    train.set_loss("Huber").unwrap();
    train.set_epochs(42);
    train.set_learning_rate(Some(0.02));
    train.set_seed(99);

    let restored = NetTrain::read(&train.write().unwrap()).unwrap();
    assert_eq!(restored.config(), train.config());
    assert_eq!(restored.loss(), "Huber");
    assert!(!restored.has_train_data());

    let mut config = TrainConfig::default();
    config.loss = "Nope".to_string();
    assert!(NetTrain::with_config(config).is_err());
}

#[test]
fn test_single_output_accuracy_keeps_negative_predictions() {
    let mut net = Net::new();
    net.add_layer("Dense", 1, 1).unwrap();
    if let Some((weights, _)) = net.layer_mut(0).unwrap().weights_and_gradient_mut() {
        weights.fill(-0.6);
    }
    let samples = array![[1.0]];
    let mut train = NetTrain::new();
    train.set_problem(ProblemKind::Classification);

    // -0.6 rounds to -1, which is not label 0
    let accuracy = train.compute_accuracy(&net, samples.view(), array![[0.0]].view()).unwrap();
    assert_eq!(accuracy, 0.0);
    let accuracy = train.compute_accuracy(&net, samples.view(), array![[-1.0]].view()).unwrap();
    assert_eq!(accuracy, 100.0);

    // the class index itself stays in range
    assert_eq!(net.classify(samples.row(0)), 0);
}

#[test]
fn test_single_output_accuracy_compares_raw_truth() {
    let mut net = Net::new();
    net.add_layer("Dense", 1, 1).unwrap();
    if let Some((weights, _)) = net.layer_mut(0).unwrap().weights_and_gradient_mut() {
        weights.fill(1.0);
    }
    let samples = array![[0.9], [0.2], [0.4]];
    let mut train = NetTrain::new();
    train.set_problem(ProblemKind::Classification);

    // a truth of 0.6 is not rounded up to match the prediction 1
    let accuracy = train
        .compute_accuracy(&net, samples.view(), array![[0.6], [0.0], [1.0]].view())
        .unwrap();
    assert!((accuracy - 100.0 / 3.0).abs() < 1e-4);
}
