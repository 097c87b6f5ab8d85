use ndarray::{array, Array2};
use crate::optimizer::{
    list_optimizer_available, Adagrad, Adam, Momentum, Nadam, Nesterov, Optimizer,
    OptimizerWrapper, RMSProp, SGD,
};

fn assert_close(actual: &Array2<f32>, expected: &Array2<f32>, tolerance: f32) {
    assert_eq!(actual.dim(), expected.dim());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < tolerance, "expected {:?}, got {:?}", expected, actual);
    }
}

#[test]
fn test_sgd_update_weights() {
    let mut sgd = SGD::new();
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.1, 0.2], [0.3, 0.4]];

    sgd.optimize(&mut weights, &gradients);

    assert_close(&weights, &array![[0.999, 0.998], [0.997, 0.996]], 1e-6);
}

#[test]
fn test_sgd_decay() {
    let mut sgd = SGD::new();
    sgd.set_params(None, Some(1.0), None);
    let mut weights = array![[1.0]];
    let gradient = array![[1.0]];

    sgd.optimize(&mut weights, &gradient);
    assert_close(&weights, &array![[0.99]], 1e-6);
    sgd.optimize(&mut weights, &gradient);
    assert_close(&weights, &array![[0.985]], 1e-6);

    // init restarts the decay schedule
    sgd.init();
    sgd.optimize(&mut weights, &gradient);
    assert_close(&weights, &array![[0.975]], 1e-6);
}

#[test]
fn test_momentum_accumulates_velocity() {
    let mut momentum = Momentum::new();
    let mut weights = array![[1.0]];
    let gradient = array![[1.0]];

    momentum.optimize(&mut weights, &gradient);
    assert_close(&weights, &array![[0.99]], 1e-6);
    momentum.optimize(&mut weights, &gradient);
    assert_close(&weights, &array![[0.971]], 1e-6);
}

#[test]
fn test_nesterov_first_step() {
    let mut nesterov = Nesterov::new();
    let mut weights = array![[1.0, -1.0]];
    nesterov.optimize(&mut weights, &array![[1.0, -1.0]]);
    assert_close(&weights, &array![[0.981, -0.981]], 1e-6);
}

#[test]
fn test_adam_first_step_is_learning_rate_sized() {
    let mut adam = Adam::new();
    let mut weights = array![[0.5, 0.5, 0.5]];
    adam.optimize(&mut weights, &array![[3.0, -0.2, 0.0]]);
    assert_close(&weights, &array![[0.499, 0.501, 0.5]], 1e-5);
}

#[test]
fn test_adaptive_first_steps() {
    let gradient = array![[2.0, -0.5]];

    let mut weights = array![[0.0, 0.0]];
    Adagrad::new().optimize(&mut weights, &gradient);
    assert_close(&weights, &array![[-0.01, 0.01]], 1e-5);

    let mut weights = array![[0.0, 0.0]];
    RMSProp::new().optimize(&mut weights, &gradient);
    let step = 0.001 / 0.1_f32.sqrt();
    assert_close(&weights, &array![[-step, step]], 1e-5);

    let mut weights = array![[0.0, 0.0]];
    Nadam::new().optimize(&mut weights, &gradient);
    let step = 0.002 * (0.09 / 0.19 + 1.0);
    assert_close(&weights, &array![[-step, step]], 1e-5);
}

#[test]
fn test_init_resets_state() {
    let gradient = array![[1.0, -2.0]];
    let mut fresh_weights = array![[0.0, 0.0]];
    Adam::new().optimize(&mut fresh_weights, &gradient);

    let mut adam = Adam::new();
    let mut weights = array![[0.0, 0.0]];
    for _ in 0..5 {
        adam.optimize(&mut weights, &array![[-3.0, 0.7]]);
    }
    adam.init();
    let mut reset_weights = array![[0.0, 0.0]];
    adam.optimize(&mut reset_weights, &gradient);
    assert_close(&reset_weights, &fresh_weights, 1e-7);
}

#[test]
fn test_state_follows_tensor_shape() {
    let mut momentum = Momentum::new();
    let mut small = array![[1.0]];
    momentum.optimize(&mut small, &array![[1.0]]);

    let mut wide = Array2::ones((2, 3));
    momentum.optimize(&mut wide, &Array2::ones((2, 3)));
    assert_close(&wide, &Array2::from_elem((2, 3), 0.99), 1e-6);
}

#[test]
fn test_set_params() {
    let mut optimizer = OptimizerWrapper::create("Momentum").unwrap();
    optimizer.set_params(Some(0.1), None, Some(0.0));
    let mut weights = array![[1.0]];
    optimizer.optimize(&mut weights, &array![[1.0]]);
    optimizer.optimize(&mut weights, &array![[1.0]]);
    assert_close(&weights, &array![[0.8]], 1e-6);

    // None keeps the default
    let mut sgd = SGD::new();
    sgd.set_params(None, None, Some(0.5));
    assert_eq!(sgd.learning_rate, 0.01);

    let mut rmsprop = RMSProp::new();
    rmsprop.set_params(None, None, Some(0.5));
    assert_eq!(rmsprop.rho, 0.5);

    let mut adam = Adam::new();
    adam.set_params(Some(0.01), Some(0.1), Some(0.8));
    assert_eq!((adam.learning_rate, adam.decay, adam.beta1), (0.01, 0.1, 0.8));
}

#[test]
fn test_create_by_name() {
    for name in list_optimizer_available() {
        let optimizer = OptimizerWrapper::create(name).unwrap();
        assert_eq!(optimizer.name(), name);
    }
    assert_eq!(list_optimizer_available().len(), 7);
    assert!(OptimizerWrapper::create("LBFGS").is_none());
}

#[test]
fn test_wrapper_clone_is_independent() {
    let mut original = OptimizerWrapper::create("Adam").unwrap();
    let mut weights = array![[0.0]];
    original.optimize(&mut weights, &array![[1.0]]);

    let mut copy = original.clone();
    let mut a = array![[0.0]];
    let mut b = array![[0.0]];
    original.optimize(&mut a, &array![[1.0]]);
    copy.optimize(&mut b, &array![[1.0]]);
    assert_eq!(a, b);
}
