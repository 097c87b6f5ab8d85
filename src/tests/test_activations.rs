use ndarray::array;
use crate::activations::{list_activation_available, Activation};

fn all_activations() -> Vec<Activation> {
    Activation::NAMES
        .iter()
        .map(|name| Activation::from_name(name).unwrap())
        .collect()
}

#[test]
fn test_relu_batch() {
    let mut data = array![[1.0, -1.0], [0.0, 3.5]];
    Activation::Relu.apply_batch(&mut data);
    assert_eq!(data, array![[1.0, 0.0], [0.0, 3.5]]);
}

#[test]
fn test_sigmoid_and_tanh_values() {
    assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-6);
    assert!((Activation::Tanh.apply(0.0)).abs() < 1e-6);
    assert!((Activation::Sigmoid.derivative(0.0) - 0.25).abs() < 1e-6);
    assert!((Activation::Tanh.derivative(0.0) - 1.0).abs() < 1e-6);
}

#[test]
fn test_leaky_relu_and_elu() {
    let leaky = Activation::LeakyRelu { alpha: 0.1 };
    assert!((leaky.apply(-2.0) + 0.2).abs() < 1e-6);
    assert_eq!(leaky.derivative(-2.0), 0.1);

    let elu = Activation::Elu { alpha: 1.0 };
    assert!((elu.apply(-1.0) - ((-1.0f32).exp() - 1.0)).abs() < 1e-6);
    assert_eq!(elu.apply(2.0), 2.0);
}

#[test]
fn test_softplus_is_stable() {
    assert!(Activation::Softplus.apply(100.0).is_finite());
    assert!((Activation::Softplus.apply(100.0) - 100.0).abs() < 1e-3);
    assert!(Activation::Softplus.apply(-100.0) >= 0.0);
}

#[test]
fn test_derivatives_match_finite_differences() {
    let h = 1e-3;
    for activation in all_activations() {
        for &x in &[-1.7f32, -0.4, 0.3, 0.8, 1.6] {
            let numeric = (activation.apply(x + h) - activation.apply(x - h)) / (2.0 * h);
            let analytic = activation.derivative(x);
            assert!(
                (numeric - analytic).abs() < 1e-2,
                "{} at {}: numeric {} analytic {}",
                activation.name(), x, numeric, analytic
            );
        }
    }
}

#[test]
fn test_derivative_batch_uses_input() {
    let input = array![[-1.0, 2.0]];
    let derivative = Activation::Relu.derivative_batch(input.view());
    assert_eq!(derivative, array![[0.0, 1.0]]);
}

#[test]
fn test_names_round_trip() {
    for activation in all_activations() {
        assert_eq!(Activation::from_name(activation.name()), Some(activation));
    }
    assert_eq!(Activation::from_name("SiLU"), Some(Activation::Swish));
    assert_eq!(Activation::from_name("Unknown"), None);
    assert_eq!(list_activation_available().len(), 15);
}
