use ndarray::{array, Array2};
use crate::loss::{
    create_loss, list_loss_available, BinaryCrossEntropyLoss, CrossEntropyLoss, HuberLoss, Loss,
    MAE, MSE,
};

fn check_gradient(loss: &dyn Loss, predicted: Array2<f32>, target: Array2<f32>) {
    let analytic = loss.gradient(predicted.view(), target.view());
    let h = 1e-3;
    for i in 0..predicted.nrows() {
        for j in 0..predicted.ncols() {
            let mut plus = predicted.clone();
            plus[[i, j]] += h;
            let mut minus = predicted.clone();
            minus[[i, j]] -= h;
            let numeric = (loss.compute(plus.view(), target.view())
                - loss.compute(minus.view(), target.view()))
                / (2.0 * h);
            assert!(
                (numeric - analytic[[i, j]]).abs() < 1e-2,
                "{} d/dp[{},{}]: numeric {} analytic {}",
                loss.name(), i, j, numeric, analytic[[i, j]]
            );
        }
    }
}

#[test]
fn test_mse_sums_over_samples() {
    let predicted = array![[1.0, 2.0], [0.0, 0.0]];
    let target = array![[0.0, 2.0], [1.0, 1.0]];
    // per sample: (1 + 0) / 2 and (1 + 1) / 2
    assert!((MSE.compute(predicted.view(), target.view()) - 1.5).abs() < 1e-6);
    assert_eq!(MSE.gradient(predicted.view(), target.view()), array![[1.0, 0.0], [-1.0, -1.0]]);
}

#[test]
fn test_mae() {
    let predicted = array![[2.0], [-1.0]];
    let target = array![[0.0], [0.0]];
    assert!((MAE.compute(predicted.view(), target.view()) - 3.0).abs() < 1e-6);
    assert_eq!(MAE.gradient(predicted.view(), target.view()), array![[1.0], [-1.0]]);
}

#[test]
fn test_huber_switches_to_linear() {
    let huber = HuberLoss::new(1.0);
    let target = array![[0.0, 0.0]];
    let loss = huber.compute(array![[0.5, 3.0]].view(), target.view());
    // (0.125 + 2.5) / 2
    assert!((loss - 1.3125).abs() < 1e-6);
    assert_eq!(huber.gradient(array![[0.5, 3.0]].view(), target.view()), array![[0.25, 0.5]]);
}

#[test]
fn test_cross_entropy() {
    let predicted = array![[0.7, 0.2, 0.1]];
    let target = array![[1.0, 0.0, 0.0]];
    let loss = CrossEntropyLoss.compute(predicted.view(), target.view());
    assert!((loss + 0.7_f32.ln()).abs() < 1e-6);

    // a zero probability on the true class stays finite
    let loss = CrossEntropyLoss.compute(array![[0.0, 1.0]].view(), array![[1.0, 0.0]].view());
    assert!(loss.is_finite() && loss > 10.0);
    assert!(CrossEntropyLoss
        .gradient(array![[0.0, 1.0]].view(), array![[1.0, 0.0]].view())
        .iter()
        .all(|g| g.is_finite()));
}

#[test]
fn test_binary_cross_entropy_is_clamped() {
    let loss =
        BinaryCrossEntropyLoss.compute(array![[1.0], [0.0]].view(), array![[0.0], [1.0]].view());
    assert!(loss.is_finite());
    let perfect =
        BinaryCrossEntropyLoss.compute(array![[1.0], [0.0]].view(), array![[1.0], [0.0]].view());
    assert!(perfect < 1e-5);
}

#[test]
fn test_gradients_match_finite_differences() {
    let predicted = array![[0.3, 0.6, 0.1], [0.2, 0.25, 0.55]];
    let target = array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
    for name in list_loss_available() {
        let loss = create_loss(name).unwrap();
        check_gradient(loss.as_ref(), predicted.clone(), target.clone());
    }
}

#[test]
fn test_create_loss_by_name() {
    for name in list_loss_available() {
        assert_eq!(create_loss(name).unwrap().name(), name);
    }
    assert_eq!(create_loss("MeanSquareError").unwrap().name(), "MeanSquaredError");
    assert!(create_loss("Hinge").is_none());

    let boxed = create_loss("Huber").unwrap();
    let copy = boxed.clone();
    assert_eq!(copy.name(), "Huber");
}
