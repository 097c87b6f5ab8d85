//! Small helpers on top of `ndarray` used by the training loop.
//!
//! Rows are samples, columns are features. Everything here works on
//! `Array2<f32>` so that label columns, one-hot truth and network outputs
//! share one representation.

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

/// Index of the largest value in a row. The first maximum wins on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

/// Expand a single label column into a one-hot matrix with `nb_class` columns.
///
/// Labels are rounded to the nearest integer; labels outside `0..nb_class`
/// produce an all-zero row.
pub fn labels_to_one_hot(labels: ArrayView2<f32>, nb_class: usize) -> Array2<f32> {
    let mut one_hot = Array2::zeros((labels.nrows(), nb_class));
    for (i, label) in labels.column(0).iter().enumerate() {
        let class = label.round();
        if class >= 0.0 && (class as usize) < nb_class {
            one_hot[[i, class as usize]] = 1.0;
        }
    }
    one_hot
}

/// Random permutation of `0..n`.
pub fn rand_perm<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices
}

/// Row `i` of the result is row `permutation[i]` of `m`.
pub fn apply_row_permutation(permutation: &[usize], m: ArrayView2<f32>) -> Array2<f32> {
    m.select(Axis(0), permutation)
}

/// Copy of rows `start..end`.
pub fn row_range(m: ArrayView2<f32>, start: usize, end: usize) -> Array2<f32> {
    m.slice(s![start..end, ..]).to_owned()
}

/// True when every value of a single-column matrix is a non-negative integer.
pub fn is_label_column(m: ArrayView2<f32>) -> bool {
    m.ncols() == 1 && m.iter().all(|&v| v >= 0.0 && v.fract() == 0.0)
}

/// True when every row holds zeros and exactly one 1.
pub fn is_one_hot(m: ArrayView2<f32>) -> bool {
    m.ncols() > 1
        && m.rows().into_iter().all(|row| {
            row.iter().all(|&v| v == 0.0 || v == 1.0) && row.sum() == 1.0
        })
}
