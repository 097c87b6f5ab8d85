use ndarray::{Array2, ArrayView2};
use serde::{Serialize, Deserialize};

use crate::error::{MetisError, Result};
use crate::matrix::argmax;
use crate::network::Net;

/// Counts indexed `[true label][predicted label]` plus the overall accuracy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub matrix: Array2<usize>,
    /// Percent of samples on the diagonal
    pub accuracy: f32,
}

impl ClassificationResult {
    pub fn nb_class(&self) -> usize {
        self.matrix.nrows()
    }

    /// Matrix normalised per true class, each non-empty row summing to 100
    pub fn to_percent(&self) -> Array2<f32> {
        let mut percent = self.matrix.mapv(|count| count as f32);
        for mut row in percent.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|v| 100.0 * v / total);
            }
        }
        percent
    }
}

pub struct ConfusionMatrix;

impl ConfusionMatrix {
    /// Build the confusion matrix of two label columns.
    ///
    /// Labels are rounded to the nearest integer. With `nb_class == 0` the
    /// class count is inferred from the largest label. Labels outside the
    /// class range are clamped into it.
    pub fn compute(
        truth: ArrayView2<f32>,
        predicted: ArrayView2<f32>,
        nb_class: usize,
    ) -> Result<ClassificationResult> {
        if truth.dim() != predicted.dim() {
            return Err(MetisError::dimension_mismatch(
                format!("predicted labels of shape {:?}", truth.dim()),
                format!("{:?}", predicted.dim()),
            ));
        }
        if truth.ncols() > 1 {
            return Err(MetisError::invalid_parameter(
                "truth".to_string(),
                format!("expected a single label column, got {} columns", truth.ncols()),
            ));
        }

        let to_label = |v: f32| v.round().max(0.0) as usize;
        let nb_class = if nb_class == 0 {
            truth
                .iter()
                .chain(predicted.iter())
                .map(|&v| to_label(v))
                .max()
                .map_or(0, |max| max + 1)
        } else {
            nb_class
        };

        let mut matrix = Array2::zeros((nb_class, nb_class));
        if nb_class == 0 {
            return Ok(ClassificationResult { matrix, accuracy: 0.0 });
        }
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            let t = to_label(t).min(nb_class - 1);
            let p = to_label(p).min(nb_class - 1);
            matrix[[t, p]] += 1;
        }

        let total: usize = matrix.sum();
        let correct: usize = matrix.diag().sum();
        let accuracy = if total > 0 { 100.0 * correct as f32 / total as f32 } else { 0.0 };
        Ok(ClassificationResult { matrix, accuracy })
    }

    /// Classify `samples` with `net` and compare against `truth` (label column or one-hot)
    pub fn evaluate(
        net: &Net,
        samples: ArrayView2<f32>,
        truth: ArrayView2<f32>,
    ) -> Result<ClassificationResult> {
        let truth_labels: Array2<f32> = if truth.ncols() > 1 {
            Array2::from_shape_fn((truth.nrows(), 1), |(i, _)| argmax(truth.row(i)) as f32)
        } else {
            truth.to_owned()
        };
        let predicted = net.classify_all(samples);
        let predicted = Array2::from_shape_fn((predicted.len(), 1), |(i, _)| predicted[i] as f32);
        let nb_class = if net.output_size() > 1 { net.output_size() } else { 0 };
        Self::compute(truth_labels.view(), predicted.view(), nb_class)
    }
}
