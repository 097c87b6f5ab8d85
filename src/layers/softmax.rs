use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::snapshot::LayerSnapshot;
use super::traits::Layer;

/// Row-wise softmax, usually the last layer of a categorical classifier.
#[derive(Clone, Debug, Default)]
pub struct SoftmaxLayer;

impl SoftmaxLayer {
    pub fn new() -> Self {
        SoftmaxLayer
    }
}

impl Layer for SoftmaxLayer {
    fn type_name(&self) -> &'static str {
        "Softmax"
    }

    fn input_size(&self) -> usize {
        0
    }

    fn output_size(&self) -> usize {
        0
    }

    fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let mut output = input.to_owned();
        for mut row in output.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }
        output
    }

    fn backpropagation(
        &mut self,
        input: ArrayView2<f32>,
        gradient_out: ArrayView2<f32>,
    ) -> Array2<f32> {
        let output = self.forward(input);
        let mut gradient_in = Array2::zeros(output.dim());
        Zip::from(gradient_in.rows_mut())
            .and(output.rows())
            .and(gradient_out.rows())
            .for_each(|mut gradient_row, y, g| {
                let dot = y.dot(&g);
                Zip::from(&mut gradient_row)
                    .and(&y)
                    .and(&g)
                    .for_each(|d, &yi, &gi| *d = yi * (gi - dot));
            });
        gradient_in
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Softmax
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
