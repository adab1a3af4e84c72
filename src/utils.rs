use ndarray::{ArrayBase, ArrayView1, DataMut, Dimension};

/// A trait to replace all elements in a container with zeros.
pub trait ZeroOut {
    fn zero_out(&mut self);
}

impl<S, D> ZeroOut for ArrayBase<S, D>
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    fn zero_out(&mut self) {
        self.fill(0.0);
    }
}

/// Computes the summed squared error between `actual` and `expected`.
pub fn squared_error(actual: ArrayView1<f64>, expected: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(actual.len(), expected.len());
    actual
        .iter()
        .zip(expected)
        .map(|(a, e)| (a - e) * (a - e))
        .sum()
}
