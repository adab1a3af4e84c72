use crate::activator::Activator;
use crate::error::check_len;
use crate::layers::{glorot_bound, Batch, Layer, Paradigm};
use crate::matrix::{Mat, Vector};
use crate::utils::ZeroOut;
use crate::{Error, Result};

use itertools::multizip;
use log::debug;
use ndarray::linalg::{general_mat_mul, general_mat_vec_mul};
use ndarray::{ArrayView1, Axis};
use rand::Rng;

pub const DEFAULT_LEARNING: f64 = 0.1;
pub const DEFAULT_MOMENTUM: f64 = 0.5;
pub const DEFAULT_JACOBIAN_PENALTY: f64 = 0.1;

/// A fully connected layer computing `y = f(Wx + b)`.
///
/// Besides its parameters the layer carries its whole learning state: the
/// previous parameters for momentum, the gradients accumulated over the
/// current batch, and the cached forward and backward quantities of the last
/// example.
#[derive(Clone, Debug)]
pub struct Dense {
    /// The activation function to be used for every neuron in the layer.
    activator: Activator,
    /// The network weights, with each neuron's weights stored as a row.
    weights: Mat,
    bias: Vector,
    weights_old: Mat,
    bias_old: Vector,
    weights_change: Mat,
    bias_change: Vector,
    /// Gradient of the contraction penalty accumulated over the batch.
    jacobian_weights_change: Mat,
    jacobian_bias_change: Vector,
    jacobian: Mat,
    /// The last input, as given to `charge`.
    m_in: Vector,
    /// The last pre-activation output.
    m_out: Vector,
    delta: Vector,
    m_dump_below: Vector,
    learning: f64,
    momentum: f64,
    regularizer: f64,
    jacobian_penalty: f64,
    contractive: bool,
    batch_size: usize,
    batch: Batch,
}

impl Dense {
    /// Initializes a new, untrained layer.
    ///
    /// Arguments:
    ///
    ///  * `inputs` - the number of inputs to this layer.
    ///  * `outputs` - the number of outputs from this layer.
    ///  * `activator` - the activation function to be used for this layer's
    ///                  output.
    ///  * `rng` - the engine drawing the initial weights.
    pub fn new<R>(
        inputs: usize,
        outputs: usize,
        activator: Activator,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut layer = Dense {
            activator,
            weights: Mat::zeros((outputs, inputs)),
            bias: Vector::zeros(outputs),
            weights_old: Mat::zeros((outputs, inputs)),
            bias_old: Vector::zeros(outputs),
            weights_change: Mat::zeros((outputs, inputs)),
            bias_change: Vector::zeros(outputs),
            jacobian_weights_change: Mat::zeros((outputs, inputs)),
            jacobian_bias_change: Vector::zeros(outputs),
            jacobian: Mat::zeros((outputs, inputs)),
            m_in: Vector::zeros(inputs),
            m_out: Vector::zeros(outputs),
            delta: Vector::zeros(outputs),
            m_dump_below: Vector::zeros(inputs),
            learning: DEFAULT_LEARNING,
            momentum: DEFAULT_MOMENTUM,
            regularizer: 0.0,
            jacobian_penalty: DEFAULT_JACOBIAN_PENALTY,
            contractive: false,
            batch_size: 1,
            batch: Batch::Accumulating(0),
        };
        layer.reset_weights(glorot_bound(inputs, outputs), rng);
        layer
    }

    /// Rebuilds a layer from stored parameters, with fresh learning state.
    pub(crate) fn from_parts(
        activator: Activator,
        weights: Mat,
        bias: Vector,
    ) -> Result<Self> {
        check_len("bias", bias.len(), weights.nrows())?;
        let (outputs, inputs) = weights.dim();
        Ok(Dense {
            activator,
            weights_old: weights.clone(),
            bias_old: bias.clone(),
            weights,
            bias,
            weights_change: Mat::zeros((outputs, inputs)),
            bias_change: Vector::zeros(outputs),
            jacobian_weights_change: Mat::zeros((outputs, inputs)),
            jacobian_bias_change: Vector::zeros(outputs),
            jacobian: Mat::zeros((outputs, inputs)),
            m_in: Vector::zeros(inputs),
            m_out: Vector::zeros(outputs),
            delta: Vector::zeros(outputs),
            m_dump_below: Vector::zeros(inputs),
            learning: DEFAULT_LEARNING,
            momentum: DEFAULT_MOMENTUM,
            regularizer: 0.0,
            jacobian_penalty: DEFAULT_JACOBIAN_PENALTY,
            contractive: false,
            batch_size: 1,
            batch: Batch::Accumulating(0),
        })
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn set_activator(&mut self, activator: Activator) {
        self.activator = activator;
    }

    pub fn weights(&self) -> &Mat {
        &self.weights
    }

    pub fn bias(&self) -> &Vector {
        &self.bias
    }

    pub fn learning(&self) -> f64 {
        self.learning
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn regularizer(&self) -> f64 {
        self.regularizer
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_contractive(&self) -> bool {
        self.contractive
    }

    pub fn jacobian_penalty(&self) -> f64 {
        self.jacobian_penalty
    }

    fn reshape<R>(&mut self, inputs: usize, outputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.weights = Mat::zeros((outputs, inputs));
        self.weights_old = Mat::zeros((outputs, inputs));
        self.weights_change = Mat::zeros((outputs, inputs));
        self.jacobian_weights_change = Mat::zeros((outputs, inputs));
        self.jacobian = Mat::zeros((outputs, inputs));
        self.bias = Vector::zeros(outputs);
        self.bias_old = Vector::zeros(outputs);
        self.bias_change = Vector::zeros(outputs);
        self.jacobian_bias_change = Vector::zeros(outputs);
        self.m_in = Vector::zeros(inputs);
        self.m_out = Vector::zeros(outputs);
        self.delta = Vector::zeros(outputs);
        self.m_dump_below = Vector::zeros(inputs);
        self.reset_weights(glorot_bound(inputs, outputs), rng);
    }

    /// The derivative of the activation at the last charge.
    pub fn fire_jacobian(&self) -> Vector {
        self.fire().mapv(|y| self.activator.fprime(y))
    }

    /// Caches the Jacobian `diag(f'(Wx + b)) W` at the last charge.
    pub fn charge_jacobian(&mut self) {
        let slope = self.fire_jacobian().insert_axis(Axis(1));
        self.jacobian = &self.weights * &slope;
    }

    /// The Jacobian cached by the last `charge_jacobian`.
    pub fn get_jacobian(&self) -> &Mat {
        &self.jacobian
    }

    /// The squared Frobenius norm of the cached Jacobian.
    pub fn contraction(&self) -> f64 {
        self.jacobian.iter().map(|j| j * j).sum()
    }

    /// Accumulates the gradient of `penalty * ||J||^2` where
    /// `J = diag(f'(z)) W`.
    ///
    /// Row `i` contributes `2 p (f'_i^2 W_i + f'_i f''_i |W_i|^2 x)` to the
    /// weights and `2 p f'_i f''_i |W_i|^2` to the bias.
    fn accumulate_contraction(&mut self, output: &Vector, weight: f64) {
        self.charge_jacobian();
        let scale = 2.0 * self.jacobian_penalty * weight;
        let slope = output.mapv(|y| self.activator.fprime(y));
        let curvature = output.mapv(|y| self.activator.fsecond(y));
        let row_norms = self.weights.map_axis(Axis(1), |row| row.dot(&row));

        let direct = (&slope * &slope * scale).insert_axis(Axis(1));
        self.jacobian_weights_change += &(&self.weights * &direct);

        let through_input = slope * curvature * row_norms * scale;
        general_mat_mul(
            1.0,
            &through_input.view().insert_axis(Axis(1)),
            &self.m_in.view().insert_axis(Axis(0)),
            1.0,
            &mut self.jacobian_weights_change,
        );
        self.jacobian_bias_change += &through_input;
    }

    /// Applies and resets the accumulated batch, scaling the gradient step
    /// by `scale`.
    ///
    /// The weights move by
    /// `-learning * scale * (mean gradient + regularizer * W) + momentum * (W - W_old)`,
    /// the bias likewise without the regularizer. A contractive layer uses
    /// the mean contraction gradient in place of the regularizer.
    pub fn update_weighted(&mut self, scale: f64) {
        let ctr = self.pending();
        if ctr == 0 {
            return;
        }
        self.batch = Batch::Flushing;
        debug!("flushing a batch of {} examples", ctr);

        let n = ctr as f64;
        let step = self.learning * scale;

        let mut grad_weights = &self.weights_change / n;
        let mut grad_bias = &self.bias_change / n;
        if self.contractive {
            grad_weights.scaled_add(1.0 / n, &self.jacobian_weights_change);
            grad_bias.scaled_add(1.0 / n, &self.jacobian_bias_change);
        } else if self.regularizer != 0.0 {
            grad_weights.scaled_add(self.regularizer, &self.weights);
        }

        let mut weights = &self.weights - &(grad_weights * step);
        weights.scaled_add(self.momentum, &(&self.weights - &self.weights_old));
        let mut bias = &self.bias - &(grad_bias * step);
        bias.scaled_add(self.momentum, &(&self.bias - &self.bias_old));

        self.weights_old = std::mem::replace(&mut self.weights, weights);
        self.bias_old = std::mem::replace(&mut self.bias, bias);
        self.clear_batch();
    }

    fn clear_batch(&mut self) {
        self.weights_change.zero_out();
        self.bias_change.zero_out();
        self.jacobian_weights_change.zero_out();
        self.jacobian_bias_change.zero_out();
        self.batch = Batch::Accumulating(0);
    }
}

impl Layer for Dense {
    fn paradigm(&self) -> Paradigm {
        Paradigm::Basic
    }

    fn input_len(&self) -> usize {
        self.weights.ncols()
    }

    fn output_len(&self) -> usize {
        self.weights.nrows()
    }

    fn pending(&self) -> usize {
        match self.batch {
            Batch::Accumulating(ctr) => ctr,
            Batch::Flushing => 0,
        }
    }

    /// Draws fresh weights uniformly from `[-bound, bound]`.
    ///
    /// The bias is zeroed, and any partially accumulated batch is dropped.
    fn reset_weights<R>(&mut self, bound: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let dim = self.weights.dim();
        self.weights = if bound > 0.0 {
            Mat::from_shape_simple_fn(dim, || rng.random_range(-bound..=bound))
        } else {
            Mat::zeros(dim)
        };
        self.bias.zero_out();
        self.weights_old.assign(&self.weights);
        self.bias_old.zero_out();
        self.clear_batch();
    }

    /// Changes the number of inputs, reallocating every dependent buffer
    /// and re-initializing the weights.
    ///
    /// This drops any gradient accumulated for the current batch.
    fn resize_input<R>(&mut self, inputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let outputs = self.output_len();
        self.reshape(inputs, outputs, rng);
    }

    fn resize_output<R>(&mut self, outputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let inputs = self.input_len();
        self.reshape(inputs, outputs, rng);
    }

    fn charge(&mut self, input: ArrayView1<f64>) -> Result<()> {
        check_len("layer input", input.len(), self.input_len())?;
        self.m_in.assign(&input);
        self.m_out.assign(&self.bias);
        general_mat_vec_mul(1.0, &self.weights, &input, 1.0, &mut self.m_out);
        Ok(())
    }

    fn fire(&self) -> Vector {
        self.activator.f(self.m_out.view())
    }

    fn dump_below(&self) -> &Vector {
        &self.m_dump_below
    }

    /// Once `batch_size` examples are accumulated the parameters are updated
    /// immediately.
    fn backpropagate_weighted(
        &mut self,
        error: ArrayView1<f64>,
        weight: f64,
    ) -> Result<()> {
        check_len("layer error", error.len(), self.output_len())?;
        let output = self.fire();
        for (d, e, y) in
            multizip((self.delta.iter_mut(), error.iter(), output.iter()))
        {
            *d = e * self.activator.fprime(*y);
        }

        let delta = self.delta.view().insert_axis(Axis(1));
        let input = self.m_in.view().insert_axis(Axis(0));
        general_mat_mul(weight, &delta, &input, 1.0, &mut self.weights_change);
        self.bias_change.scaled_add(weight, &self.delta);
        self.m_dump_below = self.weights.t().dot(&self.delta);

        if self.contractive {
            self.accumulate_contraction(&output, weight);
        }

        let seen = self.pending() + 1;
        self.batch = Batch::Accumulating(seen);
        if seen >= self.batch_size {
            self.update();
        }
        Ok(())
    }

    fn update(&mut self) {
        self.update_weighted(1.0);
    }

    fn set_batch_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidConfig(
                "batch size must be at least 1".to_owned(),
            ));
        }
        if self.pending() > 0 {
            self.update();
        }
        self.batch_size = size;
        Ok(())
    }

    fn set_learning(&mut self, value: f64) {
        self.learning = value;
    }

    fn set_momentum(&mut self, value: f64) {
        self.momentum = value;
    }

    fn set_regularizer(&mut self, value: f64) -> Result<()> {
        if self.contractive {
            return Err(Error::MutuallyExclusive);
        }
        self.regularizer = value;
        Ok(())
    }

    fn set_contractive(&mut self) -> Result<()> {
        if self.regularizer != 0.0 {
            return Err(Error::MutuallyExclusive);
        }
        self.contractive = true;
        Ok(())
    }

    fn set_jacobian_penalty(&mut self, value: f64) {
        self.jacobian_penalty = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;
    use crate::utils::squared_error;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn linear(inputs: usize, outputs: usize) -> Dense {
        Dense::new(inputs, outputs, Activator::Linear, &mut rng::seeded(3))
    }

    #[test]
    fn glorot_initialization() {
        let layer = Dense::new(6, 4, Activator::Sigmoid, &mut rng::seeded(1));
        let bound = (6.0f64 / 10.0).sqrt();
        assert_eq!(layer.weights().dim(), (4, 6));
        assert!(layer.weights().iter().all(|w| w.abs() <= bound));
        assert!(layer.weights().iter().any(|w| *w != 0.0));
        assert!(layer.bias().iter().all(|b| *b == 0.0));
        assert_eq!(layer.pending(), 0);
    }

    #[test]
    fn fire_has_output_length() {
        let mut layer = linear(3, 2);
        layer.charge(array![1.0, 2.0, 3.0].view()).unwrap();
        assert_eq!(layer.fire().len(), 2);
    }

    #[test]
    fn charge_rejects_wrong_length() {
        let mut layer = linear(3, 2);
        match layer.charge(array![1.0, 2.0].view()) {
            Err(Error::DimensionMismatch { got, expected, .. }) => {
                assert_eq!((got, expected), (2, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn charge_computes_affine_map() {
        let mut layer = Dense::from_parts(
            Activator::Linear,
            array![[1.0, 2.0], [0.0, -1.0]],
            array![0.5, 0.25],
        )
        .unwrap();
        layer.charge(array![1.0, 1.0].view()).unwrap();
        assert_eq!(layer.fire(), array![3.5, -0.75]);
    }

    #[test]
    fn fire_does_not_mutate_charge() {
        let mut layer = Dense::new(2, 2, Activator::Sigmoid, &mut rng::seeded(9));
        layer.charge(array![0.3, -0.4].view()).unwrap();
        assert_eq!(layer.fire(), layer.fire());
    }

    #[test]
    fn backpropagate_rejects_wrong_length() {
        let mut layer = linear(3, 2);
        layer.charge(array![1.0, 0.0, 0.0].view()).unwrap();
        assert!(layer.backpropagate(array![1.0].view()).is_err());
        assert_eq!(layer.pending(), 0);
    }

    #[test]
    fn dump_below_is_transposed_delta() {
        let mut layer = Dense::from_parts(
            Activator::Linear,
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            array![0.0, 0.0],
        )
        .unwrap();
        layer.set_batch_size(10).unwrap();
        layer.charge(array![1.0, 1.0, 1.0].view()).unwrap();
        layer.backpropagate(array![1.0, -1.0].view()).unwrap();
        assert_eq!(*layer.dump_below(), array![-3.0, -3.0, -3.0]);
    }

    #[test]
    fn single_step_reduces_error() {
        let mut layer = linear(3, 2);
        layer.set_learning(0.05);
        layer.set_momentum(0.0);
        let x = array![1.0, -0.5, 0.25];
        let target = array![0.7, -0.2];

        layer.charge(x.view()).unwrap();
        let before = squared_error(layer.fire().view(), target.view());
        let error = layer.fire() - &target;
        layer.backpropagate(error.view()).unwrap();

        layer.charge(x.view()).unwrap();
        let after = squared_error(layer.fire().view(), target.view());
        assert!(after < before, "{} !< {}", after, before);
    }

    #[test]
    fn batch_accumulates_until_full() {
        let mut layer = linear(2, 2);
        layer.set_batch_size(3).unwrap();
        let start = layer.weights().clone();
        let x = array![1.0, 2.0];

        for seen in 1..3 {
            layer.charge(x.view()).unwrap();
            layer.backpropagate(array![0.5, -0.5].view()).unwrap();
            assert_eq!(layer.pending(), seen);
            assert_eq!(*layer.weights(), start);
            assert!(layer.bias().iter().all(|b| *b == 0.0));
        }

        layer.charge(x.view()).unwrap();
        layer.backpropagate(array![0.5, -0.5].view()).unwrap();
        assert_eq!(layer.pending(), 0);
        assert_ne!(*layer.weights(), start);
    }

    #[test]
    fn update_uses_mean_gradient() {
        let mut layer = Dense::from_parts(
            Activator::Linear,
            array![[0.0, 0.0]],
            array![0.0],
        )
        .unwrap();
        layer.set_learning(1.0);
        layer.set_momentum(0.0);
        layer.set_batch_size(2).unwrap();
        layer.charge(array![1.0, 0.0].view()).unwrap();
        layer.backpropagate(array![2.0].view()).unwrap();
        layer.charge(array![0.0, 1.0].view()).unwrap();
        layer.backpropagate(array![4.0].view()).unwrap();
        assert_eq!(*layer.weights(), array![[-1.0, -2.0]]);
        assert_eq!(*layer.bias(), array![-3.0]);
    }

    #[test]
    fn momentum_repeats_last_step() {
        let mut layer = Dense::from_parts(
            Activator::Linear,
            array![[0.0]],
            array![0.0],
        )
        .unwrap();
        layer.set_learning(1.0);
        layer.set_momentum(0.5);
        layer.charge(array![1.0].view()).unwrap();
        layer.backpropagate(array![1.0].view()).unwrap();
        assert_eq!(*layer.weights(), array![[-1.0]]);

        // A zero gradient leaves only the momentum term.
        layer.charge(array![0.0].view()).unwrap();
        layer.backpropagate(array![0.0].view()).unwrap();
        assert_eq!(*layer.weights(), array![[-1.5]]);
        assert_eq!(*layer.bias(), array![-1.5]);
    }

    #[test]
    fn weighted_backpropagation_scales_the_step() {
        let step = |weight: f64| {
            let mut layer = Dense::from_parts(
                Activator::Linear,
                array![[0.0, 0.0]],
                array![0.0],
            )
            .unwrap();
            layer.set_learning(1.0);
            layer.set_momentum(0.0);
            layer.charge(array![1.0, 2.0].view()).unwrap();
            layer.backpropagate_weighted(array![2.0].view(), weight).unwrap();
            (layer.weights().clone(), layer.bias().clone())
        };
        assert_eq!(step(1.0), (array![[-2.0, -4.0]], array![-2.0]));
        assert_eq!(step(0.5), (array![[-1.0, -2.0]], array![-1.0]));
    }

    #[test]
    fn update_weighted_leaves_momentum_unscaled() {
        let run = |scale: f64| {
            let mut layer = Dense::from_parts(
                Activator::Linear,
                array![[0.0]],
                array![0.0],
            )
            .unwrap();
            layer.set_learning(1.0);
            layer.set_momentum(0.5);
            layer.charge(array![1.0].view()).unwrap();
            layer.backpropagate(array![1.0].view()).unwrap();
            assert_eq!(*layer.weights(), array![[-1.0]]);

            layer.set_batch_size(2).unwrap();
            layer.charge(array![1.0].view()).unwrap();
            layer.backpropagate(array![2.0].view()).unwrap();
            assert_eq!(layer.pending(), 1);
            layer.update_weighted(scale);
            (layer.weights()[[0, 0]], layer.bias()[0])
        };
        // -1 - scale * 2 + 0.5 * (-1 - 0)
        assert_eq!(run(1.0), (-3.5, -3.5));
        assert_eq!(run(0.5), (-2.5, -2.5));
    }

    #[test]
    fn regularizer_decays_weights_not_bias() {
        let mut layer = Dense::from_parts(
            Activator::Linear,
            array![[2.0]],
            array![2.0],
        )
        .unwrap();
        layer.set_learning(0.5);
        layer.set_momentum(0.0);
        layer.set_regularizer(0.1).unwrap();
        layer.charge(array![0.0].view()).unwrap();
        layer.backpropagate(array![0.0].view()).unwrap();
        assert_relative_eq!(layer.weights()[[0, 0]], 1.9);
        assert_eq!(layer.bias()[0], 2.0);
    }

    #[test]
    fn update_without_examples_is_a_no_op() {
        let mut layer = linear(2, 2);
        let start = layer.weights().clone();
        layer.update();
        assert_eq!(*layer.weights(), start);
    }

    #[test]
    fn batch_size_change_flushes_partial_batch() {
        let mut layer = linear(2, 1);
        layer.set_batch_size(5).unwrap();
        let start = layer.weights().clone();
        layer.charge(array![1.0, 1.0].view()).unwrap();
        layer.backpropagate(array![1.0].view()).unwrap();
        assert_eq!(layer.pending(), 1);

        layer.set_batch_size(2).unwrap();
        assert_eq!(layer.pending(), 0);
        assert_ne!(*layer.weights(), start);
        assert_eq!(layer.batch_size(), 2);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(linear(1, 1).set_batch_size(0).is_err());
    }

    #[test]
    fn contractive_and_regularizer_are_exclusive() {
        let mut layer = linear(2, 2);
        layer.set_regularizer(0.01).unwrap();
        assert!(matches!(
            layer.set_contractive(),
            Err(Error::MutuallyExclusive)
        ));
        assert!(!layer.is_contractive());

        let mut layer = linear(2, 2);
        layer.set_contractive().unwrap();
        assert!(matches!(
            layer.set_regularizer(0.01),
            Err(Error::MutuallyExclusive)
        ));
        assert_eq!(layer.regularizer(), 0.0);
        // Clearing a regularizer that was never set is still rejected.
        assert!(layer.set_regularizer(0.0).is_err());
    }

    #[test]
    fn jacobian_of_sigmoid_layer() {
        let mut layer = Dense::from_parts(
            Activator::Sigmoid,
            array![[1.0, -2.0]],
            array![0.0],
        )
        .unwrap();
        layer.charge(array![0.0, 0.0].view()).unwrap();
        assert_eq!(layer.fire_jacobian(), array![0.25]);
        layer.charge_jacobian();
        assert_eq!(*layer.get_jacobian(), array![[0.25, -0.5]]);
        assert_relative_eq!(layer.contraction(), 0.3125);
    }

    #[test]
    fn contraction_shrinks_without_error_signal() {
        let mut layer = Dense::new(4, 3, Activator::Sigmoid, &mut rng::seeded(5));
        layer.set_contractive().unwrap();
        layer.set_jacobian_penalty(1.0);
        layer.set_momentum(0.0);
        let x = array![0.2, -0.1, 0.4, 0.3];
        let zero = Vector::zeros(3);

        layer.charge(x.view()).unwrap();
        layer.charge_jacobian();
        let before = layer.contraction();
        for _ in 0..50 {
            layer.charge(x.view()).unwrap();
            layer.backpropagate(zero.view()).unwrap();
        }
        layer.charge(x.view()).unwrap();
        layer.charge_jacobian();
        assert!(layer.contraction() < before);
    }

    #[test]
    fn contraction_gradient_matches_finite_difference() {
        let weights = array![[0.3, -0.7], [0.5, 0.2]];
        let x = array![0.4, -0.9];
        let penalty = 0.5;
        let contraction_at = |w: &Mat, b: &Vector| {
            let mut layer =
                Dense::from_parts(Activator::Sigmoid, w.clone(), b.clone())
                    .unwrap();
            layer.charge(x.view()).unwrap();
            layer.charge_jacobian();
            penalty * layer.contraction()
        };

        let mut layer = Dense::from_parts(
            Activator::Sigmoid,
            weights.clone(),
            Vector::zeros(2),
        )
        .unwrap();
        layer.set_jacobian_penalty(penalty);
        layer.set_contractive().unwrap();
        layer.set_batch_size(2).unwrap();
        layer.charge(x.view()).unwrap();
        layer.backpropagate(Vector::zeros(2).view()).unwrap();

        let h = 1e-6;
        for i in 0..2 {
            for j in 0..2 {
                let mut plus = weights.clone();
                plus[[i, j]] += h;
                let mut minus = weights.clone();
                minus[[i, j]] -= h;
                let numeric = (contraction_at(&plus, &Vector::zeros(2))
                    - contraction_at(&minus, &Vector::zeros(2)))
                    / (2.0 * h);
                assert_relative_eq!(
                    layer.jacobian_weights_change[[i, j]],
                    numeric,
                    epsilon = 1e-6
                );
            }
            let mut plus = Vector::zeros(2);
            plus[i] += h;
            let mut minus = Vector::zeros(2);
            minus[i] -= h;
            let numeric = (contraction_at(&weights, &plus)
                - contraction_at(&weights, &minus))
                / (2.0 * h);
            assert_relative_eq!(
                layer.jacobian_bias_change[i],
                numeric,
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn resize_reallocates_everything() {
        let mut engine = rng::seeded(11);
        let mut layer = Dense::new(3, 2, Activator::Rectified, &mut engine);
        layer.set_batch_size(4).unwrap();
        layer.charge(array![1.0, 1.0, 1.0].view()).unwrap();
        layer.backpropagate(array![1.0, 1.0].view()).unwrap();

        layer.resize_input(5, &mut engine);
        assert_eq!(layer.weights().dim(), (2, 5));
        assert_eq!(layer.pending(), 0);
        let bound = (6.0f64 / 7.0).sqrt();
        assert!(layer.weights().iter().all(|w| w.abs() <= bound));
        layer.charge(Vector::ones(5).view()).unwrap();

        layer.resize_output(4, &mut engine);
        assert_eq!(layer.weights().dim(), (4, 5));
        assert_eq!(layer.bias().len(), 4);
        layer.charge(Vector::ones(5).view()).unwrap();
        assert_eq!(layer.fire().len(), 4);
        layer.backpropagate(Vector::ones(4).view()).unwrap();
        assert_eq!(layer.dump_below().len(), 5);
    }

    #[test]
    fn from_parts_checks_bias_length() {
        assert!(Dense::from_parts(
            Activator::Linear,
            Mat::zeros((2, 3)),
            Vector::zeros(3)
        )
        .is_err());
    }
}
