//! Activation function types.

use crate::Result;
use crate::matrix::Vector;

use ndarray::ArrayView1;
use ndarray_rand::RandomExt;
use rand::RngCore;
use rand_distr::Normal;

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activator {
    /// Identity
    Linear,
    /// Rectified Linear Unit
    Rectified,
    /// Logistic function
    Sigmoid,
    /// Exponential normalization over the whole output vector
    Softmax,
}

impl Activator {
    /// Evaluates `f(z)` for a whole pre-activation vector.
    ///
    /// Softmax is the only activation that couples the elements; the others
    /// are applied elementwise.
    pub fn f(&self, z: ArrayView1<f64>) -> Vector {
        match *self {
            Activator::Linear => z.to_owned(),
            Activator::Rectified => z.mapv(|x| x.max(0.0)),
            Activator::Sigmoid => z.mapv(sigmoid),
            Activator::Softmax => {
                let max = z.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
                let mut w = z.mapv(|x| (x - max).exp());
                let sum = w.sum();
                w /= sum;
                w
            }
        }
    }

    /// Evaluates the derivative `f'(x)`, where `x = f^{-1}(y)`.
    ///
    /// Note that this function takes in the *output* of the activation
    /// function, rather than the input. Softmax uses its diagonal term.
    pub fn fprime(&self, y: f64) -> f64 {
        match *self {
            Activator::Linear => 1.0,
            Activator::Rectified => if y > 0.0 { 1.0 } else { 0.0 },
            Activator::Sigmoid | Activator::Softmax => y * (1.0 - y),
        }
    }

    /// Evaluates the second derivative `f''(x)`, again in terms of `y`.
    pub fn fsecond(&self, y: f64) -> f64 {
        match *self {
            Activator::Linear | Activator::Rectified => 0.0,
            Activator::Sigmoid | Activator::Softmax => {
                y * (1.0 - y) * (1.0 - 2.0 * y)
            }
        }
    }

    /// The name used in serialized layers.
    pub fn name(&self) -> &'static str {
        match *self {
            Activator::Linear => "linear",
            Activator::Rectified => "rectified",
            Activator::Sigmoid => "sigmoid",
            Activator::Softmax => "softmax",
        }
    }
}

/// Numerically stable logistic function.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Returns `v` perturbed by zero-mean Gaussian noise with standard deviation
/// `level`, as used by denoising autoencoders.
pub fn add_noise(
    v: ArrayView1<f64>,
    level: f64,
    rng: &mut dyn RngCore,
) -> Result<Vector> {
    let noise = Vector::random_using(v.len(), Normal::new(0.0, level)?, rng);
    Ok(noise + v)
}
