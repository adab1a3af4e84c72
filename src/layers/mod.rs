//! Layer types and the interface they share.
//!
//! Every layer kind implements [`Layer`]. A network stores its layers as
//! [`AnyLayer`], a closed sum type over the kinds; operations that only make
//! sense for autoencoders are inherent methods of [`Contractive`] and, on
//! `AnyLayer`, fail with `UnsupportedForVariant` for the other variants.

pub mod contractive;
pub mod dense;

pub use self::contractive::Contractive;
pub use self::dense::Dense;

use crate::matrix::Vector;
use crate::{Error, Result};

use ndarray::ArrayView1;
use rand::{Rng, RngCore};
use std::fmt;

/// The behaviour common to every layer kind.
pub trait Layer {
    /// The kind of layer, as used for serialization dispatch.
    fn paradigm(&self) -> Paradigm;

    /// Returns the number of inputs to this layer.
    fn input_len(&self) -> usize;

    /// Returns the number of outputs from this layer.
    fn output_len(&self) -> usize;

    /// Returns the number of examples accumulated since the last update.
    fn pending(&self) -> usize;

    /// Re-draws the weights from `[-bound, bound]`.
    fn reset_weights<R>(&mut self, bound: f64, rng: &mut R)
    where
        R: Rng + ?Sized;

    fn resize_input<R>(&mut self, inputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized;

    fn resize_output<R>(&mut self, outputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized;

    /// Stores `input` and computes the pre-activation output.
    fn charge(&mut self, input: ArrayView1<f64>) -> Result<()>;

    /// Applies the activation function to the last charge.
    fn fire(&self) -> Vector;

    /// The error to hand to the layer feeding this one, as computed by the
    /// last `backpropagate`.
    fn dump_below(&self) -> &Vector;

    /// Feeds `error` backwards through the layer, accumulating gradients.
    fn backpropagate(&mut self, error: ArrayView1<f64>) -> Result<()> {
        self.backpropagate_weighted(error, 1.0)
    }

    /// Like `backpropagate`, scaling this example's contribution by
    /// `weight`.
    fn backpropagate_weighted(
        &mut self,
        error: ArrayView1<f64>,
        weight: f64,
    ) -> Result<()>;

    /// Applies and resets the accumulated gradients.
    ///
    /// Not safe to interleave with a `backpropagate` on the same layer;
    /// `&mut self` rules that out.
    fn update(&mut self);

    fn set_batch_size(&mut self, size: usize) -> Result<()>;

    fn set_learning(&mut self, value: f64);

    fn set_momentum(&mut self, value: f64);

    fn set_regularizer(&mut self, value: f64) -> Result<()>;

    fn set_contractive(&mut self) -> Result<()>;

    fn set_jacobian_penalty(&mut self, value: f64);
}

/// The kind of a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Paradigm {
    Basic,
    Contractive,
}

impl Paradigm {
    /// The class tag written to serialized layers.
    pub fn class(&self) -> &'static str {
        match *self {
            Paradigm::Basic => "layer",
            Paradigm::Contractive => "contractive",
        }
    }
}

impl fmt::Display for Paradigm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.class())
    }
}

/// Where a layer is in its batch cycle.
///
/// Every `backpropagate` moves `Accumulating(n)` to `Accumulating(n + 1)`;
/// reaching the batch size passes through `Flushing` while the update is
/// applied and lands back on `Accumulating(0)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Batch {
    Accumulating(usize),
    Flushing,
}

/// The Glorot uniform bound `sqrt(6 / (fan_in + fan_out))`.
pub fn glorot_bound(inputs: usize, outputs: usize) -> f64 {
    if inputs + outputs == 0 {
        return 0.0;
    }
    (6.0 / (inputs + outputs) as f64).sqrt()
}

/// A layer of any kind, as owned by an architecture.
#[derive(Clone, Debug)]
pub enum AnyLayer {
    Basic(Dense),
    Contractive(Contractive),
}

impl From<Dense> for AnyLayer {
    fn from(layer: Dense) -> Self {
        AnyLayer::Basic(layer)
    }
}

impl From<Contractive> for AnyLayer {
    fn from(layer: Contractive) -> Self {
        AnyLayer::Contractive(layer)
    }
}

macro_rules! dispatch {
    ($self:expr, $l:ident => $e:expr) => {
        match $self {
            AnyLayer::Basic($l) => $e,
            AnyLayer::Contractive($l) => $e,
        }
    };
}

impl AnyLayer {
    pub fn as_contractive(&self) -> Option<&Contractive> {
        match self {
            AnyLayer::Contractive(l) => Some(l),
            AnyLayer::Basic(_) => None,
        }
    }

    pub fn as_contractive_mut(&mut self) -> Option<&mut Contractive> {
        match self {
            AnyLayer::Contractive(l) => Some(l),
            AnyLayer::Basic(_) => None,
        }
    }

    /// The encoding half of the layer: the layer itself for a basic layer,
    /// the encoder for a contractive one.
    pub fn encoder(&self) -> &Dense {
        match self {
            AnyLayer::Basic(l) => l,
            AnyLayer::Contractive(l) => l.encoder(),
        }
    }

    fn autoencoder(&mut self, operation: &'static str) -> Result<&mut Contractive> {
        match self {
            AnyLayer::Contractive(l) => Ok(l),
            AnyLayer::Basic(l) => Err(Error::UnsupportedForVariant {
                operation,
                paradigm: l.paradigm(),
            }),
        }
    }

    /// See [`Contractive::reconstruct`].
    pub fn reconstruct(
        &mut self,
        input: ArrayView1<f64>,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<Vector> {
        self.autoencoder("reconstruct")?.reconstruct(input, noise)
    }

    /// See [`Contractive::encode`].
    pub fn encode(
        &mut self,
        input: ArrayView1<f64>,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<()> {
        self.autoencoder("encode")?.encode(input, noise)
    }

    /// See [`Contractive::encode_weighted`].
    pub fn encode_weighted(
        &mut self,
        input: ArrayView1<f64>,
        weight: f64,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<()> {
        self.autoencoder("encode")?
            .encode_weighted(input, weight, noise)
    }

    /// See [`Contractive::get_encoding`].
    pub fn get_encoding(&mut self, input: ArrayView1<f64>) -> Result<Vector> {
        self.autoencoder("get_encoding")?.get_encoding(input)
    }

    /// See [`Contractive::decode`].
    pub fn decode(&mut self, code: ArrayView1<f64>) -> Result<Vector> {
        self.autoencoder("decode")?.decode(code)
    }
}

impl Layer for AnyLayer {
    fn paradigm(&self) -> Paradigm {
        dispatch!(self, l => l.paradigm())
    }

    fn input_len(&self) -> usize {
        dispatch!(self, l => l.input_len())
    }

    fn output_len(&self) -> usize {
        dispatch!(self, l => l.output_len())
    }

    fn pending(&self) -> usize {
        dispatch!(self, l => l.pending())
    }

    fn reset_weights<R>(&mut self, bound: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        dispatch!(self, l => l.reset_weights(bound, rng))
    }

    fn resize_input<R>(&mut self, inputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        dispatch!(self, l => l.resize_input(inputs, rng))
    }

    fn resize_output<R>(&mut self, outputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        dispatch!(self, l => l.resize_output(outputs, rng))
    }

    fn charge(&mut self, input: ArrayView1<f64>) -> Result<()> {
        dispatch!(self, l => l.charge(input))
    }

    fn fire(&self) -> Vector {
        dispatch!(self, l => l.fire())
    }

    fn dump_below(&self) -> &Vector {
        dispatch!(self, l => l.dump_below())
    }

    fn backpropagate_weighted(
        &mut self,
        error: ArrayView1<f64>,
        weight: f64,
    ) -> Result<()> {
        dispatch!(self, l => l.backpropagate_weighted(error, weight))
    }

    fn update(&mut self) {
        dispatch!(self, l => l.update())
    }

    fn set_batch_size(&mut self, size: usize) -> Result<()> {
        dispatch!(self, l => l.set_batch_size(size))
    }

    fn set_learning(&mut self, value: f64) {
        dispatch!(self, l => l.set_learning(value))
    }

    fn set_momentum(&mut self, value: f64) {
        dispatch!(self, l => l.set_momentum(value))
    }

    fn set_regularizer(&mut self, value: f64) -> Result<()> {
        dispatch!(self, l => l.set_regularizer(value))
    }

    fn set_contractive(&mut self) -> Result<()> {
        dispatch!(self, l => l.set_contractive())
    }

    fn set_jacobian_penalty(&mut self, value: f64) {
        dispatch!(self, l => l.set_jacobian_penalty(value))
    }
}
