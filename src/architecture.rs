//! A stack of layers trained as one network.
//!
//! # Example
//!
//! Pretrain an autoencoder layer on unlabelled data, then fine-tune the whole
//! stack on a target:
//!
//! ```
//! # use layerwise::{rng, Activator, Architecture};
//! # use ndarray::array;
//! let mut engine = rng::seeded(1);
//! let mut network = Architecture::new();
//! network
//!     .add_contractive(3, 2, Activator::Sigmoid, Activator::Linear, &mut engine)
//!     .unwrap();
//! network.add_dense(2, 1, Activator::Linear, &mut engine).unwrap();
//!
//! let x = array![0.2, 0.4, 0.6];
//! for _ in 0..10 {
//!     network.encode(x.view(), 0, None).unwrap();
//! }
//! network.correct(x.view(), array![1.0].view()).unwrap();
//! assert_eq!(network.predict(x.view()).unwrap().len(), 1);
//! ```

use crate::activator::Activator;
use crate::config::Hyperparameters;
use crate::error::check_len;
use crate::layers::{AnyLayer, Contractive, Dense, Layer};
use crate::matrix::Vector;
use crate::utils::squared_error;
use crate::{Error, Result};

use log::debug;
use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, RngCore};

/// What the output layer of a network built by `from_sizes` predicts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Problem {
    /// Unbounded real targets; linear output.
    Regress,
    /// Independent binary targets; sigmoid output.
    Classify,
    /// One of several classes; softmax output.
    Multiclass,
}

impl Problem {
    fn output_activator(&self) -> Activator {
        match *self {
            Problem::Regress => Activator::Linear,
            Problem::Classify => Activator::Sigmoid,
            Problem::Multiclass => Activator::Softmax,
        }
    }
}

/// An ordered stack of layers, each feeding the next.
///
/// Adjacent layers agree on their shared dimension: `add_layer` rejects a
/// layer whose input does not match the current output, and
/// `resize_layer_output` resizes both sides of a boundary together. Resizing
/// a single layer through `layer_mut` leaves the boundary broken, and
/// `predict` or `from_json` then report the mismatch.
#[derive(Clone, Debug, Default)]
pub struct Architecture {
    layers: Vec<AnyLayer>,
}

impl Architecture {
    pub fn new() -> Self {
        Architecture { layers: Vec::new() }
    }

    /// Builds a basic network with one layer between each pair of adjacent
    /// `sizes`.
    ///
    /// Hidden layers are sigmoid; the output layer's activation follows
    /// `problem`.
    pub fn from_sizes<R>(
        sizes: &[usize],
        problem: Problem,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(format!(
                "a network needs at least 2 layer sizes, got {}",
                sizes.len()
            )));
        }
        if sizes.iter().any(|&size| size == 0) {
            return Err(Error::InvalidConfig(
                "layer sizes must be nonzero".to_owned(),
            ));
        }
        let mut network = Architecture::new();
        let last = sizes.len() - 2;
        for (i, pair) in sizes.windows(2).enumerate() {
            let activator = if i == last {
                problem.output_activator()
            } else {
                Activator::Sigmoid
            };
            network.add_dense(pair[0], pair[1], activator, rng)?;
        }
        Ok(network)
    }

    /// Appends `layer` to the top of the stack.
    pub fn add_layer<L>(&mut self, layer: L) -> Result<()>
    where
        L: Into<AnyLayer>,
    {
        let layer = layer.into();
        if let Some(top) = self.layers.last() {
            check_len("layer inputs", layer.input_len(), top.output_len())?;
        }
        debug!(
            "adding {} layer {} -> {} at position {}",
            layer.paradigm(),
            layer.input_len(),
            layer.output_len(),
            self.layers.len()
        );
        self.layers.push(layer);
        Ok(())
    }

    /// Builds and appends a basic layer.
    pub fn add_dense<R>(
        &mut self,
        inputs: usize,
        outputs: usize,
        activator: Activator,
        rng: &mut R,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        self.add_layer(Dense::new(inputs, outputs, activator, rng))
    }

    /// Builds and appends an autoencoder layer.
    pub fn add_contractive<R>(
        &mut self,
        inputs: usize,
        encoding: usize,
        encoder: Activator,
        decoder: Activator,
        rng: &mut R,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        self.add_layer(Contractive::new(inputs, encoding, encoder, decoder, rng))
    }

    pub fn layers(&self) -> &[AnyLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&AnyLayer> {
        let len = self.layers.len();
        self.layers
            .get(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut AnyLayer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// The layer at `index` as an autoencoder.
    pub fn contractive(&self, index: usize) -> Result<&Contractive> {
        let layer = self.layer(index)?;
        layer.as_contractive().ok_or(Error::UnsupportedForVariant {
            operation: "contractive",
            paradigm: layer.paradigm(),
        })
    }

    pub fn contractive_mut(&mut self, index: usize) -> Result<&mut Contractive> {
        let layer = self.layer_mut(index)?;
        let paradigm = layer.paradigm();
        layer.as_contractive_mut().ok_or(Error::UnsupportedForVariant {
            operation: "contractive",
            paradigm,
        })
    }

    /// Changes the output length of layer `index` and the input length of
    /// the layer above it, re-initializing both.
    pub fn resize_layer_output<R>(
        &mut self,
        index: usize,
        outputs: usize,
        rng: &mut R,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        self.layer_mut(index)?.resize_output(outputs, rng);
        if let Some(above) = self.layers.get_mut(index + 1) {
            above.resize_input(outputs, rng);
        }
        debug!("resized boundary above layer {} to {}", index, outputs);
        Ok(())
    }

    /// Changes the input length of the bottom layer.
    pub fn resize_input<R>(&mut self, inputs: usize, rng: &mut R) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        self.layers
            .first_mut()
            .ok_or(Error::NoLayers("input length"))?
            .resize_input(inputs, rng);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Removes and returns the top layer.
    pub fn pop(&mut self) -> Option<AnyLayer> {
        self.layers.pop()
    }

    /// Keeps only the bottom `len` layers.
    pub fn truncate(&mut self, len: usize) {
        self.layers.truncate(len);
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Returns the size of the input to the network, or 0 when empty.
    pub fn input_len(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_len())
    }

    /// Returns the size of the output from the network, or 0 when empty.
    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_len())
    }

    /// Feeds `input` through the bottom `depth` layers.
    fn forward(&mut self, input: ArrayView1<f64>, depth: usize) -> Result<Vector> {
        let mut signal = input.to_owned();
        for layer in &mut self.layers[..depth] {
            layer.charge(signal.view())?;
            signal = layer.fire();
        }
        Ok(signal)
    }

    /// Feeds `input` through the whole stack.
    ///
    /// An empty architecture returns its input.
    pub fn predict(&mut self, input: ArrayView1<f64>) -> Result<Vector> {
        let depth = self.layers.len();
        self.forward(input, depth)
    }

    /// Backpropagates the error of one prediction through every layer.
    pub fn correct(
        &mut self,
        input: ArrayView1<f64>,
        target: ArrayView1<f64>,
    ) -> Result<()> {
        self.correct_weighted(input, target, 1.0)
    }

    /// Like `correct`, scaling this example's contribution by `weight`.
    pub fn correct_weighted(
        &mut self,
        input: ArrayView1<f64>,
        target: ArrayView1<f64>,
        weight: f64,
    ) -> Result<()> {
        let output = self.predict(input)?;
        check_len("target", target.len(), output.len())?;

        let mut error = output - &target;
        for layer in self.layers.iter_mut().rev() {
            layer.backpropagate_weighted(error.view(), weight)?;
            error = layer.dump_below().clone();
        }
        Ok(())
    }

    /// Trains autoencoder layer `which` on `input` as seen through the layers
    /// below it. The layers below are not trained.
    pub fn encode(
        &mut self,
        input: ArrayView1<f64>,
        which: usize,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<()> {
        self.encode_weighted(input, which, 1.0, noise)
    }

    pub fn encode_weighted(
        &mut self,
        input: ArrayView1<f64>,
        which: usize,
        weight: f64,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<()> {
        self.layer(which)?;
        let below = self.forward(input, which)?;
        self.layers[which].encode_weighted(below.view(), weight, noise)
    }

    /// The mean squared reconstruction error of layer `which` over the rows
    /// of `batch`, without noise. An empty batch has no error.
    pub fn encoding_mse(
        &mut self,
        batch: ArrayView2<f64>,
        which: usize,
    ) -> Result<f64> {
        self.layer(which)?;
        if batch.nrows() == 0 {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for row in batch.rows() {
            let below = self.forward(row, which)?;
            let reconstructed = self.layers[which].reconstruct(below.view(), None)?;
            total += squared_error(reconstructed.view(), below.view());
        }
        Ok(total / batch.nrows() as f64)
    }

    fn broadcast<F>(&mut self, what: &'static str, mut f: F) -> Result<()>
    where
        F: FnMut(&mut AnyLayer) -> Result<()>,
    {
        if self.layers.is_empty() {
            return Err(Error::NoLayers(what));
        }
        self.layers.iter_mut().try_for_each(|layer| f(layer))
    }

    pub fn set_batch_size(&mut self, size: usize) -> Result<()> {
        self.broadcast("batch size", |l| l.set_batch_size(size))
    }

    pub fn set_learning(&mut self, value: f64) -> Result<()> {
        self.broadcast("learning rate", |l| {
            l.set_learning(value);
            Ok(())
        })
    }

    pub fn set_momentum(&mut self, value: f64) -> Result<()> {
        self.broadcast("momentum", |l| {
            l.set_momentum(value);
            Ok(())
        })
    }

    /// Fails without changing any layer if one of them is contractive.
    pub fn set_regularizer(&mut self, value: f64) -> Result<()> {
        if self.layers.iter().any(|l| l.encoder().is_contractive()) {
            return Err(Error::MutuallyExclusive);
        }
        self.broadcast("regularizer", |l| l.set_regularizer(value))
    }

    /// Fails without changing any layer if one of them is regularized.
    pub fn set_contractive(&mut self) -> Result<()> {
        if self.layers.iter().any(|l| l.encoder().regularizer() != 0.0) {
            return Err(Error::MutuallyExclusive);
        }
        self.broadcast("contractive", |l| l.set_contractive())
    }

    pub fn set_jacobian_penalty(&mut self, value: f64) -> Result<()> {
        self.broadcast("jacobian penalty", |l| {
            l.set_jacobian_penalty(value);
            Ok(())
        })
    }

    /// Sets the noise level of every autoencoder layer.
    pub fn set_noise_level(&mut self, level: f64) -> Result<()> {
        self.broadcast("noise level", |l| {
            if let Some(c) = l.as_contractive_mut() {
                c.set_noise_level(level);
            }
            Ok(())
        })
    }

    /// Applies a whole set of hyperparameters to every layer.
    pub fn configure(&mut self, params: &Hyperparameters) -> Result<()> {
        params.validate()?;
        self.set_batch_size(params.batch_size)?;
        self.set_learning(params.learning)?;
        self.set_momentum(params.momentum)?;
        self.set_jacobian_penalty(params.jacobian_penalty)?;
        self.set_noise_level(params.noise_level)?;
        if params.contractive {
            self.set_contractive()?;
        } else if params.regularizer != 0.0 {
            self.set_regularizer(params.regularizer)?;
        }
        Ok(())
    }
}
