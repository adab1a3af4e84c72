use crate::activator::{add_noise, Activator};
use crate::layers::{Dense, Layer, Paradigm};
use crate::matrix::Vector;
use crate::{Error, Result};

use log::trace;
use ndarray::ArrayView1;
use rand::{Rng, RngCore};

pub const DEFAULT_NOISE_LEVEL: f64 = 0.1;

/// An autoencoder layer: an encoder `Dense(D, d)` and a decoder
/// `Dense(d, D)` trained to reproduce the input.
///
/// Used inside an architecture the layer behaves like its encoder; the
/// decoder only takes part in `reconstruct`, `encode` and `decode`.
#[derive(Clone, Debug)]
pub struct Contractive {
    encoder: Dense,
    decoder: Dense,
    /// Standard deviation of the Gaussian noise added before encoding.
    noise_level: f64,
}

impl Contractive {
    /// Initializes a new, untrained autoencoder.
    ///
    /// Arguments:
    ///
    ///  * `inputs` - the number of inputs, which is also the number of
    ///               reconstructed outputs.
    ///  * `encoding` - the size of the encoding.
    ///  * `encoder` - the activation of the encoding layer.
    ///  * `decoder` - the activation of the reconstruction layer.
    ///  * `rng` - the engine drawing the initial weights of both halves.
    pub fn new<R>(
        inputs: usize,
        encoding: usize,
        encoder: Activator,
        decoder: Activator,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        Contractive {
            encoder: Dense::new(inputs, encoding, encoder, rng),
            decoder: Dense::new(encoding, inputs, decoder, rng),
            noise_level: DEFAULT_NOISE_LEVEL,
        }
    }

    /// Assembles an autoencoder from two halves whose shapes mirror each
    /// other.
    pub(crate) fn from_parts(
        encoder: Dense,
        decoder: Dense,
        noise_level: f64,
    ) -> Result<Self> {
        if decoder.input_len() != encoder.output_len() {
            return Err(Error::DimensionMismatch {
                what: "decoder inputs",
                got: decoder.input_len(),
                expected: encoder.output_len(),
            });
        }
        if decoder.output_len() != encoder.input_len() {
            return Err(Error::DimensionMismatch {
                what: "decoder outputs",
                got: decoder.output_len(),
                expected: encoder.input_len(),
            });
        }
        Ok(Contractive {
            encoder,
            decoder,
            noise_level,
        })
    }

    pub fn encoder(&self) -> &Dense {
        &self.encoder
    }

    pub fn decoder(&self) -> &Dense {
        &self.decoder
    }

    /// The decoder, for tuning it independently of the encoder.
    pub fn decoder_mut(&mut self) -> &mut Dense {
        &mut self.decoder
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    pub fn set_noise_level(&mut self, level: f64) {
        self.noise_level = level;
    }

    /// Runs `input` through the encoder and then the decoder.
    ///
    /// With `noise`, the input is first corrupted with zero-mean Gaussian
    /// noise of standard deviation `noise_level`.
    pub fn reconstruct(
        &mut self,
        input: ArrayView1<f64>,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<Vector> {
        match noise {
            Some(rng) => {
                let noisy = add_noise(input, self.noise_level, rng)?;
                self.encoder.charge(noisy.view())?;
            }
            None => self.encoder.charge(input)?,
        }
        let code = self.encoder.fire();
        self.decoder.charge(code.view())?;
        Ok(self.decoder.fire())
    }

    /// Trains both halves to reproduce `input`.
    pub fn encode(
        &mut self,
        input: ArrayView1<f64>,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<()> {
        self.encode_weighted(input, 1.0, noise)
    }

    /// Like `encode`, scaling this example's contribution by `weight`.
    ///
    /// The error is measured against the clean input even when noise is
    /// injected.
    pub fn encode_weighted(
        &mut self,
        input: ArrayView1<f64>,
        weight: f64,
        noise: Option<&mut dyn RngCore>,
    ) -> Result<()> {
        let error = self.reconstruct(input, noise)? - &input;
        trace!(
            "reconstruction error {}",
            error.iter().map(|e| e * e).sum::<f64>()
        );
        self.decoder.backpropagate_weighted(error.view(), weight)?;
        let below = self.decoder.dump_below().clone();
        self.encoder.backpropagate_weighted(below.view(), weight)
    }

    /// Returns the encoding of `input`, without noise.
    pub fn get_encoding(&mut self, input: ArrayView1<f64>) -> Result<Vector> {
        self.encoder.charge(input)?;
        Ok(self.encoder.fire())
    }

    /// Maps an encoding back into input space.
    pub fn decode(&mut self, code: ArrayView1<f64>) -> Result<Vector> {
        self.decoder.charge(code)?;
        Ok(self.decoder.fire())
    }
}

impl Layer for Contractive {
    fn paradigm(&self) -> Paradigm {
        Paradigm::Contractive
    }

    fn input_len(&self) -> usize {
        self.encoder.input_len()
    }

    fn output_len(&self) -> usize {
        self.encoder.output_len()
    }

    fn pending(&self) -> usize {
        self.encoder.pending()
    }

    fn reset_weights<R>(&mut self, bound: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.encoder.reset_weights(bound, rng);
        self.decoder.reset_weights(bound, rng);
    }

    fn resize_input<R>(&mut self, inputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.encoder.resize_input(inputs, rng);
        self.decoder.resize_output(inputs, rng);
    }

    fn resize_output<R>(&mut self, outputs: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.encoder.resize_output(outputs, rng);
        self.decoder.resize_input(outputs, rng);
    }

    fn charge(&mut self, input: ArrayView1<f64>) -> Result<()> {
        self.encoder.charge(input)
    }

    fn fire(&self) -> Vector {
        self.encoder.fire()
    }

    fn dump_below(&self) -> &Vector {
        self.encoder.dump_below()
    }

    fn backpropagate_weighted(
        &mut self,
        error: ArrayView1<f64>,
        weight: f64,
    ) -> Result<()> {
        self.encoder.backpropagate_weighted(error, weight)
    }

    fn update(&mut self) {
        self.encoder.update();
        self.decoder.update();
    }

    fn set_batch_size(&mut self, size: usize) -> Result<()> {
        self.encoder.set_batch_size(size)?;
        self.decoder.set_batch_size(size)
    }

    fn set_learning(&mut self, value: f64) {
        self.encoder.set_learning(value);
        self.decoder.set_learning(value);
    }

    fn set_momentum(&mut self, value: f64) {
        self.encoder.set_momentum(value);
        self.decoder.set_momentum(value);
    }

    fn set_regularizer(&mut self, value: f64) -> Result<()> {
        self.encoder.set_regularizer(value)?;
        self.decoder.set_regularizer(value)
    }

    /// Only the encoder is penalized.
    fn set_contractive(&mut self) -> Result<()> {
        self.encoder.set_contractive()
    }

    fn set_jacobian_penalty(&mut self, value: f64) {
        self.encoder.set_jacobian_penalty(value);
    }
}
