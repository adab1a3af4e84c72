//! Utilities for training architectures.
//!
//! # Example
//!
//! Pretrain an autoencoder layer, then fine-tune the stack on labelled data:
//!
//! ```
//! # use layerwise::{rng, Activator, Architecture};
//! # use layerwise::trainer::*;
//! # use ndarray::array;
//! let mut engine = rng::seeded(0);
//! let mut network = Architecture::new();
//! network
//!     .add_contractive(2, 3, Activator::Sigmoid, Activator::Linear, &mut engine)
//!     .unwrap();
//! network.add_dense(3, 1, Activator::Sigmoid, &mut engine).unwrap();
//!
//! let inputs = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
//! let targets = array![[0.0], [1.0], [1.0], [0.0]];
//!
//! let network = Trainer::new(network)
//!     .stop_condition(StopCondition::Iterations(50))
//!     .logging(Logging::Silent)
//!     .pretrain(inputs.view(), &mut engine)
//!     .unwrap()
//!     .stop_condition(StopCondition::Iterations(100))
//!     .train(inputs.view(), targets.view())
//!     .unwrap();
//! assert_eq!(network.output_len(), 1);
//! ```

use crate::architecture::Architecture;
use crate::config::Hyperparameters;
use crate::error::check_len;
use crate::layers::{Layer, Paradigm};
use crate::utils::squared_error;
use crate::{Error, Result};

use log::{info, warn};
use ndarray::ArrayView2;
use rand::RngCore;
use std::time::{Duration, Instant};

/// A builder for training an architecture.
#[derive(Debug)]
pub struct Trainer {
    network: Architecture,
    hyperparameters: Hyperparameters,
    learning_mode: LearningMode,
    logging: Logging,
    stop_condition: StopCondition,
    denoising: bool,
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * The default `Hyperparameters`.
    /// * A stochastic learning mode.
    /// * Stops after 1000 training iterations.
    /// * Logs on training completion.
    /// * Noisy inputs during pretraining, at each layer's noise level.
    pub fn new(network: Architecture) -> Self {
        Trainer {
            network,
            hyperparameters: Hyperparameters::default(),
            learning_mode: LearningMode::Stochastic,
            logging: Logging::Completion,
            stop_condition: StopCondition::Iterations(1000),
            denoising: true,
        }
    }

    /// Sets every hyperparameter at once.
    pub fn hyperparameters(mut self, params: Hyperparameters) -> Self {
        self.hyperparameters = params;
        self
    }

    /// Sets the `LearningMode` to use for training.
    pub fn learning_mode(mut self, mode: LearningMode) -> Self {
        self.learning_mode = mode;
        self
    }

    /// Sets the learning rate to use during gradient descent.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.hyperparameters.learning = rate;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    /// Whether to corrupt the inputs with noise while pretraining.
    pub fn denoising(mut self, denoising: bool) -> Self {
        self.denoising = denoising;
        self
    }

    /// Returns the architecture being trained.
    pub fn into_inner(self) -> Architecture {
        self.network
    }

    /// Greedy layer-wise pretraining.
    ///
    /// Each autoencoder layer, bottom first, is trained to reconstruct the
    /// `inputs` as seen through the layers below it until the stop condition
    /// triggers. Basic layers are skipped.
    pub fn pretrain(
        mut self,
        inputs: ArrayView2<f64>,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        self.validate(inputs, None)?;
        self.configure()?;

        for which in 0..self.network.len() {
            if self.network.layer(which)?.paradigm() != Paradigm::Contractive {
                continue;
            }
            info!("pretraining layer {}", which);
            let start_time = Instant::now();
            let mut iteration = 0;
            let mut training_error;
            loop {
                for input in inputs.rows() {
                    let noise: Option<&mut dyn RngCore> = if self.denoising {
                        Some(&mut *rng)
                    } else {
                        None
                    };
                    self.network.encode(input, which, noise)?;
                }
                self.network.layer_mut(which)?.update();
                training_error = self.network.encoding_mse(inputs, which)?;
                iteration += 1;

                self.logging.iteration(iteration, training_error);
                if self.stop_condition.should_stop(
                    iteration,
                    training_error,
                    start_time,
                ) {
                    break;
                }
            }
            self.logging
                .completion(iteration, training_error, start_time);
        }
        Ok(self)
    }

    /// Trains the network using the provided labelled data.
    ///
    /// Row `i` of `inputs` is labelled by row `i` of `targets`.
    ///
    /// Returns:
    ///   The trained network, or an error if invalid training parameters
    ///   were provided.
    pub fn train(
        mut self,
        inputs: ArrayView2<f64>,
        targets: ArrayView2<f64>,
    ) -> Result<Architecture> {
        self.validate(inputs, Some(targets))?;
        self.configure()?;

        let start_time = Instant::now();
        let mut iteration = 0;
        let mut training_error;
        loop {
            training_error = 0.0;
            for (input, target) in inputs.rows().into_iter().zip(targets.rows()) {
                self.network.correct(input, target)?;
                let output = self.network.predict(input)?;
                training_error += squared_error(output.view(), target);
            }
            // Flush partial batches at the end of every pass.
            for which in 0..self.network.len() {
                self.network.layer_mut(which)?.update();
            }
            training_error /= 2.0 * inputs.nrows() as f64;
            iteration += 1;

            self.logging.iteration(iteration, training_error);
            if self.stop_condition.should_stop(
                iteration,
                training_error,
                start_time,
            ) {
                break;
            }
        }
        self.logging
            .completion(iteration, training_error, start_time);
        Ok(self.network)
    }

    fn batch_size(&self) -> usize {
        match self.learning_mode {
            LearningMode::Stochastic => 1,
            LearningMode::Batch(size) => size,
        }
    }

    fn configure(&mut self) -> Result<()> {
        let params = Hyperparameters {
            batch_size: self.batch_size(),
            ..self.hyperparameters.clone()
        };
        self.network.configure(&params)
    }

    /// Verifies that all provided inputs to the `Trainer` are valid, returning
    /// an error if something is wrong.
    fn validate(
        &self,
        inputs: ArrayView2<f64>,
        targets: Option<ArrayView2<f64>>,
    ) -> Result<()> {
        if self.network.is_empty() {
            return Err(Error::NoLayers("training data"));
        }
        if inputs.nrows() == 0 {
            return Err(Error::InvalidConfig("no training examples".to_owned()));
        }
        if let LearningMode::Batch(size) = self.learning_mode {
            if size == 0 || size > inputs.nrows() {
                return Err(Error::InvalidConfig(format!(
                    "batch size {} must be between 1 and the {} examples",
                    size,
                    inputs.nrows()
                )));
            }
        }
        check_len("example inputs", inputs.ncols(), self.network.input_len())?;
        if let Some(targets) = targets {
            check_len("example count", targets.nrows(), inputs.nrows())?;
            check_len("example targets", targets.ncols(), self.network.output_len())?;
        }
        if let StopCondition::ErrorThreshold(threshold) = self.stop_condition {
            if threshold <= 0.0 {
                warn!("error threshold {} can never be reached", threshold);
            }
        }
        Ok(())
    }
}

/// The learning mode to use for training
#[derive(Copy, Clone, Debug)]
pub enum LearningMode {
    /// Apply weight updates after every training example
    Stochastic,
    /// Apply weights updates in batches of the provided size
    ///
    /// Must not exceed the total number of training instances.
    Batch(usize),
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` training iterations
    Iterations(usize),
}

impl Logging {
    /// Performs logging at the current `iteration` of training.
    fn iteration(&self, iteration: usize, training_error: f64) {
        use self::Logging::*;
        if let Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                info!("iteration {}:\tMSE={}", iteration, training_error);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(
        &self,
        iterations: usize,
        training_error: f64,
        start_time: Instant,
    ) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            "ran {} iterations in {:.3} seconds, final MSE {}",
            iterations,
            start_time.elapsed().as_secs_f64(),
            training_error
        );
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug)]
pub enum StopCondition {
    /// Stops after the provided number of training iterations
    Iterations(usize),
    /// Stops when the training error drops below the provided threshold
    ErrorThreshold(f64),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    fn should_stop(
        &self,
        iteration: usize,
        training_error: f64,
        start_time: Instant,
    ) -> bool {
        use self::StopCondition::*;
        match *self {
            Iterations(iterations) => iteration >= iterations,
            ErrorThreshold(threshold) => training_error < threshold,
            Duration(duration) => start_time.elapsed() > duration,
        }
    }
}
