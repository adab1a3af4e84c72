//! Layered feed-forward networks and contractive autoencoders, trained with
//! hand-derived gradients, momentum and per-layer batching.

#[macro_use]
extern crate serde_derive;

pub mod activator;
pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod matrix;
pub mod record;
pub mod rng;
pub mod trainer;

mod utils;

pub use crate::activator::Activator;
pub use crate::architecture::{Architecture, Problem};
pub use crate::config::Hyperparameters;
pub use crate::error::{Error, Result};
pub use crate::layers::{AnyLayer, Contractive, Dense, Layer, Paradigm};
