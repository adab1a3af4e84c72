//! Serialized form of layers and architectures.
//!
//! A layer is a flat record of its shape, hyperparameters, activation and
//! parameter blobs; an autoencoder additionally nests its decoder. An
//! architecture lists its layer names in `layer_access` and stores each
//! layer under its name:
//!
//! ```json
//! {
//!   "layer_access": ["layer_0"],
//!   "layer_0": {
//!     "class": "layer", "inputs": 2, "outputs": 1,
//!     "learning": 0.1, "momentum": 0.5, "regularizer": 0.0, "batchsize": 1,
//!     "activation": "sigmoid",
//!     "weights": "1 2\n2.5e-1 -1e0", "bias": "1 1\n0e0"
//!   }
//! }
//! ```
//!
//! Decoding builds a fresh value and only hands it out once every record
//! converted.

use crate::activator::Activator;
use crate::architecture::Architecture;
use crate::layers::contractive::DEFAULT_NOISE_LEVEL;
use crate::layers::dense::DEFAULT_JACOBIAN_PENALTY;
use crate::layers::{AnyLayer, Contractive, Dense, Layer, Paradigm};
use crate::matrix::{destringify, destringify_vector, stringify, stringify_vector};
use crate::{Error, Result};

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

fn default_jacobian_penalty() -> f64 {
    DEFAULT_JACOBIAN_PENALTY
}

/// One serialized layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub class: String,
    pub inputs: usize,
    pub outputs: usize,
    pub learning: f64,
    pub momentum: f64,
    pub regularizer: f64,
    pub batchsize: usize,
    pub activation: Activator,
    pub weights: String,
    pub bias: String,
    #[serde(default)]
    pub contractive: bool,
    #[serde(default = "default_jacobian_penalty")]
    pub jacobian_penalty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoder: Option<Box<LayerRecord>>,
}

impl<'a> From<&'a Dense> for LayerRecord {
    fn from(layer: &'a Dense) -> Self {
        LayerRecord {
            class: Paradigm::Basic.class().to_owned(),
            inputs: layer.input_len(),
            outputs: layer.output_len(),
            learning: layer.learning(),
            momentum: layer.momentum(),
            regularizer: layer.regularizer(),
            batchsize: layer.batch_size(),
            activation: layer.activator(),
            weights: stringify(layer.weights().view()),
            bias: stringify_vector(layer.bias()),
            contractive: layer.is_contractive(),
            jacobian_penalty: layer.jacobian_penalty(),
            noise_level: None,
            decoder: None,
        }
    }
}

impl<'a> From<&'a Contractive> for LayerRecord {
    fn from(layer: &'a Contractive) -> Self {
        LayerRecord {
            class: Paradigm::Contractive.class().to_owned(),
            noise_level: Some(layer.noise_level()),
            decoder: Some(Box::new(layer.decoder().into())),
            ..LayerRecord::from(layer.encoder())
        }
    }
}

impl<'a> From<&'a AnyLayer> for LayerRecord {
    fn from(layer: &'a AnyLayer) -> Self {
        match layer {
            AnyLayer::Basic(l) => l.into(),
            AnyLayer::Contractive(l) => l.into(),
        }
    }
}

impl LayerRecord {
    /// Rebuilds the affine part of the record, ignoring `class` and
    /// `decoder`.
    fn to_dense(&self) -> Result<Dense> {
        let weights = destringify("weights", &self.weights)?;
        if weights.dim() != (self.outputs, self.inputs) {
            return Err(Error::Malformed {
                field: "weights",
                reason: format!(
                    "blob is {}x{} but the layer is {}x{}",
                    weights.nrows(),
                    weights.ncols(),
                    self.outputs,
                    self.inputs
                ),
            });
        }
        let bias = destringify_vector("bias", &self.bias)?;
        let mut layer = Dense::from_parts(self.activation, weights, bias)?;

        layer.set_learning(self.learning);
        layer.set_momentum(self.momentum);
        layer.set_batch_size(self.batchsize)?;
        layer.set_jacobian_penalty(self.jacobian_penalty);
        if self.contractive {
            if self.regularizer != 0.0 {
                return Err(Error::MutuallyExclusive);
            }
            layer.set_contractive()?;
        } else {
            layer.set_regularizer(self.regularizer)?;
        }
        Ok(layer)
    }
}

impl TryFrom<LayerRecord> for AnyLayer {
    type Error = Error;

    fn try_from(record: LayerRecord) -> Result<Self> {
        if record.class == Paradigm::Basic.class() {
            return Ok(AnyLayer::Basic(record.to_dense()?));
        }
        if record.class == Paradigm::Contractive.class() {
            let encoder = record.to_dense()?;
            let decoder = match record.decoder {
                Some(ref decoder) => decoder.to_dense()?,
                None => {
                    return Err(Error::Malformed {
                        field: "decoder",
                        reason: "missing from a contractive layer".to_owned(),
                    })
                }
            };
            let noise = record.noise_level.unwrap_or(DEFAULT_NOISE_LEVEL);
            return Ok(AnyLayer::Contractive(Contractive::from_parts(
                encoder, decoder, noise,
            )?));
        }
        Err(Error::UnrecognizedClass(record.class))
    }
}

/// A serialized architecture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureRecord {
    /// The names of the layers, bottom first.
    pub layer_access: Vec<String>,
    #[serde(flatten)]
    pub layers: BTreeMap<String, LayerRecord>,
}

impl<'a> From<&'a Architecture> for ArchitectureRecord {
    fn from(network: &'a Architecture) -> Self {
        let mut record = ArchitectureRecord {
            layer_access: Vec::with_capacity(network.len()),
            layers: BTreeMap::new(),
        };
        for (i, layer) in network.layers().iter().enumerate() {
            let name = format!("layer_{}", i);
            record.layers.insert(name.clone(), layer.into());
            record.layer_access.push(name);
        }
        record
    }
}

impl TryFrom<ArchitectureRecord> for Architecture {
    type Error = Error;

    fn try_from(mut record: ArchitectureRecord) -> Result<Self> {
        let mut network = Architecture::new();
        for name in &record.layer_access {
            let layer = record.layers.remove(name).ok_or_else(|| {
                Error::Malformed {
                    field: "layer_access",
                    reason: format!("no layer named {}", name),
                }
            })?;
            network.add_layer(AnyLayer::try_from(layer)?)?;
        }
        Ok(network)
    }
}

impl Architecture {
    /// Serializes the network to a compact JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&ArchitectureRecord::from(self))?)
    }

    /// Serializes the network to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&ArchitectureRecord::from(self))?)
    }

    /// Parses a network from a JSON string.
    pub fn from_json(s: &str) -> Result<Self> {
        let record: ArchitectureRecord = serde_json::from_str(s)?;
        Architecture::try_from(record)
    }

    /// Saves the network to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Architecture::from_json(&fs::read_to_string(path)?)
    }
}
