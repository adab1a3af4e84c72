//! Error types shared by every module of the crate.

use crate::layers::Paradigm;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, training or loading a network.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A vector or matrix did not have the length the receiver expects.
    #[error("dimension mismatch for {what}: got {got}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// An autoencoder-only operation was called on a layer that is not one.
    #[error("{operation}() is only valid for autoencoder layers, called on a {paradigm} layer")]
    UnsupportedForVariant {
        operation: &'static str,
        paradigm: Paradigm,
    },

    #[error("a layer cannot be regularized and contractive at the same time")]
    MutuallyExclusive,

    /// A broadcast setter was called before any layer was added.
    #[error("can't set {0}: network has no layers")]
    NoLayers(&'static str),

    #[error("layer {index} is beyond the {len} layers in the architecture")]
    OutOfRange { index: usize, len: usize },

    #[error("class {0} not recognized")]
    UnrecognizedClass(String),

    /// A serialized field was present but could not be converted.
    #[error("malformed field {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid noise level: {0}")]
    Noise(#[from] rand_distr::NormalError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fails with a `DimensionMismatch` unless `got == expected`.
pub(crate) fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            what,
            got,
            expected,
        })
    }
}
