//! Error types for the fever monitor library.

use thiserror::Error;

use crate::detector::DetectorError;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller supplied an argument outside its documented domain
    /// (bad colormap index, non-positive width, unknown class id).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A crop rectangle does not fit inside the frame.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// The configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The detector collaborator failed to build or to produce a frame.
    #[error("Detector failure: {0}")]
    Detector(#[from] DetectorError),

    /// The operation is not allowed in the worker's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Any other fault raised while the worker loop was running.
    #[error("Runtime failure: {0}")]
    Runtime(String),
}

impl Error {
    /// Wraps any fault raised inside a loop iteration. Faults that are already
    /// runtime failures are passed through untouched.
    pub fn into_runtime(self) -> Self {
        match self {
            Error::Runtime(_) => self,
            other => Error::Runtime(other.to_string()),
        }
    }
}

/// Convenience type alias for Results with our Error type.
pub type Result<T> = std::result::Result<T, Error>;
