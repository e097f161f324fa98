//! Error kinds shared across the solver crates.
//!
//! Structural errors (`InvalidShape`, `InvalidRange`, `InvalidTimeout`,
//! `NoEngines`, `EmptyConfig`) surface to the caller immediately.
//! `NumericalDegeneracy` is recovered locally by the spectral normalizer
//! (substituting a unit factor with a warning) and only exists as a kind so
//! callers embedding the normalizer elsewhere can observe it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QumoError {
    /// Matrix not square, vector length mismatch, asymmetric interactions,
    /// or a non-zero diagonal entry on the binary block.
    #[error("shape mismatch: expected {expected}, found {found}")]
    InvalidShape { expected: String, found: String },

    /// A fraction or interval is outside its required range.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A time budget below the one-second floor.
    #[error("time budget of {seconds:.3}s is below the 1s minimum")]
    InvalidTimeout { seconds: f64 },

    /// The engine registry was empty when a best engine was requested.
    #[error("no compute engines registered")]
    NoEngines,

    /// An exploration was started with zero configurations.
    #[error("empty configuration: setup contains no trajectories")]
    EmptyConfig,

    /// The eigenvalue iteration failed after all retries.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

pub type Result<T> = std::result::Result<T, QumoError>;

impl QumoError {
    /// Shorthand for the pervasive "these two lengths must match" check.
    pub fn shape(expected: impl ToString, found: impl ToString) -> Self {
        QumoError::InvalidShape {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
