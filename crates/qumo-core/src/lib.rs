//! # qumo-core
//!
//! Core types and compute backends for the QUMO heuristic solver.
//!
//! QUMO (Quadratic Unconstrained Mixed Optimization) problems minimize
//!
//! ```text
//! H(x) = -1/2 * x' Q x - h' x
//! ```
//!
//! over a mix of binary and box-constrained continuous coordinates. This
//! crate provides the foundational pieces shared by the samplers and the
//! three-phase solver:
//!
//! - [`Problem`]: the immutable interaction matrix / external field record
//! - [`Wall`]: inelastic bound enforcement (clamp + momentum reset)
//! - [`Nonlinearity`]: registrable element-wise maps (sign, tanh, step)
//! - [`energy`]: batched Hamiltonian evaluation and minima counting
//! - [`ConfigurationSpace`]: hyperparameter box with a Sobol sampler
//! - [`normalize`]: spectral factor of the interaction matrix
//! - [`engine`]: process-wide compute engine registry
//! - [`estimate`]: resource heuristics for the phased search
//!
//! ## Compute Backends
//!
//! All batched math is generic over `burn::tensor::backend::Backend`. The
//! `cpu` feature (default) enables the ndarray backend, `gpu` enables WGPU:
//!
//! ```rust,ignore
//! use qumo_core::backend::{init_cpu_device, CpuBackend};
//! let device = init_cpu_device();
//! ```

pub mod backend;
pub mod cancel;
pub mod configspace;
pub mod energy;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod nonlinearity;
pub mod normalize;
pub mod problem;
pub mod wall;

pub use cancel::*;
pub use configspace::*;
pub use energy::*;
pub use engine::*;
pub use error::*;
pub use estimate::*;
pub use nonlinearity::*;
pub use normalize::*;
pub use problem::*;
pub use wall::*;
