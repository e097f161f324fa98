//! # qumo-samplers
//!
//! The batched sampler at the heart of the QUMO solver.
//!
//! Many independent trajectories evolve in lock-step under gradient
//! descent with momentum and a linearly decaying annealing coefficient;
//! element-wise non-linearities and inelastic walls keep the binary block
//! near its admissible values. The pieces, bottom-up:
//!
//! - [`RngKey`]: stream-derived keys for replayable workers and runs
//! - [`Setup`] / [`SamplerWorkspace`]: per-trajectory coefficients and the
//!   pre-allocated scratch buffers for one batch
//! - [`Dialect`] / [`run_kernel`]: the fused inner loop, parameterized by
//!   non-linearity, wall and bias for the three solver dialects
//! - [`SampleTracer`] / [`ParameterAdjuster`]: optional per-iteration hooks
//! - [`Collector`]: pluggable reducers over (energies, spins) streams
//! - [`explore`]: the batched sweep over a configuration set under a
//!   cancellation token
//!
//! ## Example
//!
//! ```rust,ignore
//! use qumo_samplers::{explore, BestAssignment, Dialect, ExplorationParams, RngKey, Setup};
//!
//! let setup = Setup::new(annealing, gradient, momentum, 0.5)?;
//! let mut collector = BestAssignment::new(problem.n());
//! let result = explore(
//!     &problem, &setup, &Dialect::mixed_ising(), &params,
//!     &cancel, RngKey::new(42), &mut collector,
//! )?;
//! ```

pub mod collector;
pub mod dialect;
pub mod explore;
pub mod kernel;
pub mod rng;
pub mod setup;
pub mod tracer;

pub use collector::*;
pub use dialect::*;
pub use explore::*;
pub use kernel::*;
pub use rng::*;
pub use setup::*;
pub use tracer::*;
