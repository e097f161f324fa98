//! # qumo-solver
//!
//! The three-phase configuration-space search over the batched sampler.
//!
//! A solve proceeds through:
//!
//! 1. **Phase 1**: wide, shallow exploration of a Sobol-sampled
//!    hyperparameter space; configurations ranked by mean energy.
//! 2. **Phase 2**: deeper re-exploration of the pruned top set; re-ranked.
//! 3. **Deep search**: repeated timed runs over the best configurations,
//!    each with an adaptively chosen iteration count, until the time
//!    budget runs out.
//!
//! Each phase drives the exploration loop through a worker pool
//! ([`run_for`]) under a cancellation token: one worker for GPU engines,
//! all-cores-minus-four for the CPU engine. The returned
//! [`SolverRuntime`] carries per-phase statistics for [`find_best`] and
//! [`results_summary`].
//!
//! ## Entry points
//!
//! [`solve`] (mixed-Ising), [`solve_positive`] (positive-QUMO) and
//! [`solve_qumo`] (QUMO) share the orchestrator and differ only in the
//! sampler dialect.
//!
//! ```rust,ignore
//! use qumo_solver::{solve, SolverOptions};
//! use qumo_samplers::RngKey;
//! use std::time::Duration;
//!
//! let runtime = solve(&problem, Duration::from_secs(30), RngKey::new(42),
//!                     &SolverOptions::default())?;
//! let best = qumo_solver::find_best(&runtime);
//! ```

pub mod model;
pub mod phases;
pub mod pool;
pub mod results;
pub mod solve;

pub use model::*;
pub use phases::*;
pub use pool::*;
pub use results::*;
pub use solve::*;
