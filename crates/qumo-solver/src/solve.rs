//! Solver entry points: one per sampler dialect.
//!
//! All three share the orchestrator in [`crate::phases`]; the dialect
//! fixes the non-linearity, wall and bias of the inner kernel (see the
//! table in `qumo_samplers::dialect`).

use crate::phases::{solve_with_dialect, SolverOptions, SolverRuntime};
use burn::tensor::backend::Backend;
use qumo_core::engine::current_engine;
use qumo_core::error::Result;
use qumo_core::problem::Problem;
use qumo_samplers::dialect::Dialect;
use qumo_samplers::rng::RngKey;
use std::time::Duration;

/// Solve in the mixed-Ising dialect: binary coordinates in `{-1, 1}`,
/// continuous in `[-1, 1]`.
pub fn solve<B: Backend>(
    problem: &Problem<B>,
    timeout: Duration,
    key: RngKey,
    options: &SolverOptions,
) -> Result<SolverRuntime> {
    let engine = current_engine()?;
    solve_with_dialect(problem, timeout, key, options, &Dialect::mixed_ising(), &engine)
}

/// Solve in the positive-QUMO dialect: binary in `{0, 1}`, continuous in
/// `[0, 1]`.
pub fn solve_positive<B: Backend>(
    problem: &Problem<B>,
    timeout: Duration,
    key: RngKey,
    options: &SolverOptions,
) -> Result<SolverRuntime> {
    let engine = current_engine()?;
    solve_with_dialect(problem, timeout, key, options, &Dialect::positive_qumo(), &engine)
}

/// Solve in the QUMO dialect: binary in `{0, 1}`, continuous in `[-1, 1]`.
pub fn solve_qumo<B: Backend>(
    problem: &Problem<B>,
    timeout: Duration,
    key: RngKey,
    options: &SolverOptions,
) -> Result<SolverRuntime> {
    let engine = current_engine()?;
    solve_with_dialect(problem, timeout, key, options, &Dialect::qumo(), &engine)
}
