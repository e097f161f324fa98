//! Per-iteration kernel hooks.
//!
//! A [`SampleTracer`] observes the post-update state once per iteration; a
//! [`ParameterAdjuster`] may rewrite the per-trajectory gradient and
//! momentum coefficients before each step (e.g. to inject noise). Both
//! default to no-ops, and neither may mix state across trajectories.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Observes trajectory state while the kernel runs.
pub trait SampleTracer<B: Backend> {
    fn record(&mut self, iteration: u32, state: &Tensor<B, 2>);
}

/// The default: observe nothing.
pub struct NullTracer;

impl<B: Backend> SampleTracer<B> for NullTracer {
    fn record(&mut self, _iteration: u32, _state: &Tensor<B, 2>) {}
}

/// Snapshots the state every `every` iterations.
pub struct PeriodicTracer<B: Backend> {
    pub every: u32,
    pub frames: Vec<Tensor<B, 2>>,
}

impl<B: Backend> PeriodicTracer<B> {
    pub fn new(every: u32) -> Self {
        PeriodicTracer {
            every: every.max(1),
            frames: Vec::new(),
        }
    }
}

impl<B: Backend> SampleTracer<B> for PeriodicTracer<B> {
    fn record(&mut self, iteration: u32, state: &Tensor<B, 2>) {
        if iteration % self.every == 0 {
            self.frames.push(state.clone());
        }
    }
}

/// Snapshots the state at a planned set of iterations.
pub struct PlanTracer<B: Backend> {
    plan: Vec<u32>,
    pub frames: Vec<Tensor<B, 2>>,
}

impl<B: Backend> PlanTracer<B> {
    pub fn new(mut plan: Vec<u32>) -> Self {
        plan.sort_unstable();
        plan.dedup();
        PlanTracer {
            plan,
            frames: Vec::new(),
        }
    }
}

impl<B: Backend> SampleTracer<B> for PlanTracer<B> {
    fn record(&mut self, iteration: u32, state: &Tensor<B, 2>) {
        if self.plan.binary_search(&iteration).is_ok() {
            self.frames.push(state.clone());
        }
    }
}

/// Rewrites `(gradient, momentum)` before each kernel step.
pub trait ParameterAdjuster<B: Backend> {
    fn adjust(
        &self,
        gradient: Tensor<B, 2>,
        momentum: Tensor<B, 2>,
        annealing_live: &Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>);
}

/// The default: pass the coefficients through unchanged.
pub struct NoAdjustment;

impl<B: Backend> ParameterAdjuster<B> for NoAdjustment {
    fn adjust(
        &self,
        gradient: Tensor<B, 2>,
        momentum: Tensor<B, 2>,
        _annealing_live: &Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (gradient, momentum)
    }
}
