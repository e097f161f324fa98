//! Inelastic walls: bound enforcement for trajectory state.
//!
//! A wall clamps every element of the state into `[lower, upper]`.
//! The *inelastic* variant also zeroes the corresponding momentum
//! coordinate wherever the state was clamped, so a trajectory that hits a
//! bound loses the velocity that carried it there instead of bouncing.
//!
//! Both a batched tensor form (one thread per element on GPU backends) and
//! a scalar slice form (SIMD-friendly loop for host-side code) are
//! provided.

use crate::error::{QumoError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};
use serde::{Deserialize, Serialize};

/// A `[lower, upper]` clamp specialized at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub lower: f64,
    pub upper: f64,
}

impl Wall {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !(lower <= upper) {
            return Err(QumoError::InvalidRange(format!(
                "wall bounds must satisfy lower <= upper, got [{lower}, {upper}]"
            )));
        }
        Ok(Wall { lower, upper })
    }

    /// The Ising wall `[-1, 1]`.
    pub const fn ising() -> Self {
        Wall {
            lower: -1.0,
            upper: 1.0,
        }
    }

    /// The positive wall `[0, 1]`.
    pub const fn positive() -> Self {
        Wall {
            lower: 0.0,
            upper: 1.0,
        }
    }

    /// Clamp every element of `x` into the wall.
    pub fn project<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        x.clamp(self.lower, self.upper)
    }

    /// Clamp `x` and report which elements moved.
    pub fn project_masked<B: Backend, const D: usize>(
        &self,
        x: Tensor<B, D>,
    ) -> (Tensor<B, D>, Tensor<B, D, Bool>) {
        let clamped = x.clone().clamp(self.lower, self.upper);
        let moved = clamped.clone().not_equal(x);
        (clamped, moved)
    }

    /// Clamp `x` and zero `momentum` wherever `x` was clamped.
    pub fn project_with_momentum<B: Backend, const D: usize>(
        &self,
        x: Tensor<B, D>,
        momentum: Tensor<B, D>,
    ) -> (Tensor<B, D>, Tensor<B, D>) {
        let (clamped, moved) = self.project_masked(x);
        (clamped, momentum.mask_fill(moved, 0.0))
    }

    /// Scalar-loop clamp for host-side slices.
    pub fn project_slice(&self, x: &mut [f64]) {
        for v in x.iter_mut() {
            if *v > self.upper {
                *v = self.upper;
            } else if *v < self.lower {
                *v = self.lower;
            }
        }
    }

    /// Scalar-loop clamp that zeroes `momentum[i]` when `x[i]` is clamped.
    pub fn project_slice_with_momentum(&self, x: &mut [f64], momentum: &mut [f64]) -> Result<()> {
        if x.len() != momentum.len() {
            return Err(QumoError::shape(
                format!("momentum of length {}", x.len()),
                momentum.len(),
            ));
        }
        for (v, m) in x.iter_mut().zip(momentum.iter_mut()) {
            if *v > self.upper {
                *v = self.upper;
                *m = 0.0;
            } else if *v < self.lower {
                *v = self.lower;
                *m = 0.0;
            }
        }
        Ok(())
    }
}
