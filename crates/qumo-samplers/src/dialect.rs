//! Sampler dialects.
//!
//! The three solver variants share one kernel, parameterized by the
//! non-linearity applied to the binary block, the wall on the state, the
//! bias of the restoring term, and whether the wall is inelastic (zeroing
//! the velocity where the state is clamped):
//!
//! | Dialect        | Non-linearity | Wall     | Bias | Inelastic |
//! |----------------|---------------|----------|------|-----------|
//! | mixed-Ising    | sign          | [-1, 1]  | 0    | no        |
//! | positive-QUMO  | step at 1/2   | [0, 1]   | 0.5  | yes       |
//! | QUMO           | step at 1/2   | [-1, 1]  | 0.5  | yes       |

use qumo_core::nonlinearity::Nonlinearity;
use qumo_core::wall::Wall;

/// One row of the dialect table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
    pub nonlinearity: Nonlinearity,
    pub wall: Wall,
    /// Center of the annealing restoring term.
    pub bias: f64,
    /// Whether clamping also zeroes the velocity at the wall.
    pub inelastic: bool,
    pub label: &'static str,
}

impl Dialect {
    /// Binary coordinates in `{-1, 1}`, continuous in `[-1, 1]`.
    pub fn mixed_ising() -> Self {
        Dialect {
            nonlinearity: Nonlinearity::Sign,
            wall: Wall::ising(),
            bias: 0.0,
            inelastic: false,
            label: "ising",
        }
    }

    /// Binary coordinates in `{0, 1}`, continuous in `[0, 1]`.
    pub fn positive_qumo() -> Self {
        Dialect {
            nonlinearity: Nonlinearity::StepHalf,
            wall: Wall::positive(),
            bias: 0.5,
            inelastic: true,
            label: "positive-qumo",
        }
    }

    /// Binary coordinates in `{0, 1}`, continuous in `[-1, 1]`.
    pub fn qumo() -> Self {
        Dialect {
            nonlinearity: Nonlinearity::StepHalf,
            wall: Wall::ising(),
            bias: 0.5,
            inelastic: true,
            label: "qumo",
        }
    }
}
