//! Modeling helpers at the solver boundary.
//!
//! The solver works on box-constrained variables; user models arrive with
//! arbitrary finite bounds and a mix of binary and continuous variables.
//! This module carries the small conversions the core needs to talk to a
//! modeling layer: the diagonal affine bound scaling, the scalar-QUMO to
//! mixed-Ising rewrite, and graph-cut accounting for MaxCut-style inputs.

use qumo_core::error::{QumoError, Result};

/// Diagonal affine map `Y = A y + b` taking user bounds `[l, u]` onto
/// solver bounds `[L, U]`, per variable. Both bounds must be finite.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableScaling {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl VariableScaling {
    pub fn new(user: &[(f64, f64)], solver: &[(f64, f64)]) -> Result<Self> {
        if user.len() != solver.len() {
            return Err(QumoError::shape(
                format!("{} solver bound pairs", user.len()),
                solver.len(),
            ));
        }
        let mut scale = Vec::with_capacity(user.len());
        let mut offset = Vec::with_capacity(user.len());
        for (i, (&(l, u), &(lo, hi))) in user.iter().zip(solver.iter()).enumerate() {
            if !(l.is_finite() && u.is_finite()) {
                return Err(QumoError::InvalidRange(format!(
                    "variable {i} must have finite bounds, got [{l}, {u}]"
                )));
            }
            if u <= l {
                return Err(QumoError::InvalidRange(format!(
                    "variable {i} bounds must satisfy l < u, got [{l}, {u}]"
                )));
            }
            let a = (hi - lo) / (u - l);
            scale.push(a);
            offset.push(lo - l * a);
        }
        Ok(VariableScaling { scale, offset })
    }

    /// Map user values into the solver box.
    pub fn forward(&self, y: &[f64]) -> Vec<f64> {
        y.iter()
            .zip(self.scale.iter().zip(self.offset.iter()))
            .map(|(&v, (&a, &b))| a * v + b)
            .collect()
    }

    /// Map solver values back to user space.
    pub fn inverse(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.scale.iter().zip(self.offset.iter()))
            .map(|(&v, (&a, &b))| (v - b) / a)
            .collect()
    }
}

/// A problem rewritten for the mixed-Ising dialect.
///
/// Energy convention: `E(s) = -1/2 s' Q s - 1/2 f' s + offset`, with
/// binary coordinates in `{-1, 1}`.
#[derive(Debug, Clone, PartialEq)]
pub struct IsingForm {
    /// Row-major symmetric quadratic coefficients.
    pub quadratic: Vec<Vec<f64>>,
    pub field: Vec<f64>,
    pub offset: f64,
}

impl IsingForm {
    /// Flip the optimization sense by negating the coefficients.
    pub fn negated(&self) -> IsingForm {
        IsingForm {
            quadratic: self
                .quadratic
                .iter()
                .map(|row| row.iter().map(|v| -v).collect())
                .collect(),
            field: self.field.iter().map(|v| -v).collect(),
            offset: -self.offset,
        }
    }
}

/// Rewrite a scalar-QUMO problem (binary prefix in `{0, 1}`) into the
/// mixed-Ising form via `x_b = (1 + s_b) / 2`.
///
/// Couplings between a binary and a continuous coordinate are halved,
/// binary-binary couplings are quartered, and the linear terms they shed
/// land in the field; the zero binary diagonal keeps the offset free of
/// quadratic self-terms.
pub fn qumo_to_ising(q: &[Vec<f64>], h: Option<&[f64]>, binary: usize) -> Result<IsingForm> {
    let n = q.len();
    for (i, row) in q.iter().enumerate() {
        if row.len() != n {
            return Err(QumoError::shape(format!("rows of length {n}"), row.len()));
        }
        if i < binary && row[i] != 0.0 {
            return Err(QumoError::shape(
                "zero diagonal on the binary block",
                format!("Q[{i}][{i}] = {}", row[i]),
            ));
        }
    }
    if let Some(h) = h {
        if h.len() != n {
            return Err(QumoError::shape(format!("field of length {n}"), h.len()));
        }
    }

    let mut quadratic = vec![vec![0.0; n]; n];
    let mut field = vec![0.0; n];
    let mut offset = 0.0;

    for i in 0..n {
        for j in 0..n {
            let v = q[i][j];
            if v == 0.0 {
                continue;
            }
            let bin_i = i < binary;
            let bin_j = j < binary;
            quadratic[i][j] = match (bin_i, bin_j) {
                (false, false) => v,
                (true, true) if i != j => {
                    // each off-diagonal entry is visited twice; split the
                    // linear and constant remainders accordingly
                    field[i] += v / 2.0;
                    offset -= v / 8.0;
                    v / 4.0
                }
                (true, true) => v,
                // exactly one binary index: the continuous side picks up
                // the shed linear term
                _ => {
                    if bin_i {
                        field[j] += v / 2.0;
                    } else {
                        field[i] += v / 2.0;
                    }
                    v / 2.0
                }
            };
        }
    }

    if let Some(h) = h {
        for (i, &hi) in h.iter().enumerate() {
            if i < binary {
                field[i] += hi;
                offset -= hi / 2.0;
            } else {
                field[i] += 2.0 * hi;
            }
        }
    }

    Ok(IsingForm {
        quadratic,
        field,
        offset,
    })
}

/// Recover a graph-cut size from a Hamiltonian value, for MaxCut inputs
/// whose adjacency summed to `total_weight`.
pub fn graph_cut_from_hamiltonian(total_weight: f64, objective: f64) -> f64 {
    (total_weight / 2.0 - objective) / 2.0
}

/// Exact cut weight of a `{-1, 1}` partition.
pub fn cut_value(weights: &[Vec<f64>], partition: &[f64]) -> f64 {
    let n = weights.len();
    let mut value = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            if partition[i] * partition[j] < 0.0 {
                value += weights[i][j];
            }
        }
    }
    value
}
