//! Batched Hamiltonian evaluation.
//!
//! For a spin matrix with one trajectory per column,
//!
//! ```text
//! energies[j] = -1/2 * spins[:,j]' Q spins[:,j] - h . spins[:,j]
//! ```
//!
//! The device path computes `Q * spins` once and reduces column-wise; the
//! host extraction at the end doubles as the backend barrier, so energies
//! always reflect the latest spins. Backends computing below single
//! precision route through the widened `f64` host copy instead.

use crate::problem::Problem;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Absolute floor for "equal to the minimum" comparisons.
const MIN_HIT_ATOL: f64 = 1e-9;
/// Relative tolerance for "equal to the minimum" comparisons, sized for
/// single-precision accumulation error.
const MIN_HIT_RTOL: f64 = 1e-6;

/// Per-trajectory energies for every column of `spins`.
pub fn calculate<B: Backend>(problem: &Problem<B>, spins: &Tensor<B, 2>) -> Vec<f64> {
    let cols = spins.dims()[1];
    let mut out = vec![0.0; cols];
    calculate_into(&mut out, problem, spins);
    out
}

/// In-place variant writing the first `out.len()` column energies.
///
/// When the workspace is wider than the measured batch, `spins` is
/// truncated to the first `out.len()` columns.
pub fn calculate_into<B: Backend>(out: &mut [f64], problem: &Problem<B>, spins: &Tensor<B, 2>) {
    let [n, cols] = spins.dims();
    debug_assert_eq!(n, problem.n());
    let m = out.len().min(cols);

    if problem.wide_eval() {
        let host: Vec<f64> = spins.clone().into_data().iter::<f64>().collect();
        calculate_wide(&mut out[..m], problem, &host, n, cols);
        return;
    }

    let s = if m < cols {
        spins.clone().slice([0..n, 0..m])
    } else {
        spins.clone()
    };

    let fields = problem.q().clone().matmul(s.clone());
    let mut energies = (s.clone() * fields).sum_dim(0).mul_scalar(-0.5);
    if let Some(h) = problem.h() {
        let h_col = h.clone().reshape([n as i32, 1]);
        energies = energies - (s * h_col).sum_dim(0);
    }

    for (slot, e) in out[..m].iter_mut().zip(energies.into_data().iter::<f64>()) {
        *slot = e;
    }
}

/// Host `f64` evaluation against the widened problem copy.
fn calculate_wide<B: Backend>(
    out: &mut [f64],
    problem: &Problem<B>,
    spins_host: &[f64],
    n: usize,
    cols: usize,
) {
    let q = problem.q_wide();
    let h = problem.h_wide();
    for (j, slot) in out.iter_mut().enumerate() {
        let mut quad = 0.0;
        for i in 0..n {
            let si = spins_host[i * cols + j];
            if si == 0.0 {
                continue;
            }
            let mut row = 0.0;
            for (k, qik) in q[i * n..(i + 1) * n].iter().enumerate() {
                row += qik * spins_host[k * cols + j];
            }
            quad += si * row;
        }
        let mut e = -0.5 * quad;
        if let Some(h) = h {
            for (i, hi) in h.iter().enumerate() {
                e -= hi * spins_host[i * cols + j];
            }
        }
        *slot = e;
    }
}

/// For an observation matrix stored as per-column contiguous blocks of
/// `rows` entries, find the global minimum and count, per column, the
/// entries approximately equal to it. Columns tied at the global minimum
/// all contribute their hits.
pub fn count_min_energy_hits(data: &[f64], columns: usize) -> Vec<usize> {
    if columns == 0 || data.is_empty() {
        return vec![0; columns];
    }
    let rows = data.len() / columns;
    let min = data
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    (0..columns)
        .map(|c| {
            data[c * rows..(c + 1) * rows]
                .iter()
                .filter(|&&e| approx_min(e, min))
                .count()
        })
        .collect()
}

/// Whether `e` counts as a hit of the minimum `min`.
pub fn approx_min(e: f64, min: f64) -> bool {
    (e - min).abs() <= MIN_HIT_ATOL + MIN_HIT_RTOL * min.abs()
}
