//! Spectral normalization against matrices with known spectra.

use qumo_core::backend::{init_cpu_device, CpuBackend};
use qumo_core::normalize::{extreme_eigenvalues, spectral_factor};
use qumo_core::problem::Problem;

/// Adjacency of the 5-cycle, negated the way a MaxCut input arrives.
fn negated_cycle5() -> Vec<Vec<f64>> {
    let mut a = vec![vec![0.0; 5]; 5];
    for i in 0..5 {
        let j = (i + 1) % 5;
        a[i][j] = -1.0;
        a[j][i] = -1.0;
    }
    a
}

#[test]
fn test_cycle_spectrum() {
    // eigenvalues of -A(C5) are -2 cos(2 pi k / 5): extremes -2 and
    // the golden ratio 1.618...
    let device = init_cpu_device();
    let problem = Problem::<CpuBackend>::from_rows(&negated_cycle5(), None, 5, &device)
        .expect("valid problem");

    let (lo, hi) =
        extreme_eigenvalues(problem.q_wide(), problem.n(), 1e-9).expect("small matrix converges");
    assert!((lo - (-2.0)).abs() < 1e-6, "lo = {lo}");
    assert!((hi - 1.618_033_988).abs() < 1e-6, "hi = {hi}");
}

#[test]
fn test_factor_for_indefinite_input_is_lmax() {
    let device = init_cpu_device();
    let problem = Problem::<CpuBackend>::from_rows(&negated_cycle5(), None, 5, &device)
        .expect("valid problem");

    // opposite-sign extremes with lmax above the floor: factor = lmax
    let factor = spectral_factor(problem.q_wide(), problem.n(), 1e-9, 3);
    assert!((factor - 1.618_033_988).abs() < 1e-6, "factor = {factor}");
}

#[test]
fn test_gradient_transform_shrinks_with_the_spectrum() {
    // the solve-time transform g <- 1 / (g * lambda) keeps the effective
    // step proportional to the spectral scale
    let device = init_cpu_device();
    let scaled: Vec<Vec<f64>> = negated_cycle5()
        .iter()
        .map(|row| row.iter().map(|v| v * 10.0).collect())
        .collect();
    let problem =
        Problem::<CpuBackend>::from_rows(&scaled, None, 5, &device).expect("valid problem");

    let factor = spectral_factor(problem.q_wide(), problem.n(), 1e-9, 3);
    assert!((factor - 16.180_339_88).abs() < 1e-4, "factor = {factor}");

    let g = 0.5;
    let transformed = 1.0 / (g * factor);
    assert!(transformed < 0.13, "transformed gradient {transformed}");
}
