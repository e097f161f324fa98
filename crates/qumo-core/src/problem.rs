//! The problem record: interaction matrix, external field, binary prefix.
//!
//! Coordinates `0..binary` are binary; `binary..n` are continuous. The
//! interaction matrix must be symmetric with a zero diagonal on the binary
//! block. A widened `f64` host copy of `(Q, h)` is kept alongside the
//! device tensors: the spectral normalizer always reads it, and the energy
//! evaluator falls back to it when the backend computes in less than single
//! precision.

use crate::error::{QumoError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Relative tolerance for the symmetry check at construction.
const SYMMETRY_RTOL: f64 = 1e-6;

/// An immutable QUMO problem instance on a compute backend.
#[derive(Debug, Clone)]
pub struct Problem<B: Backend> {
    n: usize,
    binary: usize,
    q: Tensor<B, 2>,
    h: Option<Tensor<B, 1>>,
    q_wide: Vec<f64>,
    h_wide: Option<Vec<f64>>,
    wide_eval: bool,
}

impl<B: Backend> Problem<B> {
    /// Build a problem from a row-major flat matrix.
    ///
    /// Validates squareness, symmetry, the zero diagonal on the binary
    /// block, and the field length. The inputs are copied; the caller's
    /// buffers are never mutated by the solver.
    pub fn new(
        q_flat: Vec<f64>,
        h: Option<Vec<f64>>,
        binary: usize,
        device: &B::Device,
    ) -> Result<Self> {
        let n2 = q_flat.len();
        let n = (n2 as f64).sqrt().round() as usize;
        if n * n != n2 {
            return Err(QumoError::shape("a square matrix", format!("{n2} elements")));
        }
        if binary > n {
            return Err(QumoError::shape(
                format!("binary prefix <= {n}"),
                binary,
            ));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let a = q_flat[i * n + j];
                let b = q_flat[j * n + i];
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > SYMMETRY_RTOL * scale {
                    return Err(QumoError::shape(
                        "a symmetric interaction matrix",
                        format!("Q[{i}][{j}] = {a}, Q[{j}][{i}] = {b}"),
                    ));
                }
            }
        }
        for (i, item) in q_flat.iter().step_by(n + 1).take(binary).enumerate() {
            if *item != 0.0 {
                return Err(QumoError::shape(
                    "zero diagonal on the binary block",
                    format!("Q[{i}][{i}] = {item}"),
                ));
            }
        }
        if let Some(h) = &h {
            if h.len() != n {
                return Err(QumoError::shape(format!("field of length {n}"), h.len()));
            }
        }

        let staged: Vec<f32> = q_flat.iter().map(|&v| v as f32).collect();
        let q = Tensor::<B, 1>::from_floats(staged.as_slice(), device)
            .reshape([n as i32, n as i32]);
        let h_tensor = h.as_ref().map(|h| {
            let staged: Vec<f32> = h.iter().map(|&v| v as f32).collect();
            Tensor::<B, 1>::from_floats(staged.as_slice(), device)
        });

        Ok(Problem {
            n,
            binary,
            q,
            h: h_tensor,
            q_wide: q_flat,
            h_wide: h,
            wide_eval: core::mem::size_of::<B::FloatElem>() < 4,
        })
    }

    /// Convenience builder from matrix rows.
    pub fn from_rows(
        rows: &[Vec<f64>],
        h: Option<&[f64]>,
        binary: usize,
        device: &B::Device,
    ) -> Result<Self> {
        let n = rows.len();
        let mut flat = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(QumoError::shape(format!("rows of length {n}"), row.len()));
            }
            flat.extend_from_slice(row);
        }
        Self::new(flat, h.map(<[f64]>::to_vec), binary, device)
    }

    /// Problem dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of binary-coordinate prefix entries.
    pub fn binary(&self) -> usize {
        self.binary
    }

    pub fn q(&self) -> &Tensor<B, 2> {
        &self.q
    }

    pub fn h(&self) -> Option<&Tensor<B, 1>> {
        self.h.as_ref()
    }

    /// Row-major `f64` copy of the interactions, for host-side evaluation.
    pub fn q_wide(&self) -> &[f64] {
        &self.q_wide
    }

    pub fn h_wide(&self) -> Option<&[f64]> {
        self.h_wide.as_deref()
    }

    /// Whether energy evaluation must use the widened copy because the
    /// backend float is narrower than `f32`.
    pub fn wide_eval(&self) -> bool {
        self.wide_eval
    }

    pub fn device(&self) -> B::Device {
        self.q.device()
    }
}

#[cfg(all(test, feature = "cpu"))]
mod tests {
    use super::*;
    use crate::backend::{init_cpu_device, CpuBackend};

    #[test]
    fn test_valid_problem() {
        let device = init_cpu_device();
        let p = Problem::<CpuBackend>::from_rows(
            &[vec![0.0, 1.0], vec![1.0, 0.0]],
            Some(&[0.5, -0.5]),
            2,
            &device,
        )
        .expect("valid problem");

        assert_eq!(p.n(), 2);
        assert_eq!(p.binary(), 2);
        assert!(!p.wide_eval(), "f32 backend evaluates on the device");
        assert_eq!(p.q_wide(), &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_rejects_asymmetric() {
        let device = init_cpu_device();
        let err = Problem::<CpuBackend>::from_rows(
            &[vec![0.0, 1.0], vec![2.0, 0.0]],
            None,
            2,
            &device,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_binary_diagonal() {
        let device = init_cpu_device();
        let err = Problem::<CpuBackend>::from_rows(
            &[vec![3.0, 1.0], vec![1.0, 0.0]],
            None,
            1,
            &device,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_continuous_diagonal_allowed() {
        let device = init_cpu_device();
        // diagonal entries past the binary prefix are legal
        let p = Problem::<CpuBackend>::from_rows(
            &[vec![0.0, 2.0], vec![2.0, 5.0]],
            None,
            1,
            &device,
        );
        assert!(p.is_ok());
    }

    #[test]
    fn test_rejects_bad_field_length() {
        let device = init_cpu_device();
        let err = Problem::<CpuBackend>::from_rows(
            &[vec![0.0, 1.0], vec![1.0, 0.0]],
            Some(&[1.0]),
            2,
            &device,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_non_square() {
        let device = init_cpu_device();
        let err = Problem::<CpuBackend>::new(vec![0.0; 6], None, 0, &device);
        assert!(err.is_err());
    }
}
