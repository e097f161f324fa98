//! Incremental reducers over (energies, spins) streams.
//!
//! The exploration driver hands every batch's energies and spin matrix to
//! a collector; after the sweep it retrieves the best assignment found.
//! [`BestAssignment`] keeps only the running minimum; [`FinalAssignment`]
//! additionally snapshots every batch's valid spin columns for callers
//! that want the full terminal population.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// The best objective and the assignment that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct BestFound {
    pub objective: f64,
    pub assignment: Vec<f64>,
}

/// A pluggable reducer over per-batch results.
///
/// After [`finish`](Collector::finish), [`retrieve`](Collector::retrieve)
/// must be idempotent.
pub trait Collector<B: Backend> {
    /// Fold in one batch: `energies[j]` belongs to column `j` of `spins`;
    /// only the first `valid` columns are meaningful.
    fn update(&mut self, energies: &[f64], spins: &Tensor<B, 2>, valid: usize);

    /// Seal the state; no further updates will arrive.
    fn finish(&mut self);

    fn retrieve(&self) -> BestFound;

    /// Optional opaque payload accumulated during the sweep.
    fn info(&self) -> Option<Vec<Vec<f64>>>;
}

/// Tracks the single best `(objective, assignment)` pair.
pub struct BestAssignment {
    n: usize,
    objective: f64,
    assignment: Vec<f64>,
}

impl BestAssignment {
    pub fn new(n: usize) -> Self {
        BestAssignment {
            n,
            objective: f64::INFINITY,
            assignment: vec![0.0; n],
        }
    }
}

impl<B: Backend> Collector<B> for BestAssignment {
    fn update(&mut self, energies: &[f64], spins: &Tensor<B, 2>, valid: usize) {
        let m = energies.len().min(valid);
        let mut winner = None;
        for (j, &e) in energies[..m].iter().enumerate() {
            if e < self.objective {
                self.objective = e;
                winner = Some(j);
            }
        }
        if let Some(j) = winner {
            self.assignment = spins
                .clone()
                .slice([0..self.n, j..j + 1])
                .into_data()
                .iter::<f64>()
                .collect();
        }
    }

    fn finish(&mut self) {}

    fn retrieve(&self) -> BestFound {
        BestFound {
            objective: self.objective,
            assignment: self.assignment.clone(),
        }
    }

    fn info(&self) -> Option<Vec<Vec<f64>>> {
        None
    }
}

/// [`BestAssignment`] plus a snapshot of every batch's valid columns.
///
/// `info` returns one row-major `n x valid` block per batch, in sweep
/// order.
pub struct FinalAssignment {
    best: BestAssignment,
    snapshots: Vec<Vec<f64>>,
}

impl FinalAssignment {
    pub fn new(n: usize) -> Self {
        FinalAssignment {
            best: BestAssignment::new(n),
            snapshots: Vec::new(),
        }
    }
}

impl<B: Backend> Collector<B> for FinalAssignment {
    fn update(&mut self, energies: &[f64], spins: &Tensor<B, 2>, valid: usize) {
        Collector::<B>::update(&mut self.best, energies, spins, valid);
        let n = self.best.n;
        let snapshot: Vec<f64> = spins
            .clone()
            .slice([0..n, 0..valid])
            .into_data()
            .iter::<f64>()
            .collect();
        self.snapshots.push(snapshot);
    }

    fn finish(&mut self) {
        Collector::<B>::finish(&mut self.best);
    }

    fn retrieve(&self) -> BestFound {
        Collector::<B>::retrieve(&self.best)
    }

    fn info(&self) -> Option<Vec<Vec<f64>>> {
        Some(self.snapshots.clone())
    }
}
