//! Per-trajectory coefficients and the batch workspace.
//!
//! A [`Setup`] holds one `(annealing, gradient, momentum)` triple per
//! configuration, host-side and immutable after construction. Phases
//! reorder and truncate setups between explorations; the driver expands a
//! setup by the repetition factor and copies per-batch slices into the
//! live device vectors of a [`SamplerWorkspace`].

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use qumo_core::error::{QumoError, Result};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-trajectory hyperparameters for one exploration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub annealing: Vec<f64>,
    pub gradient: Vec<f64>,
    pub momentum: Vec<f64>,
    pub dt: f64,
}

impl Setup {
    pub fn new(
        annealing: Vec<f64>,
        gradient: Vec<f64>,
        momentum: Vec<f64>,
        dt: f64,
    ) -> Result<Self> {
        if annealing.len() != gradient.len() || annealing.len() != momentum.len() {
            return Err(QumoError::shape(
                format!("three coefficient vectors of length {}", annealing.len()),
                format!("{} / {} / {}", annealing.len(), gradient.len(), momentum.len()),
            ));
        }
        if dt <= 0.0 {
            return Err(QumoError::InvalidRange(format!("dt must be positive, got {dt}")));
        }
        if annealing.iter().any(|&a| a < 0.0) || gradient.iter().any(|&g| g < 0.0) {
            return Err(QumoError::InvalidRange(
                "annealing and gradient coefficients must be non-negative".to_string(),
            ));
        }
        if momentum.iter().any(|&m| !(0.0..1.0).contains(&m)) {
            return Err(QumoError::InvalidRange(
                "momentum coefficients must lie in [0, 1)".to_string(),
            ));
        }
        Ok(Setup {
            annealing,
            gradient,
            momentum,
            dt,
        })
    }

    /// Number of configurations.
    pub fn len(&self) -> usize {
        self.annealing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annealing.is_empty()
    }

    /// Repeat each triple `repetitions` times consecutively, so every
    /// configuration is evaluated from several random initial states.
    pub fn expand(&self, repetitions: usize) -> Setup {
        let rep = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .flat_map(|&x| std::iter::repeat(x).take(repetitions))
                .collect()
        };
        Setup {
            annealing: rep(&self.annealing),
            gradient: rep(&self.gradient),
            momentum: rep(&self.momentum),
            dt: self.dt,
        }
    }

    /// Gather the triples named by `perm`, in order. Indices past the end
    /// are ignored, so a permutation over a measured prefix is fine.
    pub fn reorder(&self, perm: &[usize]) -> Setup {
        let gather = |v: &[f64]| -> Vec<f64> {
            perm.iter().filter(|&&i| i < v.len()).map(|&i| v[i]).collect()
        };
        Setup {
            annealing: gather(&self.annealing),
            gradient: gather(&self.gradient),
            momentum: gather(&self.momentum),
            dt: self.dt,
        }
    }

    /// Keep only the first `k` configurations.
    pub fn truncated(&self, k: usize) -> Setup {
        let k = k.min(self.len());
        Setup {
            annealing: self.annealing[..k].to_vec(),
            gradient: self.gradient[..k].to_vec(),
            momentum: self.momentum[..k].to_vec(),
            dt: self.dt,
        }
    }
}

/// Pre-allocated scratch buffers for a batch of `m` trajectories over an
/// `n`-dimensional problem. Allocated once per exploration and loaded
/// per batch.
pub struct SamplerWorkspace<B: Backend> {
    pub x: Tensor<B, 2>,
    pub y: Tensor<B, 2>,
    pub spins: Tensor<B, 2>,
    pub fields: Tensor<B, 2>,
    /// Live annealing coefficients, decremented in place each iteration.
    pub annealing_live: Tensor<B, 2>,
    pub gradient: Tensor<B, 2>,
    pub momentum: Tensor<B, 2>,
    /// Per-trajectory annealing decrement per iteration.
    pub delta: Tensor<B, 2>,
    pub n: usize,
    pub m: usize,
}

impl<B: Backend> SamplerWorkspace<B> {
    pub fn new(n: usize, m: usize, device: &B::Device) -> Self {
        SamplerWorkspace {
            x: Tensor::zeros([n, m], device),
            y: Tensor::zeros([n, m], device),
            spins: Tensor::zeros([n, m], device),
            fields: Tensor::zeros([n, m], device),
            annealing_live: Tensor::zeros([1, m], device),
            gradient: Tensor::zeros([1, m], device),
            momentum: Tensor::zeros([1, m], device),
            delta: Tensor::zeros([1, m], device),
            n,
            m,
        }
    }

    /// Load the configuration slice `[lo, lo + count)` of `setup` into the
    /// live vectors and draw a fresh initial state from `rng`. Columns
    /// past `count` are padded with zero coefficients and ignored on
    /// readout.
    ///
    /// The initial state is staged host-side so a run replays exactly from
    /// its recorded seed, independent of any process-global generator.
    pub fn load_batch(
        &mut self,
        setup: &Setup,
        lo: usize,
        count: usize,
        iterations: u32,
        rng: &mut StdRng,
        device: &B::Device,
    ) {
        debug_assert!(lo + count <= setup.len());
        debug_assert!(count <= self.m);

        let stage = |v: &[f64]| -> Vec<f32> {
            let mut out = vec![0.0f32; self.m];
            for (slot, &x) in out.iter_mut().zip(v[lo..lo + count].iter()) {
                *slot = x as f32;
            }
            out
        };
        let row = |data: Vec<f32>| -> Tensor<B, 2> {
            Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape([1, self.m as i32])
        };

        self.annealing_live = row(stage(&setup.annealing));
        self.gradient = row(stage(&setup.gradient));
        self.momentum = row(stage(&setup.momentum));
        self.delta = self
            .annealing_live
            .clone()
            .div_scalar(iterations.max(1) as f64);

        // initial state spread ~ 1/sqrt(N) keeps early fields of order one
        let spread = 1.0 / (self.n.max(1) as f64).sqrt();
        let init: Vec<f32> = (0..self.n * self.m)
            .map(|_| rng.gen_range(-spread..=spread) as f32)
            .collect();
        self.x = Tensor::<B, 1>::from_floats(init.as_slice(), device)
            .reshape([self.n as i32, self.m as i32]);
        self.y = Tensor::zeros([self.n, self.m], device);
        self.spins = Tensor::zeros([self.n, self.m], device);
        self.fields = Tensor::zeros([self.n, self.m], device);
    }
}
