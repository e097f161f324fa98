//! The exploration driver: a batched sweep over a configuration set.
//!
//! The driver expands the setup by the repetition factor, allocates one
//! workspace, then walks the expanded trajectories in batches: load a
//! slice, run the kernel, evaluate energies into the shared buffer, feed
//! the collector, yield to the scheduler. The cancellation token is read
//! only between batches, and the first batch always runs even when
//! cancellation arrives early, so the result is well-formed in every case.

use crate::collector::{BestFound, Collector};
use crate::dialect::Dialect;
use crate::kernel::run_kernel;
use crate::rng::RngKey;
use crate::setup::{SamplerWorkspace, Setup};
use crate::tracer::{NoAdjustment, NullTracer};
use burn::tensor::backend::Backend;
use qumo_core::cancel::CancelToken;
use qumo_core::energy::{approx_min, calculate_into, count_min_energy_hits};
use qumo_core::error::{QumoError, Result};
use qumo_core::problem::Problem;
use rand::rngs::StdRng;
use rand::Rng;

/// Iteration count per batch: fixed, or drawn uniformly per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationsChooser {
    Fixed(u32),
    UniformRange { lo: u32, hi: u32 },
}

impl IterationsChooser {
    pub fn choose(&self, rng: &mut StdRng) -> u32 {
        match *self {
            IterationsChooser::Fixed(k) => k,
            IterationsChooser::UniformRange { lo, hi } => {
                if lo >= hi {
                    lo
                } else {
                    rng.gen_range(lo..=hi)
                }
            }
        }
    }
}

/// Knobs for one exploration sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationParams {
    /// Trajectories evaluated in lock-step per kernel invocation.
    pub batch_size: usize,
    /// Random restarts per configuration.
    pub repetitions: usize,
    pub iterations: IterationsChooser,
}

/// Per-trajectory energies shaped `(repetitions, completed)` with one
/// column per configuration; entries for one configuration are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    data: Vec<f64>,
    repetitions: usize,
    completed: usize,
}

impl Measurements {
    pub fn new(data: Vec<f64>, repetitions: usize, completed: usize) -> Self {
        debug_assert_eq!(data.len(), repetitions * completed);
        Measurements {
            data,
            repetitions,
            completed,
        }
    }

    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// Configurations with a full set of observations.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, repetition: usize, configuration: usize) -> f64 {
        self.data[configuration * self.repetitions + repetition]
    }

    /// Mean energy per configuration, the phase-ranking statistic.
    pub fn mean_per_configuration(&self) -> Vec<f64> {
        (0..self.completed)
            .map(|c| {
                let block = &self.data[c * self.repetitions..(c + 1) * self.repetitions];
                block.iter().sum::<f64>() / self.repetitions as f64
            })
            .collect()
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// The configuration owning the first observation at the minimum.
    pub fn first_min_configuration(&self) -> Option<usize> {
        if self.data.is_empty() {
            return None;
        }
        let min = self.min();
        self.data
            .iter()
            .position(|&e| approx_min(e, min))
            .map(|idx| idx / self.repetitions)
    }

    /// Per-configuration count of observations at the global minimum.
    pub fn min_hit_counts(&self) -> Vec<usize> {
        count_min_energy_hits(&self.data, self.completed)
    }
}

/// The outcome of one exploration sweep.
#[derive(Debug, Clone)]
pub struct ExplorationResult {
    pub best: BestFound,
    pub measurements: Measurements,
    /// The derived local seed, recorded for reproducibility.
    pub seed: u64,
    pub collector_info: Option<Vec<Vec<f64>>>,
}

/// Sweep every configuration of `setup` through the sampler.
///
/// Cancellation truncates the sweep at a batch boundary; the measurements
/// of completed configurations are always coherent. Shape problems and an
/// empty setup fail fast; a panic inside the kernel is logged and
/// re-raised.
#[allow(clippy::too_many_arguments)]
pub fn explore<B: Backend, C: Collector<B>>(
    problem: &Problem<B>,
    setup: &Setup,
    dialect: &Dialect,
    params: &ExplorationParams,
    cancel: &CancelToken,
    key: RngKey,
    collector: &mut C,
) -> Result<ExplorationResult> {
    if setup.is_empty() {
        return Err(QumoError::EmptyConfig);
    }
    if params.batch_size == 0 || params.repetitions == 0 {
        return Err(QumoError::InvalidRange(format!(
            "batch_size and repetitions must be positive, got {} / {}",
            params.batch_size, params.repetitions
        )));
    }

    let device = problem.device();
    let expanded = setup.expand(params.repetitions);
    let total = expanded.len();
    let batch = params.batch_size;

    // local RNG derived from the caller's key; recorded in the result
    let local = key.child(0);
    let mut host_rng = local.host_rng();

    let mut workspace = SamplerWorkspace::<B>::new(problem.n(), batch, &device);
    let mut energies = vec![f64::INFINITY; total.max(batch)];

    let mut current = 0usize;
    let mut swept = 0usize;
    loop {
        let end = (current + batch).min(total);
        let count = end - current;
        let iterations = params.iterations.choose(&mut host_rng);

        workspace.load_batch(&expanded, current, count, iterations, &mut host_rng, &device);

        let kernel_run = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_kernel(
                problem,
                &mut workspace,
                dialect,
                iterations,
                expanded.dt,
                &NoAdjustment,
                &mut NullTracer,
            );
        }));
        if let Err(payload) = kernel_run {
            log::error!("sampler kernel panicked in batch [{current}, {end}); re-raising");
            std::panic::resume_unwind(payload);
        }

        // the host extraction inside doubles as the backend barrier
        calculate_into(&mut energies[current..end], problem, &workspace.spins);
        collector.update(&energies[current..end], &workspace.spins, count);

        swept = end;
        current = end;
        std::thread::yield_now();

        if current >= total || cancel.is_cancelled() {
            break;
        }
    }

    let completed = swept / params.repetitions;
    let valid = energies[..completed * params.repetitions].to_vec();
    let measurements = Measurements::new(valid, params.repetitions, completed);

    collector.finish();
    Ok(ExplorationResult {
        best: collector.retrieve(),
        measurements,
        seed: local.seed(),
        collector_info: collector.info(),
    })
}
