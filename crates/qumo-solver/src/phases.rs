//! The three-phase orchestrator.
//!
//! Data flow: normalize the interactions, Sobol-sample the hyperparameter
//! box, then explore in three phases of increasing depth and decreasing
//! breadth. Between phases the configuration set is ranked by mean energy
//! and pruned; the deep search then replays the survivors with adaptively
//! chosen iteration counts until the wall clock runs out.

use crate::pool::run_for;
use burn::tensor::backend::Backend;
use log::{debug, warn};
use qumo_core::configspace::ConfigurationSpace;
use qumo_core::engine::Engine;
use qumo_core::error::{QumoError, Result};
use qumo_core::estimate::{resources_phase1, resources_phase2, PhaseResources};
use qumo_core::normalize::spectral_factor;
use qumo_core::problem::Problem;
use qumo_samplers::collector::BestAssignment;
use qumo_samplers::dialect::Dialect;
use qumo_samplers::explore::{explore, ExplorationParams, ExplorationResult, IterationsChooser};
use qumo_samplers::rng::RngKey;
use qumo_samplers::setup::Setup;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Workers must get at least this much time; shorter phase budgets are
/// rounded up so tiny total timeouts still run every phase once.
const MIN_PHASE_BUDGET: Duration = Duration::from_secs(1);

/// Safety multiplier on the iteration-rate estimate when bounding the
/// deep-search iteration draw. Empirical; biased towards finishing runs
/// inside the remaining budget.
const RATE_SAFETY: f64 = 4.0;

/// Moving-average decay of the deep-search rate estimator.
const RATE_DECAY: f64 = 0.5;

/// User-facing solver knobs. Plain data; validated at solve entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Hyperparameter box sampled in phase 1.
    pub space: ConfigurationSpace,
    /// Closed integer interval for deep-search iteration draws.
    pub deep_search_iterations: (u32, u32),
    pub dt: f64,
    pub phase_1_fraction: f64,
    pub phase_2_fraction: f64,
    /// Sobol points drawn from the hyperparameter box.
    pub configuration_samples: usize,
    /// Tolerance handed to the spectral normalizer.
    pub normalization_tolerance: f64,
    pub normalization_retries: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            space: ConfigurationSpace::default(),
            deep_search_iterations: (500, 20_000),
            dt: 0.5,
            phase_1_fraction: 0.1,
            phase_2_fraction: 0.2,
            configuration_samples: 32_768,
            normalization_tolerance: 1e-5,
            normalization_retries: 3,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<()> {
        for (name, f) in [
            ("phase_1_fraction", self.phase_1_fraction),
            ("phase_2_fraction", self.phase_2_fraction),
        ] {
            if !(0.0..1.0).contains(&f) || f == 0.0 {
                return Err(QumoError::InvalidRange(format!(
                    "{name} must lie in (0, 1), got {f}"
                )));
            }
        }
        if self.phase_1_fraction + self.phase_2_fraction >= 1.0 {
            return Err(QumoError::InvalidRange(format!(
                "phase fractions must sum below 1, got {} + {}",
                self.phase_1_fraction, self.phase_2_fraction
            )));
        }
        let (lo, hi) = self.deep_search_iterations;
        if lo == 0 || lo > hi {
            return Err(QumoError::InvalidRange(format!(
                "deep_search_iterations must be a positive interval, got [{lo}, {hi}]"
            )));
        }
        if self.dt <= 0.0 {
            return Err(QumoError::InvalidRange(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if self.configuration_samples == 0 {
            return Err(QumoError::InvalidRange(
                "configuration_samples must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything one phase produced, timestamped relative to solve start.
#[derive(Debug, Clone)]
pub struct PhaseStatistics {
    pub label: &'static str,
    pub started: Duration,
    pub stopped: Duration,
    /// The configuration set this phase explored, in exploration order.
    pub setup: Setup,
    pub results: Vec<ExplorationResult>,
    /// Iteration counts used, one entry per pool invocation.
    pub iterations: Vec<u32>,
}

impl PhaseStatistics {
    pub fn duration(&self) -> Duration {
        self.stopped.saturating_sub(self.started)
    }

    fn empty(label: &'static str, at: Duration, setup: Setup) -> Self {
        PhaseStatistics {
            label,
            started: at,
            stopped: at,
            setup,
            results: Vec::new(),
            iterations: Vec::new(),
        }
    }
}

/// The record handed back by a solve: phase statistics plus the
/// normalization factor. The caller inspects it with `find_best` and
/// `results_summary`.
#[derive(Debug, Clone)]
pub struct SolverRuntime {
    pub dialect: &'static str,
    pub n: usize,
    pub threads: usize,
    pub normalization: f64,
    pub phase1: PhaseStatistics,
    pub phase2: PhaseStatistics,
    pub deep_search: PhaseStatistics,
    pub total: Duration,
}

impl SolverRuntime {
    pub fn phases(&self) -> [&PhaseStatistics; 3] {
        [&self.phase1, &self.phase2, &self.deep_search]
    }
}

/// Ascending stable ranking of the measured configurations, with any
/// unmeasured tail kept in place behind them.
fn ranking_permutation(means: &[f64], total: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..means.len()).collect();
    perm.sort_by(|&a, &b| means[a].partial_cmp(&means[b]).unwrap_or(std::cmp::Ordering::Equal));
    perm.extend(means.len()..total);
    perm
}

/// One worker-pool sweep of `setup` under a time budget.
fn run_phase<B: Backend>(
    problem: &Problem<B>,
    setup: &Setup,
    dialect: &Dialect,
    params: ExplorationParams,
    budget: Duration,
    threads: usize,
    key: RngKey,
) -> Result<Vec<ExplorationResult>> {
    let keys = key.worker_keys(threads.max(1));
    run_for(
        |worker, token| {
            let mut collector = BestAssignment::new(problem.n());
            explore(
                problem,
                setup,
                dialect,
                &params,
                &token,
                keys[worker],
                &mut collector,
            )
        },
        budget.max(MIN_PHASE_BUDGET),
        threads,
    )
}

/// Run the full three-phase search with the given sampler dialect.
///
/// Preconditions are checked up front; after that the solve always returns
/// a record, even when the budget expires mid-phase (the affected phase is
/// simply truncated).
pub fn solve_with_dialect<B: Backend>(
    problem: &Problem<B>,
    timeout: Duration,
    key: RngKey,
    options: &SolverOptions,
    dialect: &Dialect,
    engine: &Engine,
) -> Result<SolverRuntime> {
    options.validate()?;
    if timeout < Duration::from_secs(1) {
        return Err(QumoError::InvalidTimeout {
            seconds: timeout.as_secs_f64(),
        });
    }

    let n = problem.n();
    let start = Instant::now();

    let r1 = resources_phase1(n, timeout, options.phase_1_fraction);
    let r2 = resources_phase2(n, timeout, options.phase_2_fraction);

    let lambda = spectral_factor(
        problem.q_wide(),
        n,
        options.normalization_tolerance,
        options.normalization_retries,
    );
    debug!("spectral factor {lambda:.4} for n = {n}");

    // sample the box, then fold the spectral factor into the coefficients:
    // annealing is expressed in units of the (unnormalized) gradient, and
    // the gradient is inverted against the spectral scale
    let (mut annealing, mut gradient, momentum) =
        options.space.sobol_triples(options.configuration_samples);
    for (a, g) in annealing.iter_mut().zip(gradient.iter()) {
        *a /= g;
    }
    for g in gradient.iter_mut() {
        *g = 1.0 / (*g * lambda);
    }

    let setup1 = Setup::new(annealing, gradient, momentum, options.dt)?;
    let batch_size = engine.optimal_batch_size(n);
    let threads = engine.worker_count();
    let p1_key = key.child(0);
    let p2_key = key.child(1);
    let deep_key = key.child(2);
    let chooser_key = key.child(3);

    // ---- phase 1: wide shallow sweep --------------------------------------
    let p1_started = start.elapsed();
    let p1_results = run_phase(
        problem,
        &setup1,
        dialect,
        ExplorationParams {
            batch_size,
            repetitions: r1.samples,
            iterations: IterationsChooser::Fixed(r1.iterations),
        },
        r1.time_budget,
        threads,
        p1_key,
    )?;
    let phase1 = PhaseStatistics {
        label: "phase-1",
        started: p1_started,
        stopped: start.elapsed(),
        setup: setup1.clone(),
        iterations: vec![r1.iterations],
        results: p1_results,
    };

    // rank by the first worker's measurements and prune
    let setup2 = match phase1.results.first() {
        Some(first) => {
            let means = first.measurements.mean_per_configuration();
            setup1
                .reorder(&ranking_permutation(&means, setup1.len()))
                .truncated(r1.points_to_save)
        }
        None => setup1.truncated(r1.points_to_save),
    };

    // ---- phase 2: deeper sweep of the survivors ---------------------------
    let p2_started = start.elapsed();
    let p2_results = run_phase(
        problem,
        &setup2,
        dialect,
        ExplorationParams {
            batch_size,
            repetitions: r2.samples,
            iterations: IterationsChooser::Fixed(r2.iterations),
        },
        r2.time_budget,
        threads,
        p2_key,
    )?;
    let phase2 = PhaseStatistics {
        label: "phase-2",
        started: p2_started,
        stopped: start.elapsed(),
        setup: setup2.clone(),
        iterations: vec![r2.iterations],
        results: p2_results,
    };

    let setup_deep = match phase2.results.first() {
        Some(first) => {
            let means = first.measurements.mean_per_configuration();
            setup2
                .reorder(&ranking_permutation(&means, setup2.len()))
                .truncated(r2.points_to_save)
        }
        None => setup2.truncated(r2.points_to_save),
    };

    // ---- deep search: timed replays with adaptive iteration counts --------
    let deep = deep_search(
        problem,
        &setup_deep,
        dialect,
        options,
        &r2,
        &phase2,
        timeout,
        start,
        batch_size,
        threads,
        deep_key,
        chooser_key,
    )?;

    Ok(SolverRuntime {
        dialect: dialect.label,
        n,
        threads,
        normalization: lambda,
        phase1,
        phase2,
        deep_search: deep,
        total: start.elapsed(),
    })
}

#[allow(clippy::too_many_arguments)]
fn deep_search<B: Backend>(
    problem: &Problem<B>,
    setup: &Setup,
    dialect: &Dialect,
    options: &SolverOptions,
    r2: &PhaseResources,
    phase2: &PhaseStatistics,
    timeout: Duration,
    start: Instant,
    batch_size: usize,
    threads: usize,
    deep_key: RngKey,
    chooser_key: RngKey,
) -> Result<PhaseStatistics> {
    let deep_started = start.elapsed();
    if setup.is_empty() {
        warn!("deep search skipped: no configurations survived pruning");
        return Ok(PhaseStatistics::empty("deep-search", deep_started, setup.clone()));
    }

    // one batch per run: enough restarts of each survivor to fill a batch
    let repetitions = batch_size.div_ceil(setup.len()).max(1);
    let (iters_lo, iters_hi) = options.deep_search_iterations;

    // seconds-per-iteration estimator seeded from the phase-2 sweep
    let mut rate = phase2.duration().as_secs_f64() / f64::from(r2.iterations.max(1));
    if !rate.is_finite() || rate <= 0.0 {
        rate = 1e-6;
    }

    let mut chooser_rng = chooser_key.host_rng();
    let mut results = Vec::new();
    let mut iterations = Vec::new();
    let mut last_wall = Duration::ZERO;

    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining < MIN_PHASE_BUDGET {
            break;
        }
        if last_wall > remaining.saturating_mul(2) {
            // the next run would blow well past the budget
            break;
        }

        // bound the draw so the estimated run fits the remaining time
        let fit = (remaining.as_secs_f64() / (rate * RATE_SAFETY)).floor();
        let hi = iters_hi.min(fit.min(f64::from(u32::MAX)) as u32).max(1);
        let lo = iters_lo.min(hi);
        let iters = if lo >= hi {
            lo
        } else {
            chooser_rng.gen_range(lo..=hi)
        };

        // one stream per run: replayable without the preceding runs
        let run_key = deep_key.child(iterations.len() as u64);

        let run_started = Instant::now();
        let run_results = run_phase(
            problem,
            setup,
            dialect,
            ExplorationParams {
                batch_size,
                repetitions,
                iterations: IterationsChooser::Fixed(iters),
            },
            remaining,
            threads,
            run_key,
        )?;
        last_wall = run_started.elapsed();

        rate = RATE_DECAY * rate + (1.0 - RATE_DECAY) * (last_wall.as_secs_f64() / f64::from(iters));
        debug!(
            "deep-search run: {iters} iterations in {last_wall:?}, rate {rate:.3e} s/iter"
        );

        results.extend(run_results);
        iterations.push(iters);
    }

    Ok(PhaseStatistics {
        label: "deep-search",
        started: deep_started,
        stopped: start.elapsed(),
        setup: setup.clone(),
        results,
        iterations,
    })
}
