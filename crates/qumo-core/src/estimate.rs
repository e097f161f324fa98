//! Resource heuristics for the phased search.
//!
//! The tables below trade exploration breadth against iteration depth based
//! on problem size and the overall time budget. They are deliberately exact
//! (no interpolation) so runs are reproducible across machines.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Resources allotted to one search phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResources {
    /// Random restarts per configuration.
    pub samples: usize,
    /// Sampler iterations per trajectory.
    pub iterations: u32,
    /// Configurations kept when pruning for the next phase.
    pub points_to_save: usize,
    /// Wall-clock share of the total budget.
    pub time_budget: Duration,
}

/// Phase-1 resources: wide, shallow exploration.
pub fn resources_phase1(n: usize, time_limit: Duration, fraction: f64) -> PhaseResources {
    let (iterations, samples, points_to_save) = if n > 5000 && time_limit <= Duration::from_secs(100)
    {
        // very large problem on a tight budget: thin everything out
        (50, 10, 3000)
    } else if n < 1000 {
        (100, 20, 3000)
    } else if n < 5000 {
        (200, 20, 3000)
    } else if n < 10_000 {
        (400, 20, 3000)
    } else {
        (500, 20, 3000)
    };

    PhaseResources {
        samples,
        iterations,
        points_to_save,
        time_budget: time_limit.mul_f64(fraction),
    }
}

/// Phase-2 resources: deeper iteration over the pruned configuration set.
pub fn resources_phase2(n: usize, time_limit: Duration, fraction: f64) -> PhaseResources {
    let (iterations, samples, points_to_save) = if n > 5000 && time_limit <= Duration::from_secs(300)
    {
        (500, 10, 100)
    } else if n < 1000 {
        (200, 20, 100)
    } else if n < 5000 {
        (400, 20, 100)
    } else if n < 10_000 {
        (800, 20, 100)
    } else {
        (1000, 20, 100)
    };

    PhaseResources {
        samples,
        iterations,
        points_to_save,
        time_budget: time_limit.mul_f64(fraction),
    }
}

/// CPU worker-pool width: all cores minus four, floored at one.
/// Evaluated once per process.
pub fn max_cpu_threads() -> usize {
    static THREADS: OnceLock<usize> = OnceLock::new();
    *THREADS.get_or_init(|| {
        let n = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        n.saturating_sub(4).max(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase1_table() {
        let t = Duration::from_secs(60);
        assert_eq!(resources_phase1(6000, t, 0.1).iterations, 50);
        assert_eq!(resources_phase1(6000, t, 0.1).samples, 10);

        let t = Duration::from_secs(600);
        assert_eq!(resources_phase1(500, t, 0.1).iterations, 100);
        assert_eq!(resources_phase1(2000, t, 0.1).iterations, 200);
        assert_eq!(resources_phase1(6000, t, 0.1).iterations, 400);
        assert_eq!(resources_phase1(20_000, t, 0.1).iterations, 500);
        assert_eq!(resources_phase1(500, t, 0.1).points_to_save, 3000);
    }

    #[test]
    fn test_phase2_table() {
        let t = Duration::from_secs(200);
        // large problem under the 300s threshold takes the fast row
        assert_eq!(resources_phase2(6000, t, 0.2).iterations, 500);
        assert_eq!(resources_phase2(6000, t, 0.2).samples, 10);

        let t = Duration::from_secs(600);
        assert_eq!(resources_phase2(500, t, 0.2).iterations, 200);
        assert_eq!(resources_phase2(2000, t, 0.2).iterations, 400);
        assert_eq!(resources_phase2(6000, t, 0.2).iterations, 800);
        assert_eq!(resources_phase2(20_000, t, 0.2).iterations, 1000);
        assert_eq!(resources_phase2(500, t, 0.2).points_to_save, 100);
    }

    #[test]
    fn test_time_budget_is_a_fraction() {
        let r = resources_phase1(100, Duration::from_secs(100), 0.1);
        assert_eq!(r.time_budget, Duration::from_secs(10));
    }

    #[test]
    fn test_max_cpu_threads_at_least_one() {
        assert!(max_cpu_threads() >= 1);
        // stable across calls
        assert_eq!(max_cpu_threads(), max_cpu_threads());
    }
}
