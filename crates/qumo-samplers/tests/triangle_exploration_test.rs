//! Exploration over a frustrated triangle.
//!
//! Three spins with antiferromagnetic couplings cannot all be satisfied;
//! the ground states leave exactly one frustrated edge at energy -1.

use qumo_core::backend::{init_cpu_device, CpuBackend};
use qumo_core::cancel::CancelToken;
use qumo_core::problem::Problem;
use qumo_samplers::{
    explore, BestAssignment, Collector, Dialect, ExplorationParams, FinalAssignment,
    IterationsChooser, RngKey, Setup,
};

fn triangle() -> Problem<CpuBackend> {
    let device = init_cpu_device();
    // negated triangle adjacency: H(s) = 1/2 s' A s
    Problem::from_rows(
        &[
            vec![0.0, -1.0, -1.0],
            vec![-1.0, 0.0, -1.0],
            vec![-1.0, -1.0, 0.0],
        ],
        None,
        3,
        &device,
    )
    .expect("valid problem")
}

fn wide_setup(k: usize) -> Setup {
    // a spread of annealing strengths around the useful range
    let annealing: Vec<f64> = (0..k).map(|i| 0.1 + 0.9 * i as f64 / k as f64).collect();
    Setup::new(annealing, vec![1.0; k], vec![0.7; k], 0.5).expect("valid setup")
}

#[test]
fn test_triangle_reaches_the_frustrated_ground_state() {
    let problem = triangle();
    let setup = wide_setup(12);
    let params = ExplorationParams {
        batch_size: 8,
        repetitions: 4,
        iterations: IterationsChooser::Fixed(120),
    };

    let mut collector = BestAssignment::new(3);
    let result = explore(
        &problem,
        &setup,
        &Dialect::mixed_ising(),
        &params,
        &CancelToken::new(),
        RngKey::new(21),
        &mut collector,
    )
    .expect("exploration succeeds");

    assert_eq!(result.measurements.completed(), 12);
    assert_eq!(result.measurements.repetitions(), 4);

    // ground states break exactly one edge: H = -1
    assert!(
        result.best.objective <= -1.0 + 1e-5,
        "objective {} misses the triangle ground state",
        result.best.objective
    );
    let s = &result.best.assignment;
    let aligned_pairs = [(0, 1), (1, 2), (0, 2)]
        .iter()
        .filter(|(a, b)| s[*a] * s[*b] > 0.0)
        .count();
    assert_eq!(aligned_pairs, 1, "one frustrated edge expected, got {s:?}");
}

#[test]
fn test_final_assignment_collects_every_batch() {
    let problem = triangle();
    let setup = wide_setup(6);
    let params = ExplorationParams {
        batch_size: 5,
        repetitions: 2,
        iterations: IterationsChooser::Fixed(40),
    };

    let mut collector = FinalAssignment::new(3);
    let result = explore(
        &problem,
        &setup,
        &Dialect::mixed_ising(),
        &params,
        &CancelToken::new(),
        RngKey::new(33),
        &mut collector,
    )
    .expect("exploration succeeds");

    // 12 trajectories in batches of 5: 5 + 5 + 2
    let info = result.collector_info.expect("snapshots present");
    assert_eq!(info.len(), 3);
    assert_eq!(info[0].len(), 15, "3 rows x 5 valid columns");
    assert_eq!(info[2].len(), 6, "3 rows x 2 valid columns");

    // the sealed collector keeps answering consistently
    let best = Collector::<CpuBackend>::retrieve(&collector);
    assert_eq!(best.objective, result.best.objective);
}
