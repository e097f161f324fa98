//! The fused sampler kernel.
//!
//! One iteration over a batch of `m` trajectories in an `n`-dimensional
//! problem:
//!
//! 1. `spins <- x`, non-linearity on the binary prefix
//! 2. `fields <- Q * spins`
//! 3. `x <- x + dt*g.*fields - dt*a.*(x - bias) + mom.*(x - y)`
//!    (`+ dt*g.*h` when a field is present), coefficients broadcast per
//!    column
//! 4. `y <-` the pre-update state
//! 5. wall on `x`; inelastic dialects reset `y` to the clamped state at
//!    clamped coordinates so the velocity term vanishes there
//! 6. `annealing_live <- max(annealing_live - delta, 0)`
//!
//! The clamp in step 6 is the guard that keeps half-precision backends
//! from drifting below zero. After the final iteration the non-linearity
//! runs once more to produce the reported spins.
//!
//! Trajectories never interact except through the collective matrix
//! product in step 2; every other update is element-wise per column.

use crate::dialect::Dialect;
use crate::setup::SamplerWorkspace;
use crate::tracer::{ParameterAdjuster, SampleTracer};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use qumo_core::nonlinearity::Nonlinearity;
use qumo_core::problem::Problem;

/// Apply `f` to the binary prefix of `state`, leaving the continuous
/// block untouched.
fn apply_on_binary_block<B: Backend>(
    f: &Nonlinearity,
    state: Tensor<B, 2>,
    binary: usize,
) -> Tensor<B, 2> {
    let [n, m] = state.dims();
    if binary == 0 {
        state
    } else if binary >= n {
        f.apply(state)
    } else {
        let head = f.apply(state.clone().slice([0..binary, 0..m]));
        state.slice_assign([0..binary, 0..m], head)
    }
}

/// Run `iterations` fused steps over the loaded batch.
///
/// The workspace must have been loaded with [`SamplerWorkspace::load_batch`]
/// for this problem; on return `workspace.spins` holds the reported spins
/// and `workspace.annealing_live` the decayed coefficients.
pub fn run_kernel<B: Backend>(
    problem: &Problem<B>,
    workspace: &mut SamplerWorkspace<B>,
    dialect: &Dialect,
    iterations: u32,
    dt: f64,
    adjuster: &dyn ParameterAdjuster<B>,
    tracer: &mut dyn SampleTracer<B>,
) {
    let binary = problem.binary();
    let n = workspace.n;
    let h_col = problem
        .h()
        .map(|h| h.clone().reshape([n as i32, 1]));

    for iteration in 0..iterations {
        let spins = apply_on_binary_block(&dialect.nonlinearity, workspace.x.clone(), binary);
        workspace.fields = problem.q().clone().matmul(spins);

        let backup = workspace.x.clone();

        let (gradient, momentum) = adjuster.adjust(
            workspace.gradient.clone(),
            workspace.momentum.clone(),
            &workspace.annealing_live,
        );
        let g_dt = gradient.mul_scalar(dt);

        let mut x = workspace.x.clone()
            + workspace.fields.clone() * g_dt.clone()
            - workspace.x.clone().sub_scalar(dialect.bias)
                * workspace.annealing_live.clone().mul_scalar(dt)
            + (workspace.x.clone() - workspace.y.clone()) * momentum;

        if let Some(h_col) = &h_col {
            x = x + h_col.clone().matmul(g_dt);
        }

        workspace.y = backup;

        if dialect.inelastic {
            let (clamped, moved) = dialect.wall.project_masked(x);
            workspace.y = workspace.y.clone().mask_where(moved, clamped.clone());
            workspace.x = clamped;
        } else {
            workspace.x = dialect.wall.project(x);
        }

        workspace.annealing_live =
            (workspace.annealing_live.clone() - workspace.delta.clone()).clamp_min(0.0);

        tracer.record(iteration, &workspace.x);
    }

    workspace.spins = apply_on_binary_block(&dialect.nonlinearity, workspace.x.clone(), binary);
}

#[cfg(all(test, feature = "cpu"))]
mod tests {
    use super::*;
    use crate::setup::Setup;
    use crate::tracer::{NoAdjustment, NullTracer, PeriodicTracer};
    use qumo_core::backend::{init_cpu_device, CpuBackend};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ferromagnet(device: &burn::backend::ndarray::NdArrayDevice) -> Problem<CpuBackend> {
        // two spins, coupling +1: aligned states minimize the energy
        Problem::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]], None, 2, device)
            .expect("valid problem")
    }

    #[test]
    fn test_annealing_decrement_is_linear_and_floored() {
        let device = init_cpu_device();
        let problem = ferromagnet(&device);
        let setup = Setup::new(vec![0.5, 1.0], vec![0.0, 0.0], vec![0.0, 0.0], 0.5)
            .expect("valid setup");

        let mut rng = StdRng::seed_from_u64(17);
        let mut ws = SamplerWorkspace::<CpuBackend>::new(2, 2, &device);
        ws.load_batch(&setup, 0, 2, 10, &mut rng, &device);

        run_kernel(
            &problem,
            &mut ws,
            &Dialect::mixed_ising(),
            10,
            0.5,
            &NoAdjustment,
            &mut NullTracer,
        );

        // delta = start/10, ten steps: exactly zero for both trajectories
        let live: Vec<f32> = ws.annealing_live.clone().into_data().iter::<f32>().collect();
        assert!(live[0].abs() < 1e-6, "annealing_live[0] = {}", live[0]);
        assert!(live[1].abs() < 1e-6, "annealing_live[1] = {}", live[1]);

        // running further stays at the floor
        run_kernel(
            &problem,
            &mut ws,
            &Dialect::mixed_ising(),
            3,
            0.5,
            &NoAdjustment,
            &mut NullTracer,
        );
        let live: Vec<f32> = ws.annealing_live.clone().into_data().iter::<f32>().collect();
        assert!(live.iter().all(|&a| a >= 0.0));
    }

    #[test]
    fn test_state_stays_inside_the_wall() {
        let device = init_cpu_device();
        let problem = ferromagnet(&device);
        let setup = Setup::new(vec![0.1; 4], vec![2.0; 4], vec![0.9; 4], 0.5)
            .expect("valid setup");

        let mut rng = StdRng::seed_from_u64(17);
        let mut ws = SamplerWorkspace::<CpuBackend>::new(2, 4, &device);
        ws.load_batch(&setup, 0, 4, 50, &mut rng, &device);
        run_kernel(
            &problem,
            &mut ws,
            &Dialect::mixed_ising(),
            50,
            0.5,
            &NoAdjustment,
            &mut NullTracer,
        );

        let x: Vec<f32> = ws.x.clone().into_data().iter::<f32>().collect();
        assert!(x.iter().all(|&v| (-1.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_reported_spins_are_sign_valued_for_ising() {
        let device = init_cpu_device();
        let problem = ferromagnet(&device);
        let setup = Setup::new(vec![0.2; 3], vec![1.0; 3], vec![0.5; 3], 0.5)
            .expect("valid setup");

        let mut rng = StdRng::seed_from_u64(17);
        let mut ws = SamplerWorkspace::<CpuBackend>::new(2, 3, &device);
        ws.load_batch(&setup, 0, 3, 30, &mut rng, &device);
        run_kernel(
            &problem,
            &mut ws,
            &Dialect::mixed_ising(),
            30,
            0.5,
            &NoAdjustment,
            &mut NullTracer,
        );

        let spins: Vec<f32> = ws.spins.clone().into_data().iter::<f32>().collect();
        assert!(spins.iter().all(|&s| s == 1.0 || s == -1.0 || s == 0.0));
    }

    #[test]
    fn test_ferromagnet_aligns() {
        let device = init_cpu_device();
        let problem = ferromagnet(&device);
        // gentle annealing, enough gradient to pull the spins together
        let setup = Setup::new(vec![0.5; 8], vec![1.0; 8], vec![0.6; 8], 0.5)
            .expect("valid setup");

        let mut rng = StdRng::seed_from_u64(17);
        let mut ws = SamplerWorkspace::<CpuBackend>::new(2, 8, &device);
        ws.load_batch(&setup, 0, 8, 200, &mut rng, &device);
        run_kernel(
            &problem,
            &mut ws,
            &Dialect::mixed_ising(),
            200,
            0.5,
            &NoAdjustment,
            &mut NullTracer,
        );

        let spins: Vec<f32> = ws.spins.clone().into_data().iter::<f32>().collect();
        // columns are trajectories: row 0 holds s0 for all 8, row 1 holds s1
        let aligned = (0..8).filter(|j| spins[*j] == spins[8 + *j] && spins[*j] != 0.0).count();
        assert!(aligned >= 6, "only {aligned}/8 trajectories aligned: {spins:?}");
    }

    #[test]
    fn test_tracer_sees_every_iteration() {
        let device = init_cpu_device();
        let problem = ferromagnet(&device);
        let setup = Setup::new(vec![0.5], vec![1.0], vec![0.5], 0.5).expect("valid setup");

        let mut rng = StdRng::seed_from_u64(17);
        let mut ws = SamplerWorkspace::<CpuBackend>::new(2, 1, &device);
        ws.load_batch(&setup, 0, 1, 12, &mut rng, &device);

        let mut tracer = PeriodicTracer::new(4);
        run_kernel(
            &problem,
            &mut ws,
            &Dialect::mixed_ising(),
            12,
            0.5,
            &NoAdjustment,
            &mut tracer,
        );
        // iterations 0, 4, 8
        assert_eq!(tracer.frames.len(), 3);
    }

    #[test]
    fn test_positive_dialect_respects_unit_box() {
        let device = init_cpu_device();
        let problem = Problem::from_rows(
            &[vec![0.0, 2.0], vec![2.0, 1.0]],
            Some(&[0.3, -0.3]),
            1,
            &device,
        )
        .expect("valid problem");
        let setup = Setup::new(vec![0.5; 4], vec![1.5; 4], vec![0.8; 4], 0.5)
            .expect("valid setup");

        let mut rng = StdRng::seed_from_u64(17);
        let mut ws = SamplerWorkspace::<CpuBackend>::new(2, 4, &device);
        ws.load_batch(&setup, 0, 4, 40, &mut rng, &device);
        run_kernel(
            &problem,
            &mut ws,
            &Dialect::positive_qumo(),
            40,
            0.5,
            &NoAdjustment,
            &mut NullTracer,
        );

        let x: Vec<f32> = ws.x.clone().into_data().iter::<f32>().collect();
        assert!(x.iter().all(|&v| (0.0..=1.0).contains(&v)));

        // binary row is step-valued, continuous row is free in the box
        let spins: Vec<f32> = ws.spins.clone().into_data().iter::<f32>().collect();
        assert!(spins[..4].iter().all(|&s| s == 0.0 || s == 1.0));
    }
}
