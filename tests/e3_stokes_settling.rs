//! E3 (reduced scale): a single particle settling under gravity in a
//! quiescent box reaches a terminal velocity matching Stokes' law,
//! v_t = 2 g r_p² (ρ_p - ρ_f) / (9 μ).

use pourover_lbm::backend::CpuBackend;
use pourover_lbm::config::{PorousDefaults, ScaleFactors, SimulationConfig, ThermalMode, VogelParams};
use pourover_lbm::grid::{CellTag, Grid};
use pourover_lbm::lattice::CS2;
use pourover_lbm::particles::{DistributionParams, ParticlePool};
use pourover_lbm::step;

use nalgebra::Vector3;

/// Tags the six domain faces solid so the enclosed fluid reaches a
/// hydrostatic equilibrium under gravity instead of free-falling in bulk
/// (streaming otherwise wraps periodically with no wall to build up a
/// counter-pressure).
fn enclose_with_walls(grid: &mut Grid) {
    let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                if i == 0 || i == nx - 1 || j == 0 || j == ny - 1 || k == 0 || k == nz - 1 {
                    let id = grid.idx(i, j, k);
                    grid.tag[id] = CellTag::Solid;
                }
            }
        }
    }
}

#[test]
fn settling_particle_approaches_the_stokes_terminal_velocity() {
    let n = 24;
    let tau = 0.9;
    let nu = CS2 * (tau - 0.5);
    let rho_f = 1.0;
    let rho_p = 2.0;
    let radius = 1.5;
    let gravity_z = -1e-6;

    let config = SimulationConfig {
        nx: n,
        ny: n,
        nz: n,
        tau_fluid: tau,
        tau_air: tau,
        sigma: 0.0,
        gravity: Vector3::new(0.0, 0.0, gravity_z),
        pressure_gradient_drive: Vector3::zeros(),
        outlet_pressure: CS2,
        scale: ScaleFactors { length_m: 1e-3, velocity_mps: 1e-2, density_kgm3: 1000.0, temperature_k: 300.0 },
        particle_capacity: 1,
        thermal_mode: ThermalMode::Off,
        tau_thermal: 0.0,
        vogel: VogelParams { a: 1e-6, b: 500.0, t0: 150.0 },
        porous_defaults: PorousDefaults { permeability: 1e-9, ergun_beta: 2.0 },
        seed: 1,
    };

    let mut grid = Grid::new(n, n, n, false, tau).unwrap();
    enclose_with_walls(&mut grid);
    let mut pool = ParticlePool::new(1, 0.8);
    let params = DistributionParams {
        median_radius: radius,
        geometric_std_dev: 1.0,
        r_min: radius,
        r_max: radius,
        density: rho_p,
        restitution: 0.5,
    };
    pool.seed(&grid, 1, params, 1).unwrap();
    // Pin the particle near the box center, away from walls, so it settles
    // freely for the duration of the test. Offset to a cell center rather
    // than an exact grid node: sitting on a node would concentrate the
    // entire trilinear reaction force onto a single cell, the worst case
    // for the two-way coupling's stability.
    pool.x[0] = Vector3::new((n / 2) as f64 + 0.5, (n / 2) as f64 + 0.5, (n - 4) as f64 + 0.5);

    let backend = CpuBackend;
    let mut step_count = 0u64;
    let mut clips = 0u64;
    let initial_mass = pourover_lbm::diagnostics::total_mass(&grid);

    let mu_f = nu * rho_f;
    let expected_terminal = 2.0 * gravity_z.abs() * radius * radius * (rho_p - rho_f) / (9.0 * mu_f);

    // Compare against the locally interpolated fluid velocity rather than an
    // absolute particle speed: the enclosed box still carries a slow
    // hydrostatic-adjustment drift of its own, so "settling" is measured
    // relative to the ambient fluid at the particle's position, exactly as
    // Stokes' law assumes a quiescent far field.
    let mut last_v_rel_z = 0.0;
    for _ in 0..600 {
        step::run_step(&mut grid, &mut pool, &backend, &config, &mut step_count, &mut clips, initial_mass).unwrap();
        let id = grid.idx(
            pool.x[0].x.round() as usize,
            pool.x[0].y.round() as usize,
            pool.x[0].z.round() as usize,
        );
        last_v_rel_z = pool.v[0].z - grid.uz[id];
    }

    let measured = last_v_rel_z.abs();
    let rel_err = (measured - expected_terminal).abs() / expected_terminal;
    assert!(
        rel_err < 0.4,
        "measured={measured}, expected={expected_terminal}, rel_err={rel_err}"
    );
    assert!(last_v_rel_z < 0.0, "particle must settle downward relative to the fluid, got v_rel.z={last_v_rel_z}");
}
