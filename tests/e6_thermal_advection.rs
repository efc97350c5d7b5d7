//! E6 (reduced scale): a Dirichlet temperature step advected by a uniform
//! plug flow and spread by the thermal lattice's own diffusivity matches the
//! analytical erfc front, T(x,t) = 0.5 erfc((x - U t) / (2 sqrt(alpha t))),
//! a solution valid once advection dominates diffusion enough that the
//! analytical problem's semi-infinite-domain correction term is negligible.

use pourover_lbm::backend::CpuBackend;
use pourover_lbm::config::{PorousDefaults, ScaleFactors, SimulationConfig, ThermalMode, VogelParams};
use pourover_lbm::grid::{Grid, ThermalBc};
use pourover_lbm::lattice::{self, CS2};
use pourover_lbm::particles::ParticlePool;
use pourover_lbm::step;

use nalgebra::Vector3;

/// Abramowitz & Stegun 7.1.26, |error| < 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;
    let t = 1.0 / (1.0 + p * x);
    let poly = ((((a5 * t + a4) * t + a3) * t + a2) * t + a1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

fn erfc(x: f64) -> f64 {
    1.0 - erf(x)
}

#[test]
fn thermal_front_advected_by_plug_flow_matches_the_analytical_erfc_solution() {
    let nx = 128;
    let ny = 4;
    let nz = 4;
    let tau_fluid = 0.8;
    let tau_thermal = 0.52;
    let u_plug = 0.02;
    // Viscosity is held fixed at `tau_fluid` regardless of temperature
    // (b = 0 collapses the Vogel exponential to 1), isolating the front from
    // any viscosity-temperature feedback.
    let vogel = VogelParams { a: CS2 * (tau_fluid - 0.5), b: 0.0, t0: 0.0 };

    let config = SimulationConfig {
        nx,
        ny,
        nz,
        tau_fluid,
        tau_air: tau_fluid,
        sigma: 0.0,
        gravity: Vector3::zeros(),
        pressure_gradient_drive: Vector3::zeros(),
        outlet_pressure: CS2,
        scale: ScaleFactors { length_m: 1e-3, velocity_mps: 1e-2, density_kgm3: 1000.0, temperature_k: 300.0 },
        particle_capacity: 1,
        thermal_mode: ThermalMode::Weak,
        tau_thermal,
        vogel,
        porous_defaults: PorousDefaults { permeability: 1e-9, ergun_beta: 2.0 },
        seed: 1,
    };

    let mut grid = Grid::new(nx, ny, nz, true, tau_fluid).unwrap();

    // Seed every distribution at the plug-flow equilibrium; with zero net
    // force a uniform velocity field is an exact fixed point of collision
    // and streaming, so u stays (u_plug, 0, 0) for the whole run.
    let u = Vector3::new(u_plug, 0.0, 0.0);
    for id in 0..grid.n_cells() {
        for i in 0..lattice::Q {
            let feq = lattice::equilibrium(i, 1.0, &u);
            grid.f[i][id] = feq;
            grid.f_new[i][id] = feq;
        }
        grid.ux[id] = u_plug;
    }

    for j in 0..ny {
        for k in 0..nz {
            let id = grid.idx(0, j, k);
            grid.thermal_bc[id] = ThermalBc::Dirichlet { t: 1.0 };
        }
    }

    let mut pool = ParticlePool::new(config.particle_capacity, 0.8);
    let backend = CpuBackend;
    let mut step_count = 0u64;
    let mut clips = 0u64;
    let initial_mass = pourover_lbm::diagnostics::total_mass(&grid);

    // Stop well short of the half-domain transit time: the front must stay
    // a comfortable distance from the periodic wrap, where heat advected
    // past the far boundary re-enters behind the Dirichlet source and
    // contaminates the semi-infinite analytical comparison.
    let steps = 2000u64;
    for _ in 0..steps {
        step::run_step(&mut grid, &mut pool, &backend, &config, &mut step_count, &mut clips, initial_mass).unwrap();
    }

    let t = steps as f64;
    let alpha = 0.25 * (tau_thermal - 0.5);
    let analytical = |x: f64| 0.5 * erfc((x - u_plug * t) / (2.0 * (alpha * t).sqrt()));

    let mid_j = ny / 2;
    let mid_k = nz / 2;
    // The analytical solution assumes a semi-infinite domain; this one is
    // periodic, so heat that diffuses upstream of the source wraps around
    // and piles up just behind x = 0. Excluding that wrapped tail keeps the
    // comparison to the bulk of the front honest.
    let mut max_abs_err = 0.0_f64;
    for i in 0..(nx - 12) {
        let measured = grid.t[grid.idx(i, mid_j, mid_k)];
        let expected = analytical(i as f64);
        max_abs_err = max_abs_err.max((measured - expected).abs());
    }
    assert!(max_abs_err < 0.1, "max_abs_err={max_abs_err}");

    // Front position: the x where T crosses 0.5, located by linear
    // interpolation between the two bracketing cells.
    let mut front_x = None;
    for i in 0..nx - 1 {
        let t0 = grid.t[grid.idx(i, mid_j, mid_k)];
        let t1 = grid.t[grid.idx(i + 1, mid_j, mid_k)];
        if (t0 - 0.5) * (t1 - 0.5) <= 0.0 && t0 != t1 {
            let frac = (0.5 - t0) / (t1 - t0);
            front_x = Some(i as f64 + frac);
            break;
        }
    }
    let front_x = front_x.expect("temperature field never crosses 0.5, front has not yet formed");
    let expected_front = u_plug * t;
    let rel_err = (front_x - expected_front).abs() / expected_front;
    assert!(rel_err < 0.15, "front_x={front_x}, expected={expected_front}, rel_err={rel_err}");
}
