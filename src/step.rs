//! Fixed per-step orchestrator (§4.9): wires the LES, phase-field, force,
//! particle, collision/streaming, boundary, and recovery kernels together in
//! the mandated order, then runs the stability gate. Each call is one
//! bulk-synchronous step with an implicit barrier between kernels (§5); there
//! is no partial rollback on failure.

use crate::backend::Backend;
use crate::config::{SimulationConfig, ThermalMode};
use crate::diagnostics::{self, Diagnostics};
use crate::error::{SimError, StabilityError};
use crate::grid::Grid;
use crate::lattice::CS2;
use crate::particles::ParticlePool;
use crate::{boundary, forces, lbm, les, particles, phase_field, porous, thermal};

/// Mach-number stability gate (§7, §8).
pub const MACH_GATE: f64 = 0.1;
/// CFL stability gate; with Δx = Δt = 1 this is numerically identical to the
/// Mach gate, but kept distinct to match the error taxonomy's separate
/// `CflExceeded`/`MachExceeded` variants.
pub const CFL_GATE: f64 = 0.1;

/// Diagnostics snapshot returned by a successful `step` (§6, §7).
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StepReport {
    pub diagnostics: Diagnostics,
}

/// Advances the engine by one lattice step, in the fixed order mandated by
/// the orchestrator. `step_count` and `tau_eff_clips_total` are running
/// counters owned by the caller (`Simulation`) and updated in place;
/// `initial_mass` anchors the mass-drift diagnostic to the state at the last
/// `reset`.
#[allow(clippy::too_many_arguments)]
pub fn run_step(
    grid: &mut Grid,
    pool: &mut ParticlePool,
    backend: &impl Backend,
    config: &SimulationConfig,
    step_count: &mut u64,
    tau_eff_clips_total: &mut u64,
    initial_mass: f64,
) -> Result<StepReport, SimError> {
    // 1. Zero the aggregated body force.
    grid.zero_force();

    // 2. Subgrid viscosity, then the molecular relaxation time (thermal-aware
    // when coupling is active).
    les::compute_subgrid_viscosity(grid, backend);
    if config.thermal_mode == ThermalMode::Off {
        phase_field::update_molecular_relaxation(grid, config.tau_fluid, config.tau_air);
    } else {
        thermal::apply_vogel_to_relaxation(grid, &config.vogel, config.tau_air);
    }

    // 3. Evolve the phase field; compute interface normal/curvature; accumulate F_st.
    phase_field::advance_phase_field(grid, backend, 1.0);
    phase_field::update_normal_and_curvature(grid, backend);
    phase_field::accumulate_surface_tension_force(grid, backend, config.sigma);

    // 4. Accumulate F_gravity, F_drive, F_porous, F_buoy.
    forces::accumulate_constant_forces(grid, config.gravity, config.pressure_gradient_drive);
    porous::accumulate_porous_force(grid, backend);
    thermal::accumulate_buoyancy_force(grid, backend, config.thermal_mode, config.gravity);

    // 5. Interpolate u_f at particle positions; drag; integrate; scatter reaction force.
    let nu_fluid = CS2 * (config.tau_fluid - 0.5);
    particles::integrate_particles(pool, grid, backend, config.gravity, nu_fluid, CS2.sqrt(), 1.0);

    // 6. Collide fluid/porous/inlet/outlet cells with τ_eff and Guo forcing;
    // advance the thermal distribution with its own collision.
    let (tau_eff, clips) = les::effective_relaxation_times(grid);
    *tau_eff_clips_total += clips;
    lbm::collide(grid, backend, &tau_eff);
    thermal::step_thermal(grid, backend, config.thermal_mode, config.tau_thermal);

    // 7. Stream f (g is streamed internally by step_thermal, before this point).
    lbm::stream(grid, backend);

    // 8. Apply boundary rules for f (thermal boundaries already applied
    // inside step_thermal, per its own streaming pass).
    boundary::apply_bounce_back(grid, backend);
    boundary::apply_zou_he_inlet(grid, backend);
    boundary::apply_extrapolation_outlet(grid, backend, config.outlet_pressure);

    // 9. Recover macro fields ρ, u, T.
    lbm::recover_macro(grid, backend);

    // 10. Stability gate.
    check_stability_gate(grid, &tau_eff)?;

    *step_count += 1;
    let (max_speed, max_cfl, max_mach, kinetic_energy) = diagnostics::measure(grid);
    let mass_drift = diagnostics::total_mass(grid) - initial_mass;
    let report = StepReport {
        diagnostics: Diagnostics {
            step_count: *step_count,
            max_speed,
            max_cfl,
            max_mach,
            tau_eff_clips: *tau_eff_clips_total,
            mass_drift,
            kinetic_energy,
        },
    };
    Ok(report)
}

/// Checks Mach, CFL, τ_eff, ρ>0, and finiteness over every flow cell (§4.9
/// step 10, §7, §8). Returns the first violated invariant.
fn check_stability_gate(grid: &Grid, tau_eff: &[f64]) -> Result<(), StabilityError> {
    let cs = CS2.sqrt();
    let mut max_speed = 0.0_f64;

    for id in 0..grid.n_cells() {
        if !grid.tag[id].is_flow_cell() {
            continue;
        }
        if !grid.rho[id].is_finite() {
            return Err(StabilityError::NonFiniteField { cell: id, field: "rho" });
        }
        if grid.rho[id] <= 0.0 {
            return Err(StabilityError::NonPositiveDensity { cell: id, rho: grid.rho[id] });
        }
        for (field, name) in [(grid.ux[id], "ux"), (grid.uy[id], "uy"), (grid.uz[id], "uz")] {
            if !field.is_finite() {
                return Err(StabilityError::NonFiniteField { cell: id, field: name });
            }
        }
        if tau_eff[id] <= 0.5 {
            return Err(StabilityError::TauCollapsed { cell: id, tau_eff: tau_eff[id] });
        }
        max_speed = max_speed.max(grid.velocity_at(id).norm());
    }

    let max_mach = max_speed / cs;
    if max_mach > MACH_GATE {
        return Err(StabilityError::MachExceeded { max_mach });
    }
    let max_cfl = max_speed; // Δx = Δt = 1 in lattice units.
    if max_cfl > CFL_GATE {
        return Err(StabilityError::CflExceeded { max_cfl });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::config::{PorousDefaults, ScaleFactors, VogelParams};
    use nalgebra::Vector3;

    fn test_config() -> SimulationConfig {
        SimulationConfig {
            nx: 4,
            ny: 4,
            nz: 4,
            tau_fluid: 0.8,
            tau_air: 0.6,
            sigma: 0.0,
            gravity: Vector3::zeros(),
            pressure_gradient_drive: Vector3::zeros(),
            outlet_pressure: CS2,
            scale: ScaleFactors {
                length_m: 0.001,
                velocity_mps: 0.01,
                density_kgm3: 1000.0,
                temperature_k: 300.0,
            },
            particle_capacity: 8,
            thermal_mode: ThermalMode::Off,
            tau_thermal: 0.0,
            vogel: VogelParams { a: 1e-6, b: 500.0, t0: 150.0 },
            porous_defaults: PorousDefaults { permeability: 1e-9, ergun_beta: 2.0 },
            seed: 1,
        }
    }

    #[test]
    fn a_quiescent_step_is_stable_and_conserves_mass() {
        let config = test_config();
        let mut grid = Grid::new(config.nx, config.ny, config.nz, false, config.tau_fluid).unwrap();
        let mut pool = ParticlePool::new(config.particle_capacity, 0.8);
        let initial_mass = diagnostics::total_mass(&grid);
        let mut step_count = 0u64;
        let mut clips = 0u64;
        let report = run_step(&mut grid, &mut pool, &CpuBackend, &config, &mut step_count, &mut clips, initial_mass).unwrap();
        assert_eq!(report.diagnostics.step_count, 1);
        assert!(report.diagnostics.mass_drift.abs() < 1e-9);
        assert_eq!(step_count, 1);
    }

    #[test]
    fn gate_rejects_velocity_beyond_the_mach_threshold() {
        let grid = Grid::new(4, 4, 4, false, 0.8).unwrap();
        let mut grid = grid;
        for id in 0..grid.n_cells() {
            grid.ux[id] = 0.5; // far beyond the 0.1 c_s gate
        }
        let tau_eff = vec![0.8; grid.n_cells()];
        assert!(matches!(check_stability_gate(&grid, &tau_eff), Err(StabilityError::MachExceeded { .. })));
    }

    #[test]
    fn gate_rejects_non_positive_density() {
        let mut grid = Grid::new(4, 4, 4, false, 0.8).unwrap();
        let id = grid.idx(0, 0, 0);
        grid.rho[id] = -1.0;
        let tau_eff = vec![0.8; grid.n_cells()];
        assert!(matches!(check_stability_gate(&grid, &tau_eff), Err(StabilityError::NonPositiveDensity { .. })));
    }

    #[test]
    fn full_step_on_a_disturbed_field_remains_within_the_gate() {
        let config = test_config();
        let mut grid = Grid::new(config.nx, config.ny, config.nz, false, config.tau_fluid).unwrap();
        let id = grid.idx(2, 2, 2);
        grid.ux[id] = 0.01;
        let mut pool = ParticlePool::new(config.particle_capacity, 0.8);
        let initial_mass = diagnostics::total_mass(&grid);
        let mut step_count = 0u64;
        let mut clips = 0u64;
        let report = run_step(&mut grid, &mut pool, &CpuBackend, &config, &mut step_count, &mut clips, initial_mass).unwrap();
        assert_eq!(step_count, 1);
        assert!(report.diagnostics.max_mach < MACH_GATE);
    }
}
