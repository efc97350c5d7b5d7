//! D3Q7 thermal lattice (§4.6): BGK relaxation of the temperature
//! distribution, Boussinesq buoyancy coupling back into the momentum body
//! force, and the Vogel temperature-viscosity correlation for the fluid
//! phase.

use crate::backend::Backend;
use crate::config::{ThermalMode, VogelParams};
use crate::grid::{CellTag, Grid, QT, ThermalBc};
use crate::lattice::{CS2, VELOCITIES};
use nalgebra::Vector3;

/// Reference temperature for the Boussinesq expansion term (lattice units).
pub const T_REF: f64 = 0.0;
/// Thermal expansion coefficient.
pub const THERMAL_EXPANSION: f64 = 2e-4;

/// Lattice sound speed squared of the D3Q7 thermal set. Distinct from the
/// fluid D3Q19 lattice's `CS2 = 1/3`: using the wrong constant here leaves
/// the advection term in the recovered advection-diffusion equation scaled
/// by `CS2_THERMAL / CS2` instead of 1.
const CS2_THERMAL: f64 = 1.0 / 4.0;

/// D3Q7 equilibrium: g_i^eq = w_i T (1 + e_i . u / c_s,T^2), weights 1/4 for
/// rest and 1/8 for the six axis-aligned directions (shared with D3Q19's
/// first seven entries).
const WEIGHTS_T: [f64; QT] = [1.0 / 4.0, 1.0 / 8.0, 1.0 / 8.0, 1.0 / 8.0, 1.0 / 8.0, 1.0 / 8.0, 1.0 / 8.0];

#[inline]
fn equilibrium_thermal(i: usize, t: f64, u: &Vector3<f64>) -> f64 {
    let e = VELOCITIES[i];
    let e = Vector3::new(e[0] as f64, e[1] as f64, e[2] as f64);
    WEIGHTS_T[i] * t * (1.0 + e.dot(u) / CS2_THERMAL)
}

/// Vogel correlation: ν(T) = A exp(B / (T - T0)), clamped to stay positive
/// and finite as T approaches T0 from above.
pub fn vogel_viscosity(t_kelvin: f64, a: f64, b: f64, t0: f64) -> f64 {
    let denom = (t_kelvin - t0).max(1.0);
    a * (b / denom).exp()
}

/// BGK collision + streaming of the thermal distribution, macro temperature
/// recovery, and application of thermal boundary conditions. No-op unless
/// `mode != ThermalMode::Off`.
pub fn step_thermal(grid: &mut Grid, backend: &impl Backend, mode: ThermalMode, tau_thermal: f64) {
    if mode == ThermalMode::Off {
        return;
    }
    let n = grid.n_cells();

    for i in 0..QT {
        let collided: Vec<f64> = backend.map_cells(n, |id| {
            let u = grid.velocity_at(id);
            let geq = equilibrium_thermal(i, grid.t[id], &u);
            grid.g[i][id] - (grid.g[i][id] - geq) / tau_thermal
        });
        grid.g[i] = collided;
    }

    for i in 0..QT {
        let e = VELOCITIES[i];
        let streamed: Vec<f64> = backend.map_cells(n, |id| {
            let (x, y, z) = grid.xyz(id);
            let src = grid.neighbor_periodic(x, y, z, -e[0], -e[1], -e[2]);
            grid.g[i][src]
        });
        grid.g_new[i] = streamed;
    }
    std::mem::swap(&mut grid.g, &mut grid.g_new);

    apply_thermal_boundaries(grid);

    let t_new: Vec<f64> = backend.map_cells(n, |id| (0..QT).map(|i| grid.g[i][id]).sum());
    grid.t = t_new;
}

/// Applies the per-cell `ThermalBc` after streaming: Dirichlet pins T by
/// resetting the distribution to local equilibrium at the prescribed value,
/// Neumann-zero copies the interior neighbor's T, Robin blends toward the
/// environment temperature at rate `h`.
fn apply_thermal_boundaries(grid: &mut Grid) {
    let n = grid.n_cells();
    for id in 0..n {
        match grid.thermal_bc[id] {
            ThermalBc::None => {}
            ThermalBc::Dirichlet { t } => {
                let u = grid.velocity_at(id);
                for i in 0..QT {
                    grid.g[i][id] = equilibrium_thermal(i, t, &u);
                }
            }
            ThermalBc::NeumannZero => {
                let (x, y, z) = grid.xyz(id);
                let interior = grid.neighbor_periodic(x, y, z, 0, 0, 1);
                if grid.tag[interior] != CellTag::Solid {
                    let t_interior: f64 = (0..QT).map(|i| grid.g[i][interior]).sum();
                    let u = grid.velocity_at(id);
                    for i in 0..QT {
                        grid.g[i][id] = equilibrium_thermal(i, t_interior, &u);
                    }
                }
            }
            ThermalBc::Robin { h, t_env } => {
                let t_current: f64 = (0..QT).map(|i| grid.g[i][id]).sum();
                let t_new = t_current + h * (t_env - t_current);
                let u = grid.velocity_at(id);
                for i in 0..QT {
                    grid.g[i][id] = equilibrium_thermal(i, t_new, &u);
                }
            }
        }
    }
}

/// Derives τ_mol from the Vogel-correlation water viscosity at the local
/// temperature, blended against the (temperature-insensitive) air phase by
/// the same φ-fraction weighting as `phase_field::update_molecular_relaxation`
/// (§4.2 step 2, §4.6). Used in place of the isothermal blend whenever
/// thermal coupling is active.
pub fn apply_vogel_to_relaxation(grid: &mut Grid, vogel: &VogelParams, tau_air: f64) {
    for id in 0..grid.n_cells() {
        let nu_water = vogel_viscosity(grid.t[id], vogel.a, vogel.b, vogel.t0);
        let tau_water = nu_water / CS2 + 0.5;
        let w = (grid.phi[id] + 1.0) * 0.5;
        grid.tau_mol[id] = tau_water * w + tau_air * (1.0 - w);
    }
}

/// Boussinesq buoyancy body force F = -ρ β (T - T_ref) g, added only when
/// `mode == ThermalMode::Strong` (§4.6).
pub fn accumulate_buoyancy_force(grid: &mut Grid, backend: &impl Backend, mode: ThermalMode, gravity: Vector3<f64>) {
    if mode != ThermalMode::Strong {
        return;
    }
    let n = grid.n_cells();
    let contributions = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() {
            return Vector3::zeros();
        }
        -grid.rho[id] * THERMAL_EXPANSION * (grid.t[id] - T_REF) * gravity
    });
    for id in 0..n {
        grid.add_force(id, contributions[id]);
    }
}
