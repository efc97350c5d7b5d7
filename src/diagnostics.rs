//! Read-only diagnostic accumulation (§6 `diagnostics`, §4.1, §4.2): the
//! per-step stability measurements and running counters exposed by the
//! external API.

use crate::grid::{CellTag, Grid};
use crate::lattice::CS2;

/// Snapshot of the engine's running diagnostic counters (§6).
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Diagnostics {
    pub step_count: u64,
    pub max_speed: f64,
    pub max_cfl: f64,
    pub max_mach: f64,
    pub tau_eff_clips: u64,
    pub mass_drift: f64,
    pub kinetic_energy: f64,
}

/// Computes the per-step stability measurements over all flow cells:
/// max speed, max CFL (= max|u| Δt/Δx, with Δx=Δt=1), max Mach (= max|u|/c_s),
/// and total kinetic energy ½Σρ|u|².
pub fn measure(grid: &Grid) -> (f64, f64, f64, f64) {
    let cs = CS2.sqrt();
    let mut max_speed = 0.0_f64;
    let mut kinetic_energy = 0.0_f64;
    for id in 0..grid.n_cells() {
        if !grid.tag[id].is_flow_cell() {
            continue;
        }
        let speed = grid.velocity_at(id).norm();
        max_speed = max_speed.max(speed);
        kinetic_energy += 0.5 * grid.rho[id] * speed * speed;
    }
    let max_cfl = max_speed;
    let max_mach = max_speed / cs;
    (max_speed, max_cfl, max_mach, kinetic_energy)
}

/// Total mass (Σρ) over every cell where density is physically meaningful.
pub fn total_mass(grid: &Grid) -> f64 {
    (0..grid.n_cells())
        .filter(|&id| grid.tag[id] != CellTag::Solid)
        .map(|id| grid.rho[id])
        .sum()
}
