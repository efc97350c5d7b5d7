//! Darcy + Forchheimer porous resistance (§4.4).

use crate::backend::Backend;
use crate::grid::{CellTag, Grid};
use nalgebra::Vector3;

/// Ergun-correlation estimate of permeability K from porosity and particle
/// diameter: K = ε^3 d_p^2 / (180 (1-ε)^2).
pub fn ergun_permeability(porosity: f64, particle_diameter: f64) -> f64 {
    porosity.powi(3) * particle_diameter.powi(2) / (180.0 * (1.0 - porosity).powi(2))
}

/// Ergun-correlation estimate of the inertial (Forchheimer) coefficient:
/// β = 1.75 / ε^3.
pub fn ergun_beta(porosity: f64) -> f64 {
    1.75 / porosity.powi(3)
}

/// Darcy + Forchheimer body force in a single porous cell:
/// F_por = -(μ/K) u - (ρ β / sqrt(K)) |u| u.
pub fn porous_force(mu: f64, rho: f64, permeability: f64, beta: f64, u: &Vector3<f64>) -> Vector3<f64> {
    if permeability <= 0.0 {
        return Vector3::zeros();
    }
    let darcy = -(mu / permeability) * u;
    let forchheimer = -(rho * beta / permeability.sqrt()) * u.norm() * u;
    darcy + forchheimer
}

/// Accumulates the porous resistance force into every porous cell's body
/// force (§4.7). `mu` is the local dynamic viscosity, derived from
/// `tau_mol` the same way the LBM core derives kinematic viscosity.
pub fn accumulate_porous_force(grid: &mut Grid, backend: &impl Backend) {
    let n = grid.n_cells();
    let contributions = backend.map_cells(n, |id| {
        if grid.tag[id] != CellTag::Porous {
            return Vector3::zeros();
        }
        let nu = crate::lattice::CS2 * (grid.tau_mol[id] - 0.5);
        let mu = nu * grid.rho[id];
        porous_force(
            mu,
            grid.rho[id],
            grid.permeability[id],
            grid.ergun_beta[id],
            &grid.velocity_at(id),
        )
    });
    for id in 0..n {
        grid.add_force(id, contributions[id]);
    }
}
