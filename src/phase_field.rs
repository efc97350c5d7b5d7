//! Phase-field multiphase coupling (§4.3): advection-diffusion of the order
//! parameter φ∈[−1,1] via a Cahn-Hilliard chemical potential, the interface
//! normal/curvature derived from its gradient, and the continuum
//! surface-tension body force.

use crate::backend::Backend;
use crate::grid::Grid;
use nalgebra::Vector3;

/// Interface thickness parameter ξ, chosen so the numerical interface band
/// spans roughly four cells (§4.3).
pub const XI: f64 = 1.0;
/// Cahn-Hilliard mobility M.
pub const MOBILITY: f64 = 0.05;

fn central_difference(grid: &Grid, field: &[f64], i: usize, j: usize, k: usize, di: i32, dj: i32, dk: i32) -> f64 {
    let id_plus = grid.neighbor_periodic(i, j, k, di, dj, dk);
    let id_minus = grid.neighbor_periodic(i, j, k, -di, -dj, -dk);
    (field[id_plus] - field[id_minus]) * 0.5
}

/// Gradient of an arbitrary scalar field at cell `(i, j, k)`.
fn gradient_of(grid: &Grid, field: &[f64], i: usize, j: usize, k: usize) -> Vector3<f64> {
    Vector3::new(
        central_difference(grid, field, i, j, k, 1, 0, 0),
        central_difference(grid, field, i, j, k, 0, 1, 0),
        central_difference(grid, field, i, j, k, 0, 0, 1),
    )
}

/// Discrete Laplacian of an arbitrary scalar field via the 6-neighbor stencil.
fn laplacian_of(grid: &Grid, field: &[f64], i: usize, j: usize, k: usize) -> f64 {
    let id = grid.idx(i, j, k);
    let center = field[id];
    let mut sum = -6.0 * center;
    for (di, dj, dk) in [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)] {
        sum += field[grid.neighbor_periodic(i, j, k, di, dj, dk)];
    }
    sum
}

fn phi_gradient(grid: &Grid, i: usize, j: usize, k: usize) -> Vector3<f64> {
    gradient_of(grid, &grid.phi, i, j, k)
}

/// Advances φ one step by ∂_t φ + u·∇φ = M ∇²μ, μ = φ³ − φ − ξ²∇²φ (§4.3).
/// Solid and non-flow cells hold φ fixed.
pub fn advance_phase_field(grid: &mut Grid, backend: &impl Backend, dt: f64) {
    let n = grid.n_cells();

    let mu: Vec<f64> = backend.map_cells(n, |id| {
        let (i, j, k) = grid.xyz(id);
        let phi = grid.phi[id];
        phi.powi(3) - phi - XI * XI * laplacian_of(grid, &grid.phi, i, j, k)
    });

    let updated = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() {
            return grid.phi[id];
        }
        let (i, j, k) = grid.xyz(id);
        let grad_phi = phi_gradient(grid, i, j, k);
        let u = grid.velocity_at(id);
        let advection = -u.dot(&grad_phi);
        let diffusion = MOBILITY * laplacian_of(grid, &mu, i, j, k);
        (grid.phi[id] + dt * (advection + diffusion)).clamp(-1.0, 1.0)
    });
    grid.phi = updated;
}

/// Interface unit normal n = ∇φ/|∇φ| and curvature κ = −∇·n (§4.3).
/// Safe-guarded to zero where |∇φ| is too small to define a normal.
pub fn update_normal_and_curvature(grid: &mut Grid, backend: &impl Backend) {
    let n = grid.n_cells();
    let gradients = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() {
            return Vector3::zeros();
        }
        let (i, j, k) = grid.xyz(id);
        phi_gradient(grid, i, j, k)
    });

    let normals: Vec<Vector3<f64>> = gradients
        .iter()
        .map(|g| {
            let mag = g.norm();
            if mag > 1e-8 { g / mag } else { Vector3::zeros() }
        })
        .collect();

    for id in 0..n {
        grid.nx_normal[id] = normals[id].x;
        grid.ny_normal[id] = normals[id].y;
        grid.nz_normal[id] = normals[id].z;
    }

    let kappa = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() || gradients[id].norm() < 1e-8 {
            return 0.0;
        }
        let (i, j, k) = grid.xyz(id);
        let div_nx = central_difference(grid, &grid.nx_normal, i, j, k, 1, 0, 0);
        let div_ny = central_difference(grid, &grid.ny_normal, i, j, k, 0, 1, 0);
        let div_nz = central_difference(grid, &grid.nz_normal, i, j, k, 0, 0, 1);
        -(div_nx + div_ny + div_nz)
    });
    grid.kappa = kappa;
}

/// Continuum surface-tension force F_st = σ κ ∇φ (§4.3).
pub fn accumulate_surface_tension_force(grid: &mut Grid, backend: &impl Backend, sigma: f64) {
    let n = grid.n_cells();
    let contributions = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() {
            return Vector3::zeros();
        }
        let (i, j, k) = grid.xyz(id);
        sigma * grid.kappa[id] * phi_gradient(grid, i, j, k)
    });
    for id in 0..n {
        grid.add_force(id, contributions[id]);
    }
}

/// Density mapping ρ(φ) = ρ_w(φ+1)/2 + ρ_a(1−φ)/2, used only to derive the
/// local molecular relaxation time (§4.3); distributions still evolve from a
/// single equilibrium with ρ recovered from Σf_i.
pub fn phase_density(phi: f64, rho_water: f64, rho_air: f64) -> f64 {
    rho_water * (phi + 1.0) * 0.5 + rho_air * (1.0 - phi) * 0.5
}

/// Blends τ_mol per cell from the local phase fraction between the water and
/// air molecular relaxation times.
pub fn update_molecular_relaxation(grid: &mut Grid, tau_water: f64, tau_air: f64) {
    for id in 0..grid.n_cells() {
        let w = (grid.phi[id] + 1.0) * 0.5;
        grid.tau_mol[id] = tau_water * w + tau_air * (1.0 - w);
    }
}

/// Total φ mass over flow cells, used by the conservation diagnostic (§8).
pub fn total_phase_mass(grid: &Grid) -> f64 {
    (0..grid.n_cells())
        .filter(|&id| grid.tag[id].is_flow_cell())
        .map(|id| grid.phi[id])
        .sum()
}
