//! Smagorinsky LES closure (§4.2): strain-rate magnitude from the velocity
//! field, subgrid viscosity, and the τ_eff clipping counter.

use crate::backend::Backend;
use crate::grid::{CellTag, Grid};

pub const SMAGORINSKY_CS: f64 = 0.18;
pub const TAU_EFF_MIN: f64 = 0.51;
pub const TAU_EFF_MAX: f64 = 2.0;
const LOW_SHEAR_CUTOFF: f64 = 1e-3;
const INTERFACE_BAND_PHI: f64 = 0.9;

/// One-sided or central difference of `field` along axis `(di, dj, dk)` at
/// cell `(i, j, k)`, degrading to one-sided near solid neighbors (§4.2).
fn directional_derivative(
    grid: &Grid,
    field: &[f64],
    i: usize,
    j: usize,
    k: usize,
    di: i32,
    dj: i32,
    dk: i32,
) -> f64 {
    let id_plus = grid.neighbor_periodic(i, j, k, di, dj, dk);
    let id_minus = grid.neighbor_periodic(i, j, k, -di, -dj, -dk);
    let id = grid.idx(i, j, k);

    let plus_solid = grid.tag[id_plus] == CellTag::Solid;
    let minus_solid = grid.tag[id_minus] == CellTag::Solid;

    match (plus_solid, minus_solid) {
        (false, false) => (field[id_plus] - field[id_minus]) * 0.5,
        (true, false) => field[id] - field[id_minus],
        (false, true) => field[id_plus] - field[id],
        (true, true) => 0.0,
    }
}

/// Computes the strain-rate tensor magnitude |S| = sqrt(2 S_ab S_ab) at a cell.
fn strain_rate_magnitude(grid: &Grid, i: usize, j: usize, k: usize) -> f64 {
    let du = [
        directional_derivative(grid, &grid.ux, i, j, k, 1, 0, 0),
        directional_derivative(grid, &grid.ux, i, j, k, 0, 1, 0),
        directional_derivative(grid, &grid.ux, i, j, k, 0, 0, 1),
    ];
    let dv = [
        directional_derivative(grid, &grid.uy, i, j, k, 1, 0, 0),
        directional_derivative(grid, &grid.uy, i, j, k, 0, 1, 0),
        directional_derivative(grid, &grid.uy, i, j, k, 0, 0, 1),
    ];
    let dw = [
        directional_derivative(grid, &grid.uz, i, j, k, 1, 0, 0),
        directional_derivative(grid, &grid.uz, i, j, k, 0, 1, 0),
        directional_derivative(grid, &grid.uz, i, j, k, 0, 0, 1),
    ];
    let grad = [du, dv, dw];

    let mut sum = 0.0;
    for a in 0..3 {
        for b in 0..3 {
            let s_ab = 0.5 * (grad[a][b] + grad[b][a]);
            sum += s_ab * s_ab;
        }
    }
    (2.0 * sum).sqrt()
}

/// Computes subgrid viscosity ν_s = (C_s Δ)^2 |S| at every cell, suppressed
/// in porous cells, the interface band, and low-shear cells.
pub fn compute_subgrid_viscosity(grid: &mut Grid, backend: &impl Backend) {
    let delta = 1.0_f64; // (Δx Δy Δz)^(1/3) == 1 in lattice units.
    let coeff = (SMAGORINSKY_CS * delta).powi(2);
    let n = grid.n_cells();

    grid.nu_s = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() {
            return 0.0;
        }
        let (i, j, k) = grid.xyz(id);
        let s_mag = strain_rate_magnitude(grid, i, j, k);
        let suppressed = grid.tag[id] == CellTag::Porous
            || grid.phi[id].abs() < INTERFACE_BAND_PHI
            || s_mag < LOW_SHEAR_CUTOFF;
        if suppressed { 0.0 } else { coeff * s_mag }
    });
}

/// Computes τ_eff = τ_mol + 3 ν_s for every cell, clipped into
/// `[TAU_EFF_MIN, TAU_EFF_MAX]`. Returns the number of cells clipped this
/// step (added to the diagnostics counter by the caller).
pub fn effective_relaxation_times(grid: &Grid) -> (Vec<f64>, u64) {
    let n = grid.n_cells();
    let mut tau_eff = vec![TAU_EFF_MIN; n];
    let mut clips = 0u64;
    for id in 0..n {
        let raw = grid.tau_mol[id] + 3.0 * grid.nu_s[id];
        let clamped = raw.clamp(TAU_EFF_MIN, TAU_EFF_MAX);
        if (clamped - raw).abs() > f64::EPSILON {
            clips += 1;
        }
        tau_eff[id] = clamped;
    }
    (tau_eff, clips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    #[test]
    fn uniform_flow_has_zero_strain_and_zero_subgrid_viscosity() {
        let mut grid = Grid::new(8, 8, 8, false, 0.8).unwrap();
        for id in 0..grid.n_cells() {
            grid.ux[id] = 0.02;
        }
        compute_subgrid_viscosity(&mut grid, &CpuBackend);
        assert!(grid.nu_s.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn shear_flow_produces_nonzero_subgrid_viscosity_away_from_low_shear_cutoff() {
        let mut grid = Grid::new(8, 8, 8, false, 0.8).unwrap();
        for id in 0..grid.n_cells() {
            let (_, j, _) = grid.xyz(id);
            grid.ux[id] = 0.1 * j as f64;
        }
        compute_subgrid_viscosity(&mut grid, &CpuBackend);
        let interior = grid.idx(4, 4, 4);
        assert!(grid.nu_s[interior] > 0.0);
    }

    #[test]
    fn porous_and_interface_band_cells_are_suppressed() {
        let mut grid = Grid::new(8, 8, 8, false, 0.8).unwrap();
        for id in 0..grid.n_cells() {
            let (_, j, _) = grid.xyz(id);
            grid.ux[id] = 0.1 * j as f64;
        }
        let porous_id = grid.idx(4, 4, 4);
        grid.tag[porous_id] = CellTag::Porous;
        let band_id = grid.idx(3, 4, 4);
        grid.phi[band_id] = 0.1;

        compute_subgrid_viscosity(&mut grid, &CpuBackend);
        assert_eq!(grid.nu_s[porous_id], 0.0);
        assert_eq!(grid.nu_s[band_id], 0.0);
    }

    #[test]
    fn tau_eff_is_clipped_and_counted() {
        let mut grid = Grid::new(2, 2, 2, false, 3.0).unwrap();
        grid.nu_s.iter_mut().for_each(|v| *v = 0.0);
        let (tau_eff, clips) = effective_relaxation_times(&grid);
        assert!(tau_eff.iter().all(|&t| t == TAU_EFF_MAX));
        assert_eq!(clips as usize, grid.n_cells());
    }
}
