//! D3Q19 collision, streaming, and macroscopic recovery (§4.1, §4.9 steps
//! 6/7/9). Collision writes into `f_new`; streaming reads `f_new` and writes
//! `f` via an index-reversed gather, so no kernel ever mixes the two
//! buffers (§5 ordering guarantee (b)).

use crate::backend::Backend;
use crate::grid::{CellTag, Grid};
use crate::lattice::{self, Q};
use nalgebra::Vector3;

/// BGK + Guo-forcing collision for every flow cell, written into `f_new`.
/// `tau_eff` is the per-cell effective relaxation time from the LES closure.
pub fn collide(grid: &mut Grid, backend: &impl Backend, tau_eff: &[f64]) {
    let n = grid.n_cells();
    for i in 0..Q {
        let collided: Vec<f64> = backend.map_cells(n, |id| {
            if !grid.tag[id].is_flow_cell() {
                return grid.f[i][id];
            }
            let rho = grid.rho[id];
            let u = grid.velocity_at(id);
            let feq = lattice::equilibrium(i, rho, &u);
            let force = grid.force_at(id);
            let forcing = lattice::guo_forcing(i, &u, tau_eff[id], &force);
            grid.f[i][id] - (grid.f[i][id] - feq) / tau_eff[id] + forcing
        });
        grid.f_new[i] = collided;
    }
}

/// Streams `f_new` into `f`: cell `id`'s post-stream value in direction `i`
/// is the pre-stream value of its upwind neighbor (pull scheme).
pub fn stream(grid: &mut Grid, backend: &impl Backend) {
    let n = grid.n_cells();
    for i in 0..Q {
        let e = lattice::VELOCITIES[i];
        let streamed: Vec<f64> = backend.map_cells(n, |id| {
            let (x, y, z) = grid.xyz(id);
            let src = grid.neighbor_periodic(x, y, z, -e[0], -e[1], -e[2]);
            grid.f_new[i][src]
        });
        grid.f[i] = streamed;
    }
}

/// Recovers ρ and u from the post-stream distributions and the current body
/// force (Guo-corrected momentum, §4.1). Solid cells are left untouched;
/// their macro fields are not consumed by the rest of the pipeline.
pub fn recover_macro(grid: &mut Grid, backend: &impl Backend) {
    let n = grid.n_cells();
    let recovered: Vec<(f64, Vector3<f64>)> = backend.map_cells(n, |id| {
        if grid.tag[id] == CellTag::Solid {
            return (grid.rho[id], grid.velocity_at(id));
        }
        let rho: f64 = (0..Q).map(|i| grid.f[i][id]).sum();
        let mut momentum = Vector3::zeros();
        for i in 0..Q {
            momentum += lattice::velocity(i) * grid.f[i][id];
        }
        momentum += 0.5 * grid.force_at(id);
        let u = if rho > 0.0 { momentum / rho } else { Vector3::zeros() };
        (rho, u)
    });
    for id in 0..n {
        grid.rho[id] = recovered[id].0;
        grid.p[id] = recovered[id].0 * lattice::CS2;
        grid.ux[id] = recovered[id].1.x;
        grid.uy[id] = recovered[id].1.y;
        grid.uz[id] = recovered[id].1.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    #[test]
    fn collision_preserves_density_when_force_is_zero() {
        let mut grid = Grid::new(4, 4, 4, false, 0.8).unwrap();
        let tau_eff = vec![0.8; grid.n_cells()];
        collide(&mut grid, &CpuBackend, &tau_eff);
        for id in 0..grid.n_cells() {
            let rho_new: f64 = (0..Q).map(|i| grid.f_new[i][id]).sum();
            assert!((rho_new - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn streaming_then_recovery_round_trips_rest_equilibrium() {
        let mut grid = Grid::new(4, 4, 4, false, 0.8).unwrap();
        let tau_eff = vec![0.8; grid.n_cells()];
        collide(&mut grid, &CpuBackend, &tau_eff);
        stream(&mut grid, &CpuBackend);
        recover_macro(&mut grid, &CpuBackend);
        for id in 0..grid.n_cells() {
            assert!((grid.rho[id] - 1.0).abs() < 1e-10);
            assert!(grid.velocity_at(id).norm() < 1e-10);
        }
    }

    #[test]
    fn streaming_is_a_permutation_under_periodic_bcs() {
        let mut grid = Grid::new(4, 4, 4, false, 0.8).unwrap();
        let total_before: f64 = (0..Q).map(|i| grid.f_new[i].iter().sum::<f64>()).sum();
        // seed f_new directly (skip collision) to isolate the streaming kernel.
        for i in 0..Q {
            grid.f_new[i] = grid.f[i].clone();
        }
        stream(&mut grid, &CpuBackend);
        let total_after: f64 = (0..Q).map(|i| grid.f[i].iter().sum::<f64>()).sum();
        assert!((total_after - total_before).abs() < 1e-9);
    }

    #[test]
    fn solid_cells_are_untouched_by_macro_recovery() {
        let mut grid = Grid::new(4, 4, 4, false, 0.8).unwrap();
        let id = grid.idx(1, 1, 1);
        grid.tag[id] = CellTag::Solid;
        grid.rho[id] = -7.0;
        recover_macro(&mut grid, &CpuBackend);
        assert_eq!(grid.rho[id], -7.0);
    }
}
