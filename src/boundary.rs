//! Distribution boundary conditions (§4.8): half-way bounce-back on solid
//! cells, Zou-He velocity inlet, and second-order extrapolation outlet.
//! Runs after streaming, before macro recovery (§4.9 step 8).

use crate::backend::Backend;
use crate::grid::{CellTag, Grid};
use crate::lattice::{self, CS2, OPPOSITE, Q, VELOCITIES};

/// Half-way bounce-back: for every flow cell with a solid neighbor in
/// direction `e_i`, the population that would have entered the solid is
/// reflected back into the opposite direction at the same cell, using the
/// pre-stream (post-collision) value held in `f_new` (§4.8).
pub fn apply_bounce_back(grid: &mut Grid, backend: &impl Backend) {
    let n = grid.n_cells();
    let mut corrections = vec![None; n * Q];
    let flat: Vec<Vec<(usize, f64)>> = backend.map_cells(n, |id| {
        if !grid.tag[id].is_flow_cell() {
            return Vec::new();
        }
        let (x, y, z) = grid.xyz(id);
        let mut out = Vec::new();
        for i in 0..Q {
            let e = VELOCITIES[i];
            let neighbor = grid.neighbor_periodic(x, y, z, e[0], e[1], e[2]);
            if grid.tag[neighbor] == CellTag::Solid {
                out.push((OPPOSITE[i], grid.f_new[i][id]));
            }
        }
        out
    });
    for (id, entries) in flat.into_iter().enumerate() {
        for (dir, value) in entries {
            corrections[id * Q + dir] = Some(value);
        }
    }
    for id in 0..n {
        for dir in 0..Q {
            if let Some(value) = corrections[id * Q + dir] {
                grid.f[dir][id] = value;
            }
        }
    }
}

/// Returns the dominant lattice axis (0=x,1=y,2=z) and its sign (±1) of a
/// velocity vector, used to orient the Zou-He reconstruction.
fn dominant_axis(u: &[f64; 3]) -> (usize, i32) {
    let axis = (0..3).max_by(|&a, &b| u[a].abs().partial_cmp(&u[b].abs()).unwrap()).unwrap();
    let sign = if u[axis] >= 0.0 { 1 } else { -1 };
    (axis, sign)
}

/// Zou-He velocity boundary: reconstructs the populations unknown after
/// streaming (those directed along the inflow axis) from density conservation
/// and a non-equilibrium bounce-back closure (§4.8). The inlet plane's
/// orientation is inferred from the dominant axis of the prescribed inlet
/// velocity at each cell.
pub fn apply_zou_he_inlet(grid: &mut Grid, backend: &impl Backend) {
    let n = grid.n_cells();
    let updates: Vec<Option<(f64, [f64; Q])>> = backend.map_cells(n, |id| {
        if grid.tag[id] != CellTag::Inlet {
            return None;
        }
        let u_in = grid.inlet_velocity[id];
        let u = [u_in.x, u_in.y, u_in.z];
        let (axis, s) = dominant_axis(&u);

        let mut zero_axis_sum = 0.0;
        let mut known_asym_sum = 0.0;
        for i in 0..Q {
            let e_axis = VELOCITIES[i][axis];
            if e_axis == 0 {
                zero_axis_sum += grid.f[i][id];
            } else if e_axis == -s {
                known_asym_sum += grid.f[i][id];
            }
        }
        let rho = (zero_axis_sum + 2.0 * known_asym_sum) / (1.0 - s as f64 * u[axis]);

        let mut f_new = [0.0; Q];
        for i in 0..Q {
            f_new[i] = grid.f[i][id];
        }
        for i in 0..Q {
            if VELOCITIES[i][axis] == s {
                let eu = lattice::velocity(i).dot(&u_in);
                f_new[i] = grid.f[OPPOSITE[i]][id] + 2.0 * lattice::WEIGHTS[i] * rho * eu / CS2;
            }
        }
        Some((rho, f_new))
    });

    for id in 0..n {
        if let Some((rho, f_new)) = &updates[id] {
            for i in 0..Q {
                grid.f[i][id] = f_new[i];
            }
            grid.rho[id] = *rho;
        }
    }
}

/// Finds the axis and inward sign along which an outlet cell borders the
/// interior of the domain, by walking outward from the cell along each axis
/// until leaving the grid or hitting a non-flow cell.
fn inward_axis_and_sign(grid: &Grid, i: usize, j: usize, k: usize) -> Option<(usize, i32)> {
    let candidates = [
        (0, i, grid.nx),
        (1, j, grid.ny),
        (2, k, grid.nz),
    ];
    for (axis, coord, extent) in candidates {
        if coord == 0 {
            let (di, dj, dk) = match axis {
                0 => (1, 0, 0),
                1 => (0, 1, 0),
                _ => (0, 0, 1),
            };
            let neighbor = grid.neighbor_periodic(i, j, k, di, dj, dk);
            if grid.tag[neighbor].is_flow_cell() {
                return Some((axis, 1));
            }
        } else if coord == extent - 1 {
            let (di, dj, dk) = match axis {
                0 => (-1, 0, 0),
                1 => (0, -1, 0),
                _ => (0, 0, -1),
            };
            let neighbor = grid.neighbor_periodic(i, j, k, di, dj, dk);
            if grid.tag[neighbor].is_flow_cell() {
                return Some((axis, -1));
            }
        }
    }
    None
}

/// Second-order extrapolation outlet: each outlet cell's distributions are
/// extrapolated from the two interior neighbors along the outward normal,
/// then rescaled toward the prescribed outlet pressure `p_out` (§4.8).
pub fn apply_extrapolation_outlet(grid: &mut Grid, backend: &impl Backend, p_out: f64) {
    let n = grid.n_cells();
    let rho_out = p_out / CS2;

    let updates: Vec<Option<[f64; Q]>> = backend.map_cells(n, |id| {
        if grid.tag[id] != CellTag::Outlet {
            return None;
        }
        let (i, j, k) = grid.xyz(id);
        let (axis, sign) = inward_axis_and_sign(grid, i, j, k)?;
        let (di, dj, dk) = match axis {
            0 => (sign, 0, 0),
            1 => (0, sign, 0),
            _ => (0, 0, sign),
        };
        let n1 = grid.neighbor_periodic(i, j, k, di, dj, dk);
        let n2 = grid.neighbor_periodic(i, j, k, 2 * di, 2 * dj, 2 * dk);

        let mut f_new = [0.0; Q];
        for (f_i, item) in f_new.iter_mut().enumerate() {
            *item = 2.0 * grid.f[f_i][n1] - grid.f[f_i][n2];
        }
        let rho_extrap: f64 = f_new.iter().sum();
        if rho_extrap > 1e-12 {
            let scale = rho_out / rho_extrap;
            for v in f_new.iter_mut() {
                *v *= scale;
            }
        }
        Some(f_new)
    });

    for id in 0..n {
        if let Some(f_new) = &updates[id] {
            for i in 0..Q {
                grid.f[i][id] = f_new[i];
            }
        }
    }
}
