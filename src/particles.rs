//! Lagrangian particle system (§4.5): a structure-of-arrays pool of coffee
//! grounds with Schiller-Naumann drag, trilinear fluid interpolation and
//! reaction scatter, soft-sphere contact, and elastic wall reflection.

use crate::backend::Backend;
use crate::grid::{CellTag, Grid};
use nalgebra::Vector3;
use rand::prelude::*;
use rand_distr::LogNormal;

/// Under-relaxation factor applied to the drag-induced velocity change each
/// step, per §4.5.
pub const UNDER_RELAXATION: f64 = 0.7;
/// Soft-sphere normal spring stiffness.
pub const CONTACT_STIFFNESS: f64 = 1e4;
/// Soft-sphere normal damping coefficient.
pub const CONTACT_DAMPING: f64 = 10.0;

/// Parameters of the truncated log-normal grind-size distribution.
#[derive(Debug, Clone, Copy)]
pub struct DistributionParams {
    pub median_radius: f64,
    pub geometric_std_dev: f64,
    pub r_min: f64,
    pub r_max: f64,
    pub density: f64,
    pub restitution: f64,
}

/// Structure-of-arrays particle pool with fixed capacity `P_max`.
pub struct ParticlePool {
    capacity: usize,
    pub active: Vec<bool>,
    pub x: Vec<Vector3<f64>>,
    pub v: Vec<Vector3<f64>>,
    pub radius: Vec<f64>,
    pub mass: Vec<f64>,
    pub density: Vec<f64>,
    pub cell_index: Vec<usize>,
    pub restitution: f64,
    n_active: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize, restitution: f64) -> Self {
        ParticlePool {
            capacity,
            active: vec![false; capacity],
            x: vec![Vector3::zeros(); capacity],
            v: vec![Vector3::zeros(); capacity],
            radius: vec![0.0; capacity],
            mass: vec![0.0; capacity],
            density: vec![0.0; capacity],
            cell_index: vec![0; capacity],
            restitution: restitution.clamp(0.0, 1.0),
            n_active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn n_active(&self) -> usize {
        self.n_active
    }

    #[cfg(test)]
    fn set_active_count(&mut self, n: usize) {
        self.n_active = n;
    }

    /// Seeds `count` particles at random interior positions within the flow
    /// region, radii drawn from a truncated log-normal distribution (§3).
    /// Never destroys existing particles; returns an error if capacity would
    /// be exceeded.
    pub fn seed(
        &mut self,
        grid: &Grid,
        count: usize,
        params: DistributionParams,
        seed: u64,
    ) -> Result<(), crate::error::ResourceError> {
        if self.n_active + count > self.capacity {
            return Err(crate::error::ResourceError::ParticlePoolOverflow {
                requested: self.n_active + count,
                capacity: self.capacity,
            });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let log_mean = params.median_radius.ln();
        let log_std = params.geometric_std_dev.ln().max(1e-9);
        let dist = LogNormal::new(log_mean, log_std).expect("valid log-normal parameters");

        let mut placed = 0;
        let mut attempts = 0;
        while placed < count && attempts < count * 100 {
            attempts += 1;
            let radius: f64 = dist.sample(&mut rng).clamp(params.r_min, params.r_max);
            let x = rng.random_range(1.0..(grid.nx as f64 - 1.0));
            let y = rng.random_range(1.0..(grid.ny as f64 - 1.0));
            let z = rng.random_range(1.0..(grid.nz as f64 - 1.0));
            let pos = Vector3::new(x, y, z);
            let (i, j, k) = (x as usize, y as usize, z as usize);
            let id = grid.idx(i.min(grid.nx - 1), j.min(grid.ny - 1), k.min(grid.nz - 1));
            if grid.tag[id] == CellTag::Solid {
                continue;
            }
            let slot = self.n_active + placed;
            let volume = (4.0 / 3.0) * std::f64::consts::PI * radius.powi(3);
            self.active[slot] = true;
            self.x[slot] = pos;
            self.v[slot] = Vector3::zeros();
            self.radius[slot] = radius;
            self.mass[slot] = params.density * volume;
            self.density[slot] = params.density;
            self.cell_index[slot] = id;
            placed += 1;
        }
        self.n_active += placed;
        Ok(())
    }
}

/// Schiller-Naumann drag coefficient as a function of particle Reynolds number.
pub fn drag_coefficient(re: f64) -> f64 {
    if re < 0.1 {
        24.0 / re.max(1e-12)
    } else if re < 1000.0 {
        (24.0 / re) * (1.0 + 0.15 * re.powf(0.687))
    } else {
        0.44
    }
}

/// Trilinear interpolation of a scalar field at a fractional position.
fn trilinear_sample(grid: &Grid, field: &[f64], pos: &Vector3<f64>) -> f64 {
    let (i0, j0, k0, fx, fy, fz) = trilinear_base(grid, pos);
    let mut acc = 0.0;
    for (di, wi) in [(0, 1.0 - fx), (1, fx)] {
        for (dj, wj) in [(0, 1.0 - fy), (1, fy)] {
            for (dk, wk) in [(0, 1.0 - fz), (1, fz)] {
                let id = grid.idx(
                    (i0 + di).min(grid.nx - 1),
                    (j0 + dj).min(grid.ny - 1),
                    (k0 + dk).min(grid.nz - 1),
                );
                acc += wi * wj * wk * field[id];
            }
        }
    }
    acc
}

fn trilinear_base(grid: &Grid, pos: &Vector3<f64>) -> (usize, usize, usize, f64, f64, f64) {
    let x = pos.x.clamp(0.0, (grid.nx - 1) as f64);
    let y = pos.y.clamp(0.0, (grid.ny - 1) as f64);
    let z = pos.z.clamp(0.0, (grid.nz - 1) as f64);
    let i0 = x.floor() as usize;
    let j0 = y.floor() as usize;
    let k0 = z.floor() as usize;
    (i0, j0, k0, x - i0 as f64, y - j0 as f64, z - k0 as f64)
}

/// Scatters a force contribution to the eight cells surrounding `pos` with
/// the same trilinear weights used to interpolate velocity (§4.5).
fn trilinear_scatter(grid: &mut Grid, pos: &Vector3<f64>, force: Vector3<f64>) {
    let (i0, j0, k0, fx, fy, fz) = trilinear_base(grid, pos);
    for (di, wi) in [(0, 1.0 - fx), (1, fx)] {
        for (dj, wj) in [(0, 1.0 - fy), (1, fy)] {
            for (dk, wk) in [(0, 1.0 - fz), (1, fz)] {
                let id = grid.idx(
                    (i0 + di).min(grid.nx - 1),
                    (j0 + dj).min(grid.ny - 1),
                    (k0 + dk).min(grid.nz - 1),
                );
                grid.add_force(id, force * (wi * wj * wk));
            }
        }
    }
}

/// Interpolates the fluid velocity at a particle position from the eight
/// surrounding cells.
fn interpolate_fluid_velocity(grid: &Grid, pos: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        trilinear_sample(grid, &grid.ux, pos),
        trilinear_sample(grid, &grid.uy, pos),
        trilinear_sample(grid, &grid.uz, pos),
    )
}

/// Drag force on one particle given the interpolated fluid state.
fn drag_force(v_rel: Vector3<f64>, radius: f64, rho_f: f64, mu_f: f64) -> Vector3<f64> {
    let speed = v_rel.norm();
    if speed < 1e-12 {
        return Vector3::zeros();
    }
    let re = rho_f * speed * (2.0 * radius) / mu_f.max(1e-12);
    let cd = drag_coefficient(re);
    let area = std::f64::consts::PI * radius * radius;
    0.5 * cd * rho_f * area * speed * v_rel
}

/// Integrates drag, gravity, and contact for every active particle, then
/// scatters the reaction force into the grid's body-force field (§4.5,
/// §5 ordering guarantee (c)). `cs` is the lattice sound speed used to cap
/// the drag-induced velocity change.
pub fn integrate_particles(
    pool: &mut ParticlePool,
    grid: &mut Grid,
    backend: &impl Backend,
    gravity: Vector3<f64>,
    mu_f: f64,
    cs: f64,
    dt: f64,
) {
    let n = pool.n_active();
    if n == 0 {
        return;
    }

    let updates: Vec<(Vector3<f64>, Vector3<f64>, usize)> = backend.map_cells(n, |p| {
        if !pool.active[p] {
            return (pool.x[p], pool.v[p], pool.cell_index[p]);
        }
        let rho_f = trilinear_sample(grid, &grid.rho, &pool.x[p]);
        let u_f = interpolate_fluid_velocity(grid, &pool.x[p]);
        let v_rel = u_f - pool.v[p];
        let f_drag = drag_force(v_rel, pool.radius[p], rho_f, mu_f);

        let max_dv = 0.1 * cs;
        let dv_drag = (f_drag / pool.mass[p]) * dt * UNDER_RELAXATION;
        let dv_drag = if dv_drag.norm() > max_dv { dv_drag.normalize() * max_dv } else { dv_drag };

        let buoyancy = -rho_f / pool.density[p] * gravity;
        let dv_body = (gravity + buoyancy) * dt;

        let v_new = pool.v[p] + dv_drag + dv_body;
        let x_new = pool.x[p] + v_new * dt;
        (x_new, v_new, pool.cell_index[p])
    });

    // Under-relaxed the same way as the particle-side update: the reaction
    // scattered onto a handful of lattice cells can otherwise exceed the
    // cells' own momentum capacity and oscillate (§4.5 "under-relaxation ...
    // guarantee the two-way coupling does not drive the fluid outside the
    // Mach gate").
    let reaction_forces: Vec<Vector3<f64>> = backend.map_cells(n, |p| {
        if !pool.active[p] {
            return Vector3::zeros();
        }
        let rho_f = trilinear_sample(grid, &grid.rho, &pool.x[p]);
        let u_f = interpolate_fluid_velocity(grid, &pool.x[p]);
        let v_rel = u_f - pool.v[p];
        -drag_force(v_rel, pool.radius[p], rho_f, mu_f) * UNDER_RELAXATION
    });

    for p in 0..n {
        if !pool.active[p] {
            continue;
        }
        trilinear_scatter(grid, &pool.x[p], reaction_forces[p]);
        let (mut x_new, mut v_new, _) = updates[p];
        reflect_off_walls(grid, &mut x_new, &mut v_new, pool.radius[p], pool.restitution);
        pool.x[p] = x_new;
        pool.v[p] = v_new;
        pool.cell_index[p] = clamp_cell_index(grid, &x_new);
    }

    resolve_contacts(pool);
}

fn clamp_cell_index(grid: &Grid, pos: &Vector3<f64>) -> usize {
    let i = (pos.x.round() as isize).clamp(0, grid.nx as isize - 1) as usize;
    let j = (pos.y.round() as isize).clamp(0, grid.ny as isize - 1) as usize;
    let k = (pos.z.round() as isize).clamp(0, grid.nz as isize - 1) as usize;
    grid.idx(i, j, k)
}

/// Clamps a particle to the domain bounding box, reflecting its velocity
/// component elastically (scaled by the restitution coefficient) whenever it
/// would cross a solid wall (§4.5).
fn reflect_off_walls(grid: &Grid, pos: &mut Vector3<f64>, vel: &mut Vector3<f64>, radius: f64, restitution: f64) {
    let bounds = [
        (0, radius, grid.nx as f64 - 1.0 - radius),
        (1, radius, grid.ny as f64 - 1.0 - radius),
        (2, radius, grid.nz as f64 - 1.0 - radius),
    ];
    for (axis, lo, hi) in bounds {
        if pos[axis] < lo {
            pos[axis] = lo + (lo - pos[axis]);
            vel[axis] = -vel[axis] * restitution;
        } else if pos[axis] > hi {
            pos[axis] = hi - (pos[axis] - hi);
            vel[axis] = -vel[axis] * restitution;
        }
    }
}

/// Applies a soft-sphere normal-spring correction for every overlapping
/// particle pair (§4.5). O(n^2); acceptable at the particle counts this
/// engine targets (hundreds to low thousands of grounds).
fn resolve_contacts(pool: &mut ParticlePool) {
    let n = pool.n_active();
    for a in 0..n {
        if !pool.active[a] {
            continue;
        }
        for b in (a + 1)..n {
            if !pool.active[b] {
                continue;
            }
            let delta_pos = pool.x[b] - pool.x[a];
            let dist = delta_pos.norm();
            let overlap = pool.radius[a] + pool.radius[b] - dist;
            if overlap <= 0.0 || dist < 1e-12 {
                continue;
            }
            let normal = delta_pos / dist;
            let v_rel = pool.v[b] - pool.v[a];
            let f_n = CONTACT_STIFFNESS * overlap - CONTACT_DAMPING * v_rel.dot(&normal);
            let force_on_b = f_n * normal;
            pool.v[b] += force_on_b / pool.mass[b];
            pool.v[a] -= force_on_b / pool.mass[a];
        }
    }
}
