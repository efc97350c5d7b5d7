//! Lattice storage: grid extents, double-buffered D3Q19/D3Q7 distributions,
//! macroscopic fields, and the per-cell tag/porous-parameter arrays supplied
//! by the external geometry provider.
//!
//! Storage is Structure-of-Arrays: every distribution direction and every
//! macro field is one contiguous `Vec<f64>` of length `nx*ny*nz`, indexed by
//! `Grid::idx`. This is what lets every kernel in `step.rs` be expressed as an
//! independent loop (or `rayon` parallel iterator) over a flat cell range.

use crate::error::ConfigurationError;
use crate::lattice::{self, Q};
use nalgebra::Vector3;

/// Per-cell geometric/boundary classification (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CellTag {
    Fluid,
    Solid,
    Porous,
    Inlet,
    Outlet,
    /// Ordinary fluid treatment at the boundary stage; the phase-field force
    /// carries the physics here (§4.8).
    InterfaceThickBand,
}

impl CellTag {
    #[inline]
    pub fn is_flow_cell(self) -> bool {
        matches!(
            self,
            CellTag::Fluid | CellTag::Porous | CellTag::Inlet | CellTag::Outlet | CellTag::InterfaceThickBand
        )
    }
}

/// D3Q7 thermal distribution, stored the same SoA way as `f`.
pub const QT: usize = 7;

/// Thermal boundary condition carried by boundary cells (§3, §4.6, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ThermalBc {
    None,
    Dirichlet { t: f64 },
    NeumannZero,
    Robin { h: f64, t_env: f64 },
}

/// The lattice: grid extents, distributions, macro fields, tags.
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,

    /// Nineteen contiguous distribution arrays (current).
    pub f: [Vec<f64>; Q],
    /// Nineteen contiguous distribution arrays (post-collision scratch).
    pub f_new: [Vec<f64>; Q],

    pub rho: Vec<f64>,
    pub p: Vec<f64>,
    pub phi: Vec<f64>,
    pub t: Vec<f64>,
    pub nu_s: Vec<f64>,

    pub ux: Vec<f64>,
    pub uy: Vec<f64>,
    pub uz: Vec<f64>,

    pub fx: Vec<f64>,
    pub fy: Vec<f64>,
    pub fz: Vec<f64>,

    pub nx_normal: Vec<f64>,
    pub ny_normal: Vec<f64>,
    pub nz_normal: Vec<f64>,
    pub kappa: Vec<f64>,

    pub tag: Vec<CellTag>,
    pub permeability: Vec<f64>,
    pub ergun_beta: Vec<f64>,
    pub thermal_bc: Vec<ThermalBc>,

    pub tau_mol: Vec<f64>,

    pub inlet_velocity: Vec<Vector3<f64>>,

    pub thermal_active: bool,
    pub g: [Vec<f64>; QT],
    pub g_new: [Vec<f64>; QT],
}

impl Grid {
    pub fn new(nx: usize, ny: usize, nz: usize, thermal_active: bool, default_tau_mol: f64) -> Result<Self, ConfigurationError> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(ConfigurationError::InvalidExtents { nx, ny, nz });
        }
        let n = nx * ny * nz;

        let mut f: [Vec<f64>; Q] = std::array::from_fn(|_| vec![0.0; n]);
        let mut f_new: [Vec<f64>; Q] = std::array::from_fn(|_| vec![0.0; n]);
        for i in 0..Q {
            f[i].fill(lattice::WEIGHTS[i]);
            f_new[i].fill(lattice::WEIGHTS[i]);
        }

        let g: [Vec<f64>; QT] = std::array::from_fn(|_| vec![0.0; n]);
        let g_new: [Vec<f64>; QT] = std::array::from_fn(|_| vec![0.0; n]);

        Ok(Grid {
            nx,
            ny,
            nz,
            f,
            f_new,
            rho: vec![1.0; n],
            p: vec![lattice::CS2; n],
            phi: vec![1.0; n],
            t: vec![0.0; n],
            nu_s: vec![0.0; n],
            ux: vec![0.0; n],
            uy: vec![0.0; n],
            uz: vec![0.0; n],
            fx: vec![0.0; n],
            fy: vec![0.0; n],
            fz: vec![0.0; n],
            nx_normal: vec![0.0; n],
            ny_normal: vec![0.0; n],
            nz_normal: vec![0.0; n],
            kappa: vec![0.0; n],
            tag: vec![CellTag::Fluid; n],
            permeability: vec![0.0; n],
            ergun_beta: vec![0.0; n],
            thermal_bc: vec![ThermalBc::None; n],
            tau_mol: vec![default_tau_mol; n],
            inlet_velocity: vec![Vector3::zeros(); n],
            thermal_active,
            g,
            g_new,
        })
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.ny + j) * self.nx + i
    }

    #[inline]
    pub fn xyz(&self, id: usize) -> (usize, usize, usize) {
        let i = id % self.nx;
        let j = (id / self.nx) % self.ny;
        let k = id / (self.nx * self.ny);
        (i, j, k)
    }

    /// Neighbor index along `(di, dj, dk)` with periodic wraparound, used by
    /// streaming and central differences.
    #[inline]
    pub fn neighbor_periodic(&self, i: usize, j: usize, k: usize, di: i32, dj: i32, dk: i32) -> usize {
        let ni = Self::wrap(i as i32 + di, self.nx);
        let nj = Self::wrap(j as i32 + dj, self.ny);
        let nk = Self::wrap(k as i32 + dk, self.nz);
        self.idx(ni, nj, nk)
    }

    #[inline]
    fn wrap(v: i32, n: usize) -> usize {
        let n = n as i32;
        (((v % n) + n) % n) as usize
    }

    #[inline]
    pub fn velocity_at(&self, id: usize) -> Vector3<f64> {
        Vector3::new(self.ux[id], self.uy[id], self.uz[id])
    }

    #[inline]
    pub fn force_at(&self, id: usize) -> Vector3<f64> {
        Vector3::new(self.fx[id], self.fy[id], self.fz[id])
    }

    /// Zeros the aggregated body force; must run before any contributor
    /// accumulates into it (§4.7, §5 ordering guarantee (a)).
    pub fn zero_force(&mut self) {
        self.fx.iter_mut().for_each(|v| *v = 0.0);
        self.fy.iter_mut().for_each(|v| *v = 0.0);
        self.fz.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn add_force(&mut self, id: usize, f: Vector3<f64>) {
        self.fx[id] += f.x;
        self.fy[id] += f.y;
        self.fz[id] += f.z;
    }
}
