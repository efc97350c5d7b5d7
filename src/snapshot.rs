//! Raw snapshot dump (§6): the macro view and particle view as flat float32
//! arrays with a small header, and a bit-exact cell-tag mask round trip. No
//! wire protocol beyond this is mandated; there is no filesystem I/O here.

use crate::grid::{CellTag, Grid};
use serde::{Deserialize, Serialize};

/// Describes the layout of the float32 payload that follows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Field names in the order their contiguous float32 blocks appear in
    /// the payload returned by `dump_macro_view`.
    pub fields: Vec<String>,
}

const MACRO_FIELD_ORDER: [&str; 9] = ["rho", "p", "phi", "t", "nu_s", "ux", "uy", "uz", "kappa"];

/// Dumps ρ, p, φ, T, νₛ, u (three components), and κ as one flat float32
/// buffer, each field a contiguous `Nx*Ny*Nz` block in the order given by
/// the returned header's `fields`.
pub fn dump_macro_view(grid: &Grid) -> (SnapshotHeader, Vec<f32>) {
    let n = grid.n_cells();
    let header = SnapshotHeader {
        nx: grid.nx,
        ny: grid.ny,
        nz: grid.nz,
        fields: MACRO_FIELD_ORDER.iter().map(|s| s.to_string()).collect(),
    };
    let mut payload = Vec::with_capacity(n * MACRO_FIELD_ORDER.len());
    for field in [
        &grid.rho, &grid.p, &grid.phi, &grid.t, &grid.nu_s, &grid.ux, &grid.uy, &grid.uz, &grid.kappa,
    ] {
        payload.extend(field.iter().map(|&v| v as f32));
    }
    (header, payload)
}

/// Dumps the particle pool's positions, velocities, radii, and active flags
/// as flat float32 blocks (active flags encoded as 0.0/1.0), one entry per
/// particle slot.
pub fn dump_particle_view(pool: &crate::particles::ParticlePool) -> Vec<f32> {
    let cap = pool.capacity();
    let mut payload = Vec::with_capacity(cap * 8);
    for p in 0..cap {
        payload.push(pool.x[p].x as f32);
        payload.push(pool.x[p].y as f32);
        payload.push(pool.x[p].z as f32);
        payload.push(pool.v[p].x as f32);
        payload.push(pool.v[p].y as f32);
        payload.push(pool.v[p].z as f32);
        payload.push(pool.radius[p] as f32);
        payload.push(if pool.active[p] { 1.0 } else { 0.0 });
    }
    payload
}

/// Restores the cell-tag mask bit-exact from a previously dumped array.
pub fn restore_mask(grid: &mut Grid, mask: &[CellTag]) -> Result<(), crate::error::ConfigurationError> {
    if mask.len() != grid.n_cells() {
        return Err(crate::error::ConfigurationError::GeometryMaskSizeMismatch {
            expected: grid.n_cells(),
            got: mask.len(),
        });
    }
    grid.tag.copy_from_slice(mask);
    Ok(())
}
