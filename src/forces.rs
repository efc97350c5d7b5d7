//! Force aggregator (§4.7): resets the shared body-force field at the start
//! of each step, then accumulates the constant drivers. Surface tension,
//! porous resistance, particle reaction, and buoyancy accumulate into the
//! same field directly from their owning modules.

use crate::grid::{CellTag, Grid};
use nalgebra::Vector3;

/// Adds gravity and the optional constant pressure-gradient driver to every
/// flow cell (§4.7, §4.9 step 4). Density-based driving is never applied
/// here; only body-force driving is permitted once time stepping has begun.
pub fn accumulate_constant_forces(grid: &mut Grid, gravity: Vector3<f64>, pressure_gradient_drive: Vector3<f64>) {
    let total = gravity + pressure_gradient_drive;
    if total == Vector3::zeros() {
        return;
    }
    for id in 0..grid.n_cells() {
        if grid.tag[id].is_flow_cell() {
            grid.add_force(id, total);
        }
    }
}

/// Zeros the body force, then accumulates the constant drivers in one call
/// (§4.9 steps 1 and 4 combined, used where no intervening contributor needs
/// to observe the zeroed-but-not-yet-driven state).
pub fn reset_and_accumulate_constant_forces(grid: &mut Grid, gravity: Vector3<f64>, pressure_gradient_drive: Vector3<f64>) {
    grid.zero_force();
    accumulate_constant_forces(grid, gravity, pressure_gradient_drive);
}

/// True wherever the tag admits fluid-like force contributions.
pub fn is_force_bearing(tag: CellTag) -> bool {
    tag.is_flow_cell()
}
