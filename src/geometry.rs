//! Geometry mask ingestion (§2 item 2, §6 `load_geometry`): the solid/porous
//! mask and inlet geometry are produced by an external collaborator (V60
//! mesh construction); this crate only consumes the resulting per-cell tags
//! and porous parameters.

use crate::error::ConfigurationError;
use crate::grid::{CellTag, Grid};

/// Per-cell porous parameters supplied alongside the tag mask.
#[derive(Debug, Clone, Copy)]
pub struct PorousCell {
    pub permeability: f64,
    pub ergun_beta: f64,
}

/// Loads a cell-tag mask and per-cell porous parameters into the grid.
/// `masks` and `porous` must both have length `grid.n_cells()`; porous
/// entries are only meaningful where `masks[i] == CellTag::Porous` and are
/// otherwise ignored.
pub fn load_geometry(grid: &mut Grid, masks: &[CellTag], porous: &[PorousCell]) -> Result<(), ConfigurationError> {
    let expected = grid.n_cells();
    if masks.len() != expected {
        return Err(ConfigurationError::GeometryMaskSizeMismatch { expected, got: masks.len() });
    }
    if porous.len() != expected {
        return Err(ConfigurationError::GeometryMaskSizeMismatch { expected, got: porous.len() });
    }

    grid.tag.copy_from_slice(masks);
    for id in 0..expected {
        if masks[id] == CellTag::Porous {
            if porous[id].permeability <= 0.0 {
                return Err(ConfigurationError::NegativePermeability { k: porous[id].permeability });
            }
            grid.permeability[id] = porous[id].permeability;
            grid.ergun_beta[id] = porous[id].ergun_beta;
        }
    }
    Ok(())
}

/// Writes the inlet velocity field for every inlet-tagged cell (§6
/// `set_inlet_velocity`), updatable every step by the pouring collaborator.
/// `field` must cover every cell (non-inlet entries are ignored).
pub fn set_inlet_velocity(grid: &mut Grid, field: &[nalgebra::Vector3<f64>]) -> Result<(), ConfigurationError> {
    let expected = grid.n_cells();
    if field.len() != expected {
        return Err(ConfigurationError::GeometryMaskSizeMismatch { expected, got: field.len() });
    }
    for id in 0..expected {
        if grid.tag[id] == CellTag::Inlet {
            grid.inlet_velocity[id] = field[id];
        }
    }
    Ok(())
}
