//! Error taxonomy for the engine: configuration, stability, resource, and
//! precondition failures, matching the propagation policy of the orchestrator.

use thiserror::Error;

/// Raised by `Simulation::create` / `load_geometry` before any step has run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("grid extents must be positive, got ({nx}, {ny}, {nz})")]
    InvalidExtents { nx: usize, ny: usize, nz: usize },

    #[error("relaxation time tau must be > 0.5, got {tau}")]
    InvalidTau { tau: f64 },

    #[error("permeability must be positive, got {k}")]
    NegativePermeability { k: f64 },

    #[error("thermal mode {mode:?} requires tau_thermal > 0.5, got {tau_thermal}")]
    InconsistentThermal { mode: crate::config::ThermalMode, tau_thermal: f64 },

    #[error("particle pool capacity must be positive, got {capacity}")]
    InvalidParticleCapacity { capacity: usize },

    #[error("geometry mask length {got} does not match grid cell count {expected}")]
    GeometryMaskSizeMismatch { expected: usize, got: usize },

    #[error("surface tension coefficient sigma must be finite and non-negative, got {sigma}")]
    InvalidSurfaceTension { sigma: f64 },
}

/// Raised by `Simulation::step` when the stability gate fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StabilityError {
    #[error("non-finite {field} at cell {cell}")]
    NonFiniteField { cell: usize, field: &'static str },

    #[error("density non-positive ({rho}) at cell {cell}")]
    NonPositiveDensity { cell: usize, rho: f64 },

    #[error("Mach gate exceeded: max |u|/c_s = {max_mach} > 0.1")]
    MachExceeded { max_mach: f64 },

    #[error("CFL gate exceeded: max CFL = {max_cfl} > 0.1")]
    CflExceeded { max_cfl: f64 },

    #[error("tau_eff dropped to or below 0.5 at cell {cell} (value {tau_eff})")]
    TauCollapsed { cell: usize, tau_eff: f64 },
}

/// Raised on allocation failure or particle pool overflow.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("particle pool exhausted: requested {requested}, capacity {capacity}")]
    ParticlePoolOverflow { requested: usize, capacity: usize },
}

/// Raised on invalid call ordering.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("step() called before load_geometry()")]
    GeometryNotLoaded,

    #[error("engine halted by a prior StabilityError; call reset() before stepping again")]
    EngineHalted,
}

/// Top-level error type returned by the public API.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Stability(#[from] StabilityError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}
