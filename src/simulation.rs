//! Public engine handle (§6): a single opaque `Simulation` exposing
//! `create`/`load_geometry`/`seed_particles`/`set_inlet_velocity`/`step`/
//! `macro_view`/`particle_view`/`diagnostics`/`reset`. There is exactly one
//! engine per process, so these are inherent methods rather than a trait.

use nalgebra::Vector3;
use tracing::{info, warn};

use crate::backend::CpuBackend;
use crate::config::SimulationConfig;
use crate::diagnostics::{self, Diagnostics};
use crate::error::{PreconditionError, SimError};
use crate::geometry::{self, PorousCell};
use crate::grid::{CellTag, Grid};
use crate::particles::{DistributionParams, ParticlePool};
use crate::snapshot::{self, SnapshotHeader};
use crate::step::{self, StepReport};

/// The engine handle. Owns the lattice, the particle pool, and the running
/// diagnostics counters; `config` is immutable for the handle's lifetime.
pub struct Simulation {
    config: SimulationConfig,
    grid: Grid,
    particles: ParticlePool,
    backend: CpuBackend,
    geometry_loaded: bool,
    fatal: bool,
    step_count: u64,
    tau_eff_clips_total: u64,
    initial_mass: f64,
}

impl Simulation {
    /// Validates `config` and allocates the lattice and particle pool.
    /// Mirrors `ConfigurationError`'s "fatal before any step runs" policy.
    pub fn create(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let thermal_active = config.thermal_mode != crate::config::ThermalMode::Off;
        let grid = Grid::new(config.nx, config.ny, config.nz, thermal_active, config.tau_fluid)?;
        let particles = ParticlePool::new(config.particle_capacity, 0.8);
        let initial_mass = diagnostics::total_mass(&grid);
        info!(nx = config.nx, ny = config.ny, nz = config.nz, "simulation created");
        Ok(Simulation {
            config,
            grid,
            particles,
            backend: CpuBackend,
            geometry_loaded: false,
            fatal: false,
            step_count: 0,
            tau_eff_clips_total: 0,
            initial_mass,
        })
    }

    /// Loads the cell-tag mask and per-cell porous parameters produced by the
    /// mesh-construction collaborator.
    pub fn load_geometry(&mut self, masks: &[CellTag], porous: &[PorousCell]) -> Result<(), SimError> {
        geometry::load_geometry(&mut self.grid, masks, porous)?;
        self.geometry_loaded = true;
        self.initial_mass = diagnostics::total_mass(&self.grid);
        Ok(())
    }

    /// Seeds `count` additional particles; never destroys existing ones.
    pub fn seed_particles(&mut self, count: usize, params: DistributionParams) -> Result<(), SimError> {
        self.particles.restitution = params.restitution.clamp(0.0, 1.0);
        self.particles
            .seed(&self.grid, count, params, self.config.seed)
            .map_err(SimError::from)
    }

    /// Writes the inlet velocity field; updatable every step by the pouring
    /// collaborator.
    pub fn set_inlet_velocity(&mut self, field: &[Vector3<f64>]) -> Result<(), SimError> {
        geometry::set_inlet_velocity(&mut self.grid, field)?;
        Ok(())
    }

    /// Advances the engine by one lattice step (§4.9). Refuses to run before
    /// `load_geometry` or after a prior `StabilityError`, until `reset`.
    pub fn step(&mut self) -> Result<StepReport, SimError> {
        if !self.geometry_loaded {
            return Err(SimError::Precondition(PreconditionError::GeometryNotLoaded));
        }
        if self.fatal {
            return Err(SimError::Precondition(PreconditionError::EngineHalted));
        }

        let result = step::run_step(
            &mut self.grid,
            &mut self.particles,
            &self.backend,
            &self.config,
            &mut self.step_count,
            &mut self.tau_eff_clips_total,
            self.initial_mass,
        );

        if let Err(err) = &result {
            warn!(error = %err, "step failed stability gate, halting");
            self.fatal = true;
        }
        result
    }

    /// Read-only macro view {ρ, u, p, φ, T, νₛ}, valid until the next `step`.
    pub fn macro_view(&self) -> (SnapshotHeader, Vec<f32>) {
        snapshot::dump_macro_view(&self.grid)
    }

    /// Read-only particle view: SoA of positions, velocities, radii, and
    /// active flags.
    pub fn particle_view(&self) -> Vec<f32> {
        snapshot::dump_particle_view(&self.particles)
    }

    /// The running diagnostic counters, independent of whether the last step
    /// succeeded (the pre-failure snapshot remains available after a halt).
    pub fn diagnostics(&self) -> Diagnostics {
        let (max_speed, max_cfl, max_mach, kinetic_energy) = diagnostics::measure(&self.grid);
        Diagnostics {
            step_count: self.step_count,
            max_speed,
            max_cfl,
            max_mach,
            tau_eff_clips: self.tau_eff_clips_total,
            mass_drift: diagnostics::total_mass(&self.grid) - self.initial_mass,
            kinetic_energy,
        }
    }

    /// Clears the `fatal` flag raised by a prior `StabilityError`, allowing
    /// `step` to run again. Does not rewind lattice state; callers that need
    /// rollback must checkpoint externally via `macro_view`/`particle_view`.
    pub fn reset(&mut self) {
        self.fatal = false;
    }
}
