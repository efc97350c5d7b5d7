//! Immutable configuration record consumed by `Simulation::create`. Populated
//! by the embedding application; this crate never reads a config file itself.

use crate::error::ConfigurationError;
use nalgebra::Vector3;

/// Thermal coupling mode (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ThermalMode {
    /// g/T are not allocated; no thermal coupling at all.
    Off,
    /// Advection + viscosity update only, no buoyancy.
    Weak,
    /// Advection + viscosity update + Boussinesq buoyancy.
    Strong,
}

/// Physical-to-lattice scale factors (length, velocity, density, temperature).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ScaleFactors {
    pub length_m: f64,
    pub velocity_mps: f64,
    pub density_kgm3: f64,
    pub temperature_k: f64,
}

/// Default permeability/Ergun-coefficient pair used for porous cells that the
/// geometry provider did not override per-cell.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct PorousDefaults {
    pub permeability: f64,
    pub ergun_beta: f64,
}

/// Vogel-correlation coefficients for the temperature-dependent fluid
/// viscosity μ(T) = A exp(B / (T - T0)), only consulted when `thermal_mode`
/// is not `Off` (§4.6).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct VogelParams {
    pub a: f64,
    pub b: f64,
    pub t0: f64,
}

/// Immutable simulation configuration. Validated once at construction; there
/// is no runtime reflection and no partial mutation afterwards.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimulationConfig {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,

    /// Molecular relaxation time for the water phase.
    pub tau_fluid: f64,
    /// Molecular relaxation time for the air phase.
    pub tau_air: f64,

    /// Surface tension coefficient in lattice units (§4.3, §9 open question).
    pub sigma: f64,

    pub gravity: Vector3<f64>,
    /// Optional constant body-force driver, added alongside gravity (§4.7).
    pub pressure_gradient_drive: Vector3<f64>,
    /// Prescribed outlet pressure p_out for the extrapolation outlet (§4.8).
    pub outlet_pressure: f64,
    pub scale: ScaleFactors,

    pub particle_capacity: usize,

    pub thermal_mode: ThermalMode,
    pub tau_thermal: f64,
    pub vogel: VogelParams,

    pub porous_defaults: PorousDefaults,

    pub seed: u64,
}

impl SimulationConfig {
    /// Validates the record, returning the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(ConfigurationError::InvalidExtents {
                nx: self.nx,
                ny: self.ny,
                nz: self.nz,
            });
        }
        if self.tau_fluid <= 0.5 {
            return Err(ConfigurationError::InvalidTau { tau: self.tau_fluid });
        }
        if self.tau_air <= 0.5 {
            return Err(ConfigurationError::InvalidTau { tau: self.tau_air });
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(ConfigurationError::InvalidSurfaceTension { sigma: self.sigma });
        }
        if self.porous_defaults.permeability <= 0.0 {
            return Err(ConfigurationError::NegativePermeability {
                k: self.porous_defaults.permeability,
            });
        }
        if self.particle_capacity == 0 {
            return Err(ConfigurationError::InvalidParticleCapacity {
                capacity: self.particle_capacity,
            });
        }
        if self.thermal_mode != ThermalMode::Off && self.tau_thermal <= 0.5 {
            return Err(ConfigurationError::InconsistentThermal {
                mode: self.thermal_mode,
                tau_thermal: self.tau_thermal,
            });
        }
        Ok(())
    }

    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SimulationConfig {
        SimulationConfig {
            nx: 8,
            ny: 8,
            nz: 8,
            tau_fluid: 0.8,
            tau_air: 0.6,
            sigma: 0.001,
            gravity: Vector3::new(0.0, 0.0, -1e-6),
            pressure_gradient_drive: Vector3::zeros(),
            outlet_pressure: crate::lattice::CS2,
            scale: ScaleFactors {
                length_m: 0.001,
                velocity_mps: 0.01,
                density_kgm3: 1000.0,
                temperature_k: 300.0,
            },
            particle_capacity: 1000,
            thermal_mode: ThermalMode::Off,
            tau_thermal: 0.0,
            vogel: VogelParams { a: 1e-6, b: 500.0, t0: 150.0 },
            porous_defaults: PorousDefaults { permeability: 1e-9, ergun_beta: 2.0 },
            seed: 42,
        }
    }

    #[test]
    fn accepts_a_well_formed_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_zero_extents() {
        let mut c = base_config();
        c.nx = 0;
        assert_eq!(
            c.validate(),
            Err(ConfigurationError::InvalidExtents { nx: 0, ny: 8, nz: 8 })
        );
    }

    #[test]
    fn rejects_tau_at_or_below_half() {
        let mut c = base_config();
        c.tau_fluid = 0.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_negative_permeability() {
        let mut c = base_config();
        c.porous_defaults.permeability = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn strong_thermal_mode_requires_valid_tau_thermal() {
        let mut c = base_config();
        c.thermal_mode = ThermalMode::Strong;
        c.tau_thermal = 0.5;
        assert!(c.validate().is_err());
        c.tau_thermal = 0.9;
        assert!(c.validate().is_ok());
    }
}
