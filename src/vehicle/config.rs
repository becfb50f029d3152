use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::{Stage, StageBuilder};

// ---------------------------------------------------------------------------
// Payload and fairing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub mass: f64,      // kg
    pub length: f64,    // m
    pub diameter: f64,  // m
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fairing {
    pub mass: f64,      // kg
    pub length: f64,    // m
    pub diameter: f64,  // m
}

/// Reasons a configuration commit is refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least 2 stages are required, found {found}")]
    TooFewStages { found: usize },
    #[error("stage {index}: invalid {field} ({value})")]
    InvalidStage { index: usize, field: &'static str, value: f64 },
    #[error("payload: invalid {field} ({value})")]
    InvalidPayload { field: &'static str, value: f64 },
    #[error("fairing: invalid {field} ({value})")]
    InvalidFairing { field: &'static str, value: f64 },
    #[error("propellant density must be positive, got {0}")]
    InvalidPropellantDensity(f64),
    #[error("fairing jettison altitude must be non-negative, got {0}")]
    InvalidJettisonAltitude(f64),
}

// ---------------------------------------------------------------------------
// Vehicle configuration
// ---------------------------------------------------------------------------

/// Validated vehicle configuration, shared read-only by the physics.
///
/// [`VehicleConfigBuilder::build`] is the validating constructor; serde
/// deserialization goes through it as well. The fields stay public for
/// reading, and consumers that take ownership (the simulation) re-run the
/// builder before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VehicleConfigBuilder")]
pub struct VehicleConfiguration {
    pub stages: Vec<Stage>,
    pub payload: Payload,
    pub fairing: Fairing,
    pub fairing_jettison_altitude: f64,  // m
    pub propellant_density: f64,         // kg/m^3
    pub rcs_torque: f64,                 // N·m, reaction control authority
}

impl VehicleConfiguration {
    pub fn builder() -> VehicleConfigBuilder {
        VehicleConfigBuilder::from_config(&Self::default())
    }

    /// Edit a copy of this configuration.
    pub fn to_builder(&self) -> VehicleConfigBuilder {
        VehicleConfigBuilder::from_config(self)
    }

    /// Sum of stage lengths plus the taller of payload and fairing.
    pub fn total_length(&self) -> f64 {
        self.stages.iter().map(|s| s.length).sum::<f64>() + self.payload.length.max(self.fairing.length)
    }

    /// Tank capacity of stage `idx` (0 for a missing stage).
    pub fn max_propellant_for_stage(&self, idx: usize) -> f64 {
        self.stages
            .get(idx)
            .map(|s| s.max_propellant(self.propellant_density))
            .unwrap_or(0.0)
    }

    /// Wet mass of the full stack at liftoff.
    pub fn liftoff_mass(&self) -> f64 {
        self.stages.iter().map(Stage::wet_mass).sum::<f64>() + self.payload.mass + self.fairing.mass
    }
}

impl Default for VehicleConfiguration {
    /// Medium-lift two-stage reference vehicle.
    fn default() -> Self {
        let stages = vec![
            StageBuilder::new("First stage")
                .dry_mass(25_600.0)
                .propellant_mass(395_700.0)
                .thrust(7_607_000.0, 8_227_000.0)
                .isp(282.0, 311.0)
                .diameter(3.7)
                .length(47.7)
                .tank_length_ratio(0.85)
                .engine_length(3.0)
                .engine_mass_fraction(0.35)
                .drag_coeff(0.30)
                .gimbal_max_deg(5.0)
                .gimbal_rate_deg(15.0)
                .gimbal_point(1.0)
                .build(),
            StageBuilder::new("Second stage")
                .dry_mass(4_000.0)
                .propellant_mass(92_670.0)
                .thrust(800_000.0, 981_000.0)
                .isp(300.0, 348.0)
                .diameter(3.7)
                .length(13.8)
                .tank_length_ratio(0.80)
                .engine_length(2.5)
                .engine_mass_fraction(0.40)
                .drag_coeff(0.30)
                .gimbal_max_deg(5.0)
                .gimbal_rate_deg(15.0)
                .gimbal_point(0.5)
                .build(),
        ];
        let payload = Payload { mass: 8_000.0, length: 6.0, diameter: 4.0 };
        let fairing = Fairing { mass: 1_900.0, length: 13.1, diameter: 5.2 };
        Self {
            stages,
            payload,
            fairing,
            fairing_jettison_altitude: 110_000.0,
            propellant_density: 1_030.0,
            rcs_torque: 200_000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration builder: enumerated edits, validated as a unit on build()
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfigBuilder {
    stages: Vec<Stage>,
    payload: Payload,
    fairing: Fairing,
    fairing_jettison_altitude: f64,
    propellant_density: f64,
    rcs_torque: f64,
}

impl VehicleConfigBuilder {
    pub fn from_config(config: &VehicleConfiguration) -> Self {
        Self {
            stages: config.stages.clone(),
            payload: config.payload,
            fairing: config.fairing,
            fairing_jettison_altitude: config.fairing_jettison_altitude,
            propellant_density: config.propellant_density,
            rcs_torque: config.rcs_torque,
        }
    }

    pub fn stages(mut self, v: Vec<Stage>) -> Self { self.stages = v; self }
    pub fn payload(mut self, v: Payload) -> Self { self.payload = v; self }
    pub fn fairing(mut self, v: Fairing) -> Self { self.fairing = v; self }
    pub fn fairing_jettison_altitude(mut self, v: f64) -> Self { self.fairing_jettison_altitude = v; self }
    pub fn propellant_density(mut self, v: f64) -> Self { self.propellant_density = v; self }
    pub fn rcs_torque(mut self, v: f64) -> Self { self.rcs_torque = v; self }
    pub fn payload_mass(mut self, v: f64) -> Self { self.payload.mass = v; self }

    /// Replace one stage; out-of-range indices are reported on build().
    pub fn stage(mut self, idx: usize, stage: Stage) -> Self {
        if idx < self.stages.len() {
            self.stages[idx] = stage;
        } else {
            self.stages.push(stage);
        }
        self
    }

    /// Edit one stage in place through its builder.
    pub fn edit_stage(mut self, idx: usize, edit: impl FnOnce(StageBuilder) -> StageBuilder) -> Self {
        if let Some(slot) = self.stages.get_mut(idx) {
            *slot = edit(StageBuilder::from_stage(slot.clone())).build();
        }
        self
    }

    /// Validate and clamp propellant to tank capacity.
    pub fn build(self) -> Result<VehicleConfiguration, ConfigError> {
        if self.stages.len() < 2 {
            return Err(ConfigError::TooFewStages { found: self.stages.len() });
        }
        if !(self.propellant_density.is_finite() && self.propellant_density > 0.0) {
            return Err(ConfigError::InvalidPropellantDensity(self.propellant_density));
        }
        if !(self.fairing_jettison_altitude.is_finite() && self.fairing_jettison_altitude >= 0.0) {
            return Err(ConfigError::InvalidJettisonAltitude(self.fairing_jettison_altitude));
        }
        for (index, s) in self.stages.iter().enumerate() {
            validate_stage(index, s)?;
        }
        check(self.payload.mass, false, |field, value| ConfigError::InvalidPayload { field, value }, "mass")?;
        check(self.payload.length, true, |field, value| ConfigError::InvalidPayload { field, value }, "length")?;
        check(self.payload.diameter, true, |field, value| ConfigError::InvalidPayload { field, value }, "diameter")?;
        check(self.fairing.mass, false, |field, value| ConfigError::InvalidFairing { field, value }, "mass")?;
        check(self.fairing.length, true, |field, value| ConfigError::InvalidFairing { field, value }, "length")?;
        check(self.fairing.diameter, true, |field, value| ConfigError::InvalidFairing { field, value }, "diameter")?;

        let density = self.propellant_density;
        let stages: Vec<Stage> = self
            .stages
            .into_iter()
            .map(|mut s| {
                s.propellant_mass = s.propellant_mass.min(s.max_propellant(density));
                s
            })
            .collect();

        Ok(VehicleConfiguration {
            stages,
            payload: self.payload,
            fairing: self.fairing,
            fairing_jettison_altitude: self.fairing_jettison_altitude,
            propellant_density: density,
            rcs_torque: self.rcs_torque.max(0.0),
        })
    }
}

impl TryFrom<VehicleConfigBuilder> for VehicleConfiguration {
    type Error = ConfigError;

    fn try_from(builder: VehicleConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

fn check(
    value: f64,
    strictly_positive: bool,
    err: impl Fn(&'static str, f64) -> ConfigError,
    field: &'static str,
) -> Result<(), ConfigError> {
    let ok = value.is_finite() && if strictly_positive { value > 0.0 } else { value >= 0.0 };
    if ok { Ok(()) } else { Err(err(field, value)) }
}

fn validate_stage(index: usize, s: &Stage) -> Result<(), ConfigError> {
    let bad = |field: &'static str, value: f64| ConfigError::InvalidStage { index, field, value };
    let positive = [
        ("diameter", s.diameter),
        ("length", s.length),
        ("isp", s.isp),
        ("isp_vac", s.isp_vac),
    ];
    for (field, value) in positive {
        check(value, true, bad, field)?;
    }
    let non_negative = [
        ("dry_mass", s.dry_mass),
        ("propellant_mass", s.propellant_mass),
        ("thrust", s.thrust),
        ("thrust_vac", s.thrust_vac),
        ("engine_length", s.engine_length),
        ("drag_coeff", s.drag_coeff),
        ("gimbal_max", s.gimbal_max),
        ("gimbal_rate", s.gimbal_rate),
        ("gimbal_point", s.gimbal_point),
    ];
    for (field, value) in non_negative {
        check(value, false, bad, field)?;
    }
    if !(s.tank_length_ratio > 0.0 && s.tank_length_ratio <= 1.0) {
        return Err(bad("tank_length_ratio", s.tank_length_ratio));
    }
    if !(0.0..=1.0).contains(&s.engine_mass_fraction) {
        return Err(bad("engine_mass_fraction", s.engine_mass_fraction));
    }
    if s.engine_length > s.length {
        return Err(bad("engine_length", s.engine_length));
    }
    Ok(())
}
