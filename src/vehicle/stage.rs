use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::dynamics::state::G0;

// ---------------------------------------------------------------------------
// Stage definition (one stage of the two-stage stack)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub dry_mass: f64,                  // kg
    pub propellant_mass: f64,           // kg, loaded at launch
    pub thrust: f64,                    // N, sea level
    pub thrust_vac: f64,                // N, vacuum
    pub isp: f64,                       // s, sea level
    pub isp_vac: f64,                   // s, vacuum
    pub diameter: f64,                  // m
    pub length: f64,                    // m
    pub tank_length_ratio: f64,         // (0, 1], share of length holding propellant
    pub engine_length: f64,             // m, engine section at the stage bottom
    pub engine_mass_fraction: f64,      // [0, 1], share of dry mass in the engine section
    pub drag_coeff: f64,
    pub gimbal_max: f64,                // rad
    pub gimbal_rate: f64,               // rad/s
    pub gimbal_point: f64,              // m, pivot height above the stage bottom
}

impl Stage {
    pub fn wet_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }

    pub fn tank_area(&self) -> f64 {
        PI * (self.diameter / 2.0).powi(2)
    }

    pub fn tank_height(&self) -> f64 {
        self.length * self.tank_length_ratio
    }

    /// Cylindrical tank capacity (kg) at the given propellant density.
    pub fn max_propellant(&self, density: f64) -> f64 {
        self.tank_area() * self.tank_height() * density
    }

    pub fn engine_mass(&self) -> f64 {
        self.dry_mass * self.engine_mass_fraction
    }

    pub fn structure_mass(&self) -> f64 {
        self.dry_mass * (1.0 - self.engine_mass_fraction)
    }

    /// Vacuum exhaust velocity, m/s.
    pub fn exhaust_velocity_vac(&self) -> f64 {
        self.isp_vac * G0
    }

    /// Full-throttle vacuum mass flow, kg/s.
    pub fn mass_flow_vac(&self) -> f64 {
        if self.isp_vac > 0.0 {
            self.thrust_vac / self.exhaust_velocity_vac()
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stage: Stage {
                name: name.into(),
                dry_mass: 4_000.0,
                propellant_mass: 90_000.0,
                thrust: 800_000.0,
                thrust_vac: 980_000.0,
                isp: 300.0,
                isp_vac: 345.0,
                diameter: 3.7,
                length: 14.0,
                tank_length_ratio: 0.8,
                engine_length: 2.5,
                engine_mass_fraction: 0.4,
                drag_coeff: 0.30,
                gimbal_max: 5.0_f64.to_radians(),
                gimbal_rate: 15.0_f64.to_radians(),
                gimbal_point: 0.5,
            },
        }
    }

    /// Start from an existing stage.
    pub fn from_stage(stage: Stage) -> Self {
        Self { stage }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.stage.dry_mass = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.stage.propellant_mass = v; self }
    pub fn thrust(mut self, sea_level: f64, vacuum: f64) -> Self {
        self.stage.thrust = sea_level;
        self.stage.thrust_vac = vacuum;
        self
    }
    pub fn isp(mut self, sea_level: f64, vacuum: f64) -> Self {
        self.stage.isp = sea_level;
        self.stage.isp_vac = vacuum;
        self
    }
    pub fn diameter(mut self, v: f64) -> Self { self.stage.diameter = v; self }
    pub fn length(mut self, v: f64) -> Self { self.stage.length = v; self }
    pub fn tank_length_ratio(mut self, v: f64) -> Self { self.stage.tank_length_ratio = v; self }
    pub fn engine_length(mut self, v: f64) -> Self { self.stage.engine_length = v; self }
    pub fn engine_mass_fraction(mut self, v: f64) -> Self { self.stage.engine_mass_fraction = v; self }
    pub fn drag_coeff(mut self, v: f64) -> Self { self.stage.drag_coeff = v; self }
    pub fn gimbal_max_deg(mut self, v: f64) -> Self { self.stage.gimbal_max = v.to_radians(); self }
    pub fn gimbal_rate_deg(mut self, v: f64) -> Self { self.stage.gimbal_rate = v.to_radians(); self }
    pub fn gimbal_point(mut self, v: f64) -> Self { self.stage.gimbal_point = v; self }

    /// Stage values are checked when the owning configuration is built.
    pub fn build(self) -> Stage {
        self.stage
    }
}
