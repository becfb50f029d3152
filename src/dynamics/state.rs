use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleConfiguration;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G: f64 = 6.674e-11;                   // m^3/(kg·s^2)
pub const PLANET_MASS: f64 = 5.972e24;          // kg
pub const MU: f64 = G * PLANET_MASS;            // m^3/s^2
pub const PLANET_RADIUS: f64 = 6_371_000.0;     // m
pub const PLANET_ROTATION: f64 = 7.292_115_9e-5; // rad/s, clockwise in the sim plane
pub const G0: f64 = 9.80665;                    // m/s^2
pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0;  // Pa
pub const KARMAN_LINE: f64 = 100_000.0;         // m

// ---------------------------------------------------------------------------
// Vehicle state: planar position/velocity, attitude, propellant, staging
// ---------------------------------------------------------------------------

/// Mutable vehicle state, exclusively owned by the simulation.
///
/// Positions are planet-centred inertial with the launch site on +y.
/// `angle` is measured clockwise from the launch-site vertical, so the
/// body axis is `(sin angle, cos angle)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub time: f64,
    pub pos: Vector2<f64>,              // m
    pub vel: Vector2<f64>,              // m/s, inertial
    pub stage_idx: usize,
    pub propellant: Vec<f64>,           // kg remaining per stage
    pub fairing_jettisoned: bool,
    pub angle: f64,                     // rad
    pub angular_velocity: f64,          // rad/s, clockwise positive
    pub gimbal: f64,                    // rad, actual
    pub gimbal_cmd: f64,                // rad, commanded
    pub engine_on: bool,
    pub time_warp: f64,
    pub dynamic_pressure: f64,          // Pa, last sub-step
    pub max_q: f64,                     // Pa, peak so far
}

impl VehicleState {
    /// Vehicle sitting on the launch pad, co-rotating with the planet.
    pub fn on_pad(config: &VehicleConfiguration) -> Self {
        Self {
            time: 0.0,
            pos: Vector2::new(0.0, PLANET_RADIUS),
            vel: Vector2::new(PLANET_ROTATION * PLANET_RADIUS, 0.0),
            stage_idx: 0,
            propellant: config.stages.iter().map(|s| s.propellant_mass).collect(),
            fairing_jettisoned: false,
            angle: 0.0,
            angular_velocity: 0.0,
            gimbal: 0.0,
            gimbal_cmd: 0.0,
            engine_on: true,
            time_warp: 1.0,
            dynamic_pressure: 0.0,
            max_q: 0.0,
        }
    }

    /// Circular prograde orbit at `altitude` on the final stage, with all
    /// lower stages and the fairing already gone.
    pub fn in_orbit(config: &VehicleConfiguration, altitude: f64) -> Self {
        let r = PLANET_RADIUS + altitude.max(0.0);
        let last = config.stages.len().saturating_sub(1);
        let mut state = Self::on_pad(config);
        state.pos = Vector2::new(0.0, r);
        state.vel = Vector2::new((MU / r).sqrt(), 0.0);
        state.stage_idx = last;
        for p in state.propellant.iter_mut().take(last) {
            *p = 0.0;
        }
        state.fairing_jettisoned = true;
        state.angle = std::f64::consts::FRAC_PI_2;
        state
    }

    pub fn radius(&self) -> f64 {
        self.pos.norm()
    }

    pub fn altitude(&self) -> f64 {
        self.radius() - PLANET_RADIUS
    }

    /// Local vertical unit vector.
    pub fn up(&self) -> Vector2<f64> {
        let r = self.radius();
        if r > 1e-9 {
            self.pos / r
        } else {
            Vector2::y()
        }
    }

    /// Local horizontal unit vector in the direction of planet rotation.
    pub fn east(&self) -> Vector2<f64> {
        let up = self.up();
        Vector2::new(up.y, -up.x)
    }

    /// Body (thrust) axis in the inertial frame.
    pub fn body_axis(&self) -> Vector2<f64> {
        Vector2::new(self.angle.sin(), self.angle.cos())
    }

    pub fn radial_speed(&self) -> f64 {
        self.vel.dot(&self.up())
    }

    pub fn horizontal_speed(&self) -> f64 {
        self.vel.dot(&self.east())
    }

    /// Velocity relative to the co-rotating atmosphere.
    pub fn air_velocity(&self) -> Vector2<f64> {
        self.vel - PLANET_ROTATION * Vector2::new(self.pos.y, -self.pos.x)
    }

    /// Propellant left in the active stage (0 once all stages are spent).
    pub fn active_propellant(&self) -> f64 {
        self.propellant.get(self.stage_idx).copied().unwrap_or(0.0)
    }
}

/// Flight-path angle (deg) of `vel` above the local horizontal at `state`.
pub fn flight_path_angle(state: &VehicleState, vel: &Vector2<f64>) -> f64 {
    vel.dot(&state.up()).atan2(vel.dot(&state.east())).to_degrees()
}

/// Inertial attitude angle that points along `dir`.
pub fn angle_of(dir: &Vector2<f64>) -> f64 {
    dir.x.atan2(dir.y)
}

/// Wrap an angle into (-pi, pi].
pub fn wrap_pi(a: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let mut a = a % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}
