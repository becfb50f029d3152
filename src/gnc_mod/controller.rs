use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::dynamics::state::{angle_of, wrap_pi, VehicleState};
use crate::vehicle::VehicleConfiguration;

/// Attitude target and throttle for one sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringCommand {
    pub target_angle: f64,  // rad, inertial, clockwise from +y
    pub throttle: f64,      // [0, 1]
}

/// Trait for steering sources.
///
/// Implement this to plug a new pointing law into the simulation loop;
/// the outer attitude loop turns the target angle into gimbal and
/// reaction-control commands.
pub trait Controller {
    /// Compute the steering command from the current state.
    fn control(&mut self, vehicle: &VehicleConfiguration, state: &VehicleState, dt: f64) -> SteeringCommand;

    /// Reset internal state (phase, rate limiter memory).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}

// ---------------------------------------------------------------------------
// Manual burn modes
// ---------------------------------------------------------------------------

/// Attitude error below which a burn mode fires the engine.
pub const BURN_POINTING_TOLERANCE: f64 = 10.0; // deg

/// Operator-selected pointing mode, overriding guidance while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BurnMode {
    #[default]
    None,
    Prograde,
    Retrograde,
    /// Velocity rotated 90 degrees away from the planet.
    Normal,
    AntiNormal,
    Radial,
    AntiRadial,
}

impl BurnMode {
    pub fn is_active(self) -> bool {
        self != BurnMode::None
    }

    /// Pointing direction for this mode, `None` when inactive or when the
    /// direction is undefined (zero velocity).
    pub fn direction(self, state: &VehicleState) -> Option<Vector2<f64>> {
        let up = state.up();
        let speed = state.vel.norm();
        let prograde = if speed > 1e-9 { Some(state.vel / speed) } else { None };
        // In-plane perpendicular to velocity, on the side away from the planet
        let normal = prograde.map(|p| {
            let n = Vector2::new(-p.y, p.x);
            if n.dot(&up) >= 0.0 { n } else { -n }
        });
        match self {
            BurnMode::None => None,
            BurnMode::Prograde => prograde,
            BurnMode::Retrograde => prograde.map(|p| -p),
            BurnMode::Normal => normal,
            BurnMode::AntiNormal => normal.map(|n| -n),
            BurnMode::Radial => Some(up),
            BurnMode::AntiRadial => Some(-up),
        }
    }
}

impl Controller for BurnMode {
    fn control(&mut self, _vehicle: &VehicleConfiguration, state: &VehicleState, _dt: f64) -> SteeringCommand {
        let Some(dir) = self.direction(state) else {
            return SteeringCommand { target_angle: state.angle, throttle: 0.0 };
        };
        let target_angle = angle_of(&dir);
        let error = wrap_pi(target_angle - state.angle).abs().to_degrees();
        let throttle = if error < BURN_POINTING_TOLERANCE { 1.0 } else { 0.0 };
        SteeringCommand { target_angle, throttle }
    }

    fn name(&self) -> &str {
        match self {
            BurnMode::None => "none",
            BurnMode::Prograde => "prograde",
            BurnMode::Retrograde => "retrograde",
            BurnMode::Normal => "normal",
            BurnMode::AntiNormal => "anti-normal",
            BurnMode::Radial => "radial",
            BurnMode::AntiRadial => "anti-radial",
        }
    }
}

/// Holds the current attitude with the engine idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttitudeHold;

impl Controller for AttitudeHold {
    fn control(&mut self, _vehicle: &VehicleConfiguration, state: &VehicleState, _dt: f64) -> SteeringCommand {
        SteeringCommand { target_angle: state.angle, throttle: 0.0 }
    }

    fn name(&self) -> &str {
        "attitude hold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn orbit() -> (VehicleConfiguration, VehicleState) {
        let c = VehicleConfiguration::default();
        let s = VehicleState::in_orbit(&c, 500_000.0);
        (c, s)
    }

    #[test]
    fn prograde_aligned_fires() {
        let (c, s) = orbit();
        // in_orbit points along velocity
        let cmd = BurnMode::Prograde.control(&c, &s, 0.01);
        assert_relative_eq!(cmd.target_angle, s.angle, epsilon = 1e-9);
        assert_eq!(cmd.throttle, 1.0);
    }

    #[test]
    fn retrograde_waits_for_turn() {
        let (c, s) = orbit();
        let cmd = BurnMode::Retrograde.control(&c, &s, 0.01);
        assert_eq!(cmd.throttle, 0.0, "Engine must stay off until pointed");
        let dir = Vector2::new(cmd.target_angle.sin(), cmd.target_angle.cos());
        assert_relative_eq!(dir.dot(&s.vel.normalize()), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn normal_points_away_from_planet() {
        let (_, s) = orbit();
        let n = BurnMode::Normal.direction(&s).unwrap();
        let an = BurnMode::AntiNormal.direction(&s).unwrap();
        assert!(n.dot(&s.up()) > 0.99);
        assert_relative_eq!(n.dot(&s.vel), 0.0, epsilon = 1e-6);
        assert_relative_eq!((n + an).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn radial_modes_follow_local_vertical() {
        let (_, s) = orbit();
        assert_eq!(BurnMode::Radial.direction(&s), Some(s.up()));
        assert_eq!(BurnMode::AntiRadial.direction(&s), Some(-s.up()));
        assert_eq!(BurnMode::None.direction(&s), None);
        assert!(!BurnMode::None.is_active());
    }

    #[test]
    fn hold_keeps_attitude_idle() {
        let (c, s) = orbit();
        let cmd = AttitudeHold.control(&c, &s, 0.01);
        assert_eq!(cmd.target_angle, s.angle);
        assert_eq!(cmd.throttle, 0.0);
    }
}
