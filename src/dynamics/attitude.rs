use std::f64::consts::TAU;

use crate::dynamics::state::VehicleState;

// ---------------------------------------------------------------------------
// Gimbal actuator and rotational integration
// ---------------------------------------------------------------------------

/// Rate-limited servo: clamp the command to `max_angle`, then move the
/// actual angle toward it by at most `max_rate * dt`.
pub fn slew_gimbal(actual: f64, commanded: f64, max_angle: f64, max_rate: f64, dt: f64) -> f64 {
    let target = commanded.clamp(-max_angle, max_angle);
    let step = max_rate * dt;
    actual + (target - actual).clamp(-step, step)
}

/// Pitch torque from a deflected engine (clockwise positive).
///
/// `arm` is the COG height above the gimbal pivot.
pub fn gimbal_torque(thrust: f64, gimbal: f64, arm: f64) -> f64 {
    thrust * gimbal.sin() * arm
}

/// Torques acting on the vehicle during one sub-step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TorqueInputs {
    pub gimbal: f64,  // N·m
    pub aero: f64,    // N·m, zero when aerodynamic torque is disabled
    pub rcs: f64,     // N·m
}

impl TorqueInputs {
    pub fn total(&self) -> f64 {
        self.gimbal + self.aero + self.rcs
    }
}

/// Advance angular velocity then angle by one sub-step.
///
/// The angle is kept in (-2pi, 2pi); the wrap has no effect on dynamics.
pub fn integrate_rotation(state: &mut VehicleState, torques: &TorqueInputs, moi: f64, dt: f64) {
    let moi = moi.max(1.0);
    let alpha = torques.gimbal / moi + (torques.aero + torques.rcs) / moi;
    state.angular_velocity += alpha * dt;
    state.angle = (state.angle + state.angular_velocity * dt) % TAU;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::VehicleConfiguration;
    use approx::assert_relative_eq;

    #[test]
    fn slew_is_rate_limited() {
        let max = 5.0_f64.to_radians();
        let rate = 15.0_f64.to_radians();
        let g = slew_gimbal(0.0, max, max, rate, 0.05);
        assert_relative_eq!(g, rate * 0.05, epsilon = 1e-12);
        // Reaches but never exceeds the clamped command
        let mut g = 0.0;
        for _ in 0..100 {
            g = slew_gimbal(g, 1.0, max, rate, 0.05);
        }
        assert_relative_eq!(g, max, epsilon = 1e-12);
    }

    #[test]
    fn torque_sign() {
        assert!(gimbal_torque(1.0e6, 0.05, 20.0) > 0.0);
        assert!(gimbal_torque(1.0e6, -0.05, 20.0) < 0.0);
        assert_eq!(gimbal_torque(0.0, 0.05, 20.0), 0.0);
    }

    #[test]
    fn rotation_integrates_rate_then_angle() {
        let c = VehicleConfiguration::default();
        let mut s = VehicleState::on_pad(&c);
        let t = TorqueInputs { gimbal: 100.0, aero: 0.0, rcs: 0.0 };
        integrate_rotation(&mut s, &t, 50.0, 0.1);
        assert_relative_eq!(s.angular_velocity, 0.2, epsilon = 1e-12);
        assert_relative_eq!(s.angle, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn angle_stays_wrapped() {
        let c = VehicleConfiguration::default();
        let mut s = VehicleState::on_pad(&c);
        s.angular_velocity = 3.0;
        for _ in 0..1000 {
            integrate_rotation(&mut s, &TorqueInputs::default(), 1.0e6, 0.1);
            assert!(s.angle.abs() < TAU);
        }
    }
}
