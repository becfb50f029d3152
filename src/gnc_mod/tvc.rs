use crate::dynamics::state::wrap_pi;

// ---------------------------------------------------------------------------
// TVC controller: outer PD attitude loop driving the gimbal
// ---------------------------------------------------------------------------

/// Outer attitude loop between the steering target and the gimbal servo.
///
/// The PD law produces a desired angular acceleration, which is turned
/// into a gimbal angle using the current control authority
/// `thrust * arm / moi`. With no thrust the same demand is met by reaction
/// control, limited to the configured torque.
#[derive(Debug, Clone, PartialEq)]
pub struct TvcController {
    pub kp: f64,
    pub kd: f64,
    pub rate_time_constant: f64,  // s
    pub max_error: f64,           // rad
}

/// Output of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TvcCommand {
    pub angular_accel: f64,  // rad/s^2, desired
    pub gimbal: f64,         // rad, commanded before slewing
    pub rcs_torque: f64,     // N·m
}

impl TvcController {
    pub fn new() -> Self {
        Self {
            kp: 1.5,
            kd: 0.8,
            rate_time_constant: 2.0,
            max_error: 0.1,
        }
    }

    /// Desired angular acceleration toward `target` (all angles in rad).
    pub fn desired_accel(&self, target: f64, angle: f64, angular_velocity: f64) -> f64 {
        let err = wrap_pi(target - angle).clamp(-self.max_error, self.max_error);
        let rate_target = err / self.rate_time_constant;
        self.kp * err + self.kd * (rate_target - angular_velocity)
    }

    /// Gimbal and reaction-control command for the current authority.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        target: f64,
        angle: f64,
        angular_velocity: f64,
        thrust: f64,
        arm: f64,
        moi: f64,
        gimbal_max: f64,
        rcs_limit: f64,
    ) -> TvcCommand {
        let accel = self.desired_accel(target, angle, angular_velocity);
        let moi = moi.max(1.0);
        let authority = thrust * arm / moi;
        let gimbal = if authority > 1e-9 {
            (accel / authority).clamp(-1.0, 1.0).asin().clamp(-gimbal_max, gimbal_max)
        } else {
            0.0
        };
        let rcs_torque = if thrust <= 0.0 {
            (accel * moi).clamp(-rcs_limit, rcs_limit)
        } else {
            0.0
        };
        TvcCommand { angular_accel: accel, gimbal, rcs_torque }
    }
}

impl Default for TvcController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn error_is_clamped_and_wrapped() {
        let c = TvcController::new();
        let big = c.desired_accel(3.0, 0.0, 0.0);
        let small = c.desired_accel(0.1, 0.0, 0.0);
        assert_relative_eq!(big, small, epsilon = 1e-12);
        // Shortest way round: 350 deg is -10 deg away
        assert!(c.desired_accel(350.0_f64.to_radians(), 0.0, 0.0) < 0.0);
    }

    #[test]
    fn rate_damping() {
        let c = TvcController::new();
        assert!(c.desired_accel(0.0, 0.0, 0.5) < 0.0, "Positive rate should be damped");
    }

    #[test]
    fn gimbal_clamped_to_limit() {
        let c = TvcController::new();
        let max = 5.0_f64.to_radians();
        let cmd = c.update(0.5, 0.0, 0.0, 1.0e3, 1.0, 1.0e8, max, 0.0);
        assert_relative_eq!(cmd.gimbal, max, epsilon = 1e-12);
        let cmd = c.update(-0.5, 0.0, 0.0, 1.0e3, 1.0, 1.0e8, max, 0.0);
        assert_relative_eq!(cmd.gimbal, -max, epsilon = 1e-12);
    }

    #[test]
    fn gimbal_inverts_authority() {
        let c = TvcController::new();
        let (thrust, arm, moi) = (8.0e6, 20.0, 5.0e8);
        let cmd = c.update(0.01, 0.0, 0.0, thrust, arm, moi, 0.1, 0.0);
        let achieved = thrust * cmd.gimbal.sin() * arm / moi;
        assert_relative_eq!(achieved, cmd.angular_accel, max_relative = 1e-9);
        assert_eq!(cmd.rcs_torque, 0.0);
    }

    #[test]
    fn coasting_uses_rcs() {
        let c = TvcController::new();
        let cmd = c.update(1.0, 0.0, 0.0, 0.0, 10.0, 1.0e7, 0.1, 2.0e5);
        assert_eq!(cmd.gimbal, 0.0);
        assert_relative_eq!(cmd.rcs_torque, 2.0e5, epsilon = 1e-9);
    }
}
