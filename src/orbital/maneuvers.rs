use crate::dynamics::state::{VehicleState, MU};
use crate::orbital::elements::OrbitElements;
use crate::vehicle::VehicleConfiguration;

/// Circular orbit velocity at radius `r`.
pub fn circular_velocity(r: f64) -> f64 {
    if r <= 0.0 {
        return 0.0;
    }
    (MU / r).sqrt()
}

/// Vis-viva speed at radius `r` on an orbit with semi-major axis `a`.
pub fn vis_viva_speed(r: f64, a: f64) -> f64 {
    if r <= 0.0 || a <= 0.0 {
        return 0.0;
    }
    (MU * (2.0 / r - 1.0 / a)).max(0.0).sqrt()
}

/// Prograde delta-v at apoapsis that circularizes the orbit there.
pub fn circularization_delta_v(orbit: &OrbitElements) -> f64 {
    if orbit.is_escape {
        return 0.0;
    }
    let r_apo = orbit.apoapsis_radius();
    circular_velocity(r_apo) - vis_viva_speed(r_apo, orbit.semi_major_axis)
}

/// Retrograde delta-v at periapsis that lowers apoapsis to `target_radius`.
pub fn apoapsis_trim_delta_v(orbit: &OrbitElements, target_radius: f64) -> f64 {
    if orbit.is_escape {
        return 0.0;
    }
    let r_peri = orbit.periapsis_radius();
    let v_now = vis_viva_speed(r_peri, orbit.semi_major_axis);
    let v_target = vis_viva_speed(r_peri, (r_peri + target_radius) / 2.0);
    (v_now - v_target).max(0.0)
}

/// Delta-v left in the stack (Tsiolkovsky, vacuum Isp).
///
/// Burns the active stage's remaining propellant, then every later stage's
/// full load, each against the mass still attached at that point.
pub fn remaining_delta_v(config: &VehicleConfiguration, state: &VehicleState) -> f64 {
    let fairing = if state.fairing_jettisoned { 0.0 } else { config.fairing.mass };
    let mut total = 0.0;
    for (i, stage) in config.stages.iter().enumerate().skip(state.stage_idx) {
        let upper: f64 = config.stages.iter().skip(i + 1).map(|s| s.wet_mass()).sum();
        let prop = if i == state.stage_idx {
            state.active_propellant().max(0.0)
        } else {
            stage.propellant_mass
        };
        let m_final = config.payload.mass + fairing + upper + stage.dry_mass;
        let m_initial = m_final + prop;
        if m_final > 0.0 && prop > 0.0 {
            total += stage.exhaust_velocity_vac() * (m_initial / m_final).ln();
        }
    }
    total
}

/// Full-throttle vacuum burn time (s) for `delta_v` on the active stage
/// starting from `mass`. Infinite when no stage can burn.
pub fn burn_duration(config: &VehicleConfiguration, state: &VehicleState, mass: f64, delta_v: f64) -> f64 {
    let Some(stage) = config.stages.get(state.stage_idx) else {
        return f64::INFINITY;
    };
    let mdot = stage.mass_flow_vac();
    if mdot <= 0.0 {
        return f64::INFINITY;
    }
    let ve = stage.exhaust_velocity_vac();
    mass / mdot * (1.0 - (-delta_v.max(0.0) / ve).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::PLANET_RADIUS;
    use crate::orbital::elements::predict_orbit;
    use crate::physics::mass_properties;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn leo_circular_speed() {
        let v = circular_velocity(PLANET_RADIUS + 500_000.0);
        assert!(v > 7_500.0 && v < 7_700.0, "500 km circular speed ~7.6 km/s, got {:.0}", v);
        assert_relative_eq!(vis_viva_speed(7.0e6, 7.0e6), circular_velocity(7.0e6), max_relative = 1e-12);
    }

    #[test]
    fn full_stack_delta_v() {
        let c = VehicleConfiguration::default();
        let s = VehicleState::on_pad(&c);
        let dv = remaining_delta_v(&c, &s);
        assert!(dv > 9_000.0 && dv < 12_000.0, "Two-stage delta-v should be orbital, got {:.0}", dv);
    }

    #[test]
    fn delta_v_drops_as_propellant_burns() {
        let c = VehicleConfiguration::default();
        let mut s = VehicleState::on_pad(&c);
        let full = remaining_delta_v(&c, &s);
        s.propellant[0] *= 0.5;
        let half = remaining_delta_v(&c, &s);
        assert!(half < full);
        s.stage_idx = 1;
        s.fairing_jettisoned = true;
        s.propellant[1] = 0.0;
        assert_eq!(remaining_delta_v(&c, &s), 0.0);
    }

    #[test]
    fn burn_duration_consistent_with_rocket_equation() {
        let c = VehicleConfiguration::default();
        let mut s = VehicleState::on_pad(&c);
        s.stage_idx = 1;
        s.fairing_jettisoned = true;
        let m = mass_properties::compute(&c, &s).mass;
        let dv = 500.0;
        let t = burn_duration(&c, &s, m, dv);
        let stage = &c.stages[1];
        let m_end = m - stage.mass_flow_vac() * t;
        assert_relative_eq!(stage.exhaust_velocity_vac() * (m / m_end).ln(), dv, max_relative = 1e-9);
        assert_eq!(burn_duration(&c, &s, m, 0.0), 0.0);
        s.stage_idx = 2;
        assert!(burn_duration(&c, &s, m, dv).is_infinite());
    }

    #[test]
    fn circularization_and_trim() {
        let r = PLANET_RADIUS + 200_000.0;
        let v = circular_velocity(r) * 1.03;
        let o = predict_orbit(&Vector2::new(0.0, r), &Vector2::new(v, 0.0));
        let dv = circularization_delta_v(&o);
        assert!(dv > 0.0 && dv < 300.0, "Circularization dv {:.1}", dv);
        let trim = apoapsis_trim_delta_v(&o, PLANET_RADIUS + 200_000.0);
        assert_relative_eq!(trim, v - circular_velocity(r), max_relative = 1e-6);
    }
}
