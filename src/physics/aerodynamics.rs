use std::f64::consts::PI;

use nalgebra::Vector2;

use crate::dynamics::state::VehicleState;
use crate::physics::atmosphere::Atmo;
use crate::physics::mass_properties::MassProperties;
use crate::vehicle::VehicleConfiguration;

/// Drag coefficient the Mach curve is normalised to.
const REFERENCE_CD: f64 = 0.30;
/// Fineness ratio above which slender-body drag relief applies.
const REFERENCE_FINENESS: f64 = 11.0;
/// Normal force saturates beyond this angle of attack.
const MAX_NORMAL_AOA: f64 = 0.35; // rad

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ---------------------------------------------------------------------------
// Mach-dependent coefficients
// ---------------------------------------------------------------------------

/// Slender-body drag coefficient curve (before fineness scaling).
pub fn drag_coefficient(mach: f64) -> f64 {
    let m = mach.max(0.0);
    if m < 0.6 {
        0.30
    } else if m < 0.8 {
        0.30 + 0.02 * (m - 0.6) / 0.2
    } else if m < 1.0 {
        // Transonic drag rise
        0.32 + 0.18 * smoothstep((m - 0.8) / 0.2)
    } else if m < 1.05 {
        0.50 + 0.02 * smoothstep((m - 1.0) / 0.05)
    } else if m < 1.2 {
        0.52 - 0.04 * smoothstep((m - 1.05) / 0.15)
    } else if m < 2.0 {
        0.48 - 0.10 * (m - 1.2) / 0.8
    } else if m < 5.0 {
        0.38 - 0.11 * (m - 2.0) / 3.0
    } else {
        0.22 + 0.05 * (-(m - 5.0) / 2.0).exp()
    }
}

/// Drag coefficient including slender-body relief `min(1, 11/fineness)`.
pub fn scaled_drag_coefficient(mach: f64, fineness: f64) -> f64 {
    let relief = if fineness > 0.0 { (REFERENCE_FINENESS / fineness).min(1.0) } else { 1.0 };
    drag_coefficient(mach) * relief
}

fn subsonic_cn_alpha(m: f64) -> f64 {
    2.0 / (1.0 - m * m).max(1e-3).sqrt()
}

fn supersonic_cn_alpha(m: f64) -> f64 {
    4.0 / (m * m - 1.0).max(1e-3).sqrt()
}

/// Normal-force coefficient derivative (per rad).
pub fn cn_alpha(mach: f64) -> f64 {
    let m = mach.max(0.0);
    if m < 0.8 {
        subsonic_cn_alpha(m)
    } else if m > 1.2 {
        supersonic_cn_alpha(m)
    } else {
        let lo = subsonic_cn_alpha(0.8);
        let hi = supersonic_cn_alpha(1.2);
        lo + (hi - lo) * (m - 0.8) / 0.4
    }
}

/// Centre of pressure as a fraction of vehicle length from the bottom.
pub fn cp_fraction(mach: f64) -> f64 {
    if mach < 0.8 {
        0.5
    } else if mach > 1.2 {
        0.6
    } else {
        0.5 + 0.1 * (mach - 0.8) / 0.4
    }
}

/// Signed angle from the body axis to the air-relative velocity.
pub fn angle_of_attack(body: &Vector2<f64>, v_air: &Vector2<f64>) -> f64 {
    if v_air.norm() < 1e-9 {
        return 0.0;
    }
    let cross = body.x * v_air.y - body.y * v_air.x;
    cross.atan2(body.dot(v_air))
}

// ---------------------------------------------------------------------------
// Aerodynamic loads
// ---------------------------------------------------------------------------

/// Aerodynamic force and torque on the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroLoads {
    pub axial: Vector2<f64>,     // N, along -body
    pub normal: Vector2<f64>,    // N, perpendicular to body
    /// Torque about the COG, clockwise positive like the attitude angle.
    pub torque: f64,             // N·m
    pub dynamic_pressure: f64,   // Pa
    pub mach: f64,
    pub aoa: f64,                // rad
}

impl AeroLoads {
    pub fn none() -> Self {
        Self {
            axial: Vector2::zeros(),
            normal: Vector2::zeros(),
            torque: 0.0,
            dynamic_pressure: 0.0,
            mach: 0.0,
            aoa: 0.0,
        }
    }

    pub fn total(&self) -> Vector2<f64> {
        self.axial + self.normal
    }
}

/// Axial drag, normal force and CP torque for the current state.
pub fn aero_loads(
    config: &VehicleConfiguration,
    state: &VehicleState,
    mass: &MassProperties,
    atm: &Atmo,
) -> AeroLoads {
    let v_air = state.air_velocity();
    let speed = v_air.norm();
    if speed <= 1e-3 || atm.density <= 0.0 {
        return AeroLoads::none();
    }

    let body = state.body_axis();
    let mach = speed / atm.sound_speed.max(1.0);
    let q = 0.5 * atm.density * speed * speed;
    let area = PI * (mass.diameter / 2.0).powi(2);
    let stage_cd = config
        .stages
        .get(state.stage_idx)
        .or(config.stages.last())
        .map(|s| s.drag_coeff / REFERENCE_CD)
        .unwrap_or(1.0);
    let fineness = config
        .stages
        .first()
        .map(|s| config.total_length() / s.diameter)
        .unwrap_or(0.0);
    let cd = scaled_drag_coefficient(mach, fineness) * stage_cd;

    let aoa = angle_of_attack(&body, &v_air);
    let axial = -body * (q * area * cd * aoa.cos());

    let effective = aoa.sin().asin().clamp(-MAX_NORMAL_AOA, MAX_NORMAL_AOA);
    let magnitude = q * area * cn_alpha(mach) * effective.abs();
    let perp = v_air - body * body.dot(&v_air);
    let (normal, torque) = if perp.norm() > 1e-9 {
        let force = -perp.normalize() * magnitude;
        // Lever from the COG to the CP along the body axis
        let lever = body * (cp_fraction(mach) * mass.length - mass.cog);
        let ccw = lever.x * force.y - lever.y * force.x;
        (force, -ccw)
    } else {
        (Vector2::zeros(), 0.0)
    };

    AeroLoads {
        axial,
        normal,
        torque,
        dynamic_pressure: q,
        mach,
        aoa,
    }
}
