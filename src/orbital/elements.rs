use std::f64::consts::PI;

use nalgebra::Vector2;

use crate::dynamics::state::{MU, PLANET_RADIUS};

/// Two-body orbit predicted from an instantaneous planar state.
///
/// Apsides are altitudes above the planet surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitElements {
    pub apoapsis: f64,          // m, infinite when escaping
    pub periapsis: f64,         // m
    pub semi_major_axis: f64,   // m, infinite when escaping
    pub eccentricity: f64,
    pub specific_energy: f64,   // J/kg
    pub angular_momentum: f64,  // m^2/s, counter-clockwise positive
    pub is_escape: bool,
}

/// Time to the next apsides on a closed orbit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApsisTiming {
    pub to_apoapsis: f64,      // s
    pub to_periapsis: f64,     // s
    pub since_periapsis: f64,  // s
}

/// Vis-viva orbit prediction.
pub fn predict_orbit(pos: &Vector2<f64>, vel: &Vector2<f64>) -> OrbitElements {
    let r = pos.norm().max(1.0);
    let energy = 0.5 * vel.norm_squared() - MU / r;
    let h = pos.x * vel.y - pos.y * vel.x;

    if energy >= 0.0 {
        return OrbitElements {
            apoapsis: f64::INFINITY,
            periapsis: r - PLANET_RADIUS,
            semi_major_axis: f64::INFINITY,
            eccentricity: 1.0,
            specific_energy: energy,
            angular_momentum: h,
            is_escape: true,
        };
    }

    let a = -MU / (2.0 * energy);
    let e = (1.0 + 2.0 * energy * h * h / (MU * MU)).max(0.0).sqrt();
    OrbitElements {
        apoapsis: a * (1.0 + e) - PLANET_RADIUS,
        periapsis: a * (1.0 - e) - PLANET_RADIUS,
        semi_major_axis: a,
        eccentricity: e,
        specific_energy: energy,
        angular_momentum: h,
        is_escape: false,
    }
}

impl OrbitElements {
    pub fn apoapsis_radius(&self) -> f64 {
        self.apoapsis + PLANET_RADIUS
    }

    pub fn periapsis_radius(&self) -> f64 {
        self.periapsis + PLANET_RADIUS
    }

    /// Orbital period (s); infinite when escaping.
    pub fn period(&self) -> f64 {
        if self.is_escape {
            return f64::INFINITY;
        }
        2.0 * PI * (self.semi_major_axis.powi(3) / MU).sqrt()
    }

    /// Kepler timing from the current radius and radial speed.
    ///
    /// Zero for escape and near-circular orbits, where the apsides are
    /// undefined.
    pub fn apsis_timing(&self, r: f64, radial_speed: f64) -> ApsisTiming {
        if self.is_escape || self.eccentricity < 1e-6 {
            return ApsisTiming::default();
        }
        let (a, e) = (self.semi_major_axis, self.eccentricity);
        let cos_e = ((1.0 - r / a) / e).clamp(-1.0, 1.0);
        let mut ecc_anomaly = cos_e.acos();
        if radial_speed < 0.0 {
            ecc_anomaly = 2.0 * PI - ecc_anomaly;
        }
        let mean_anomaly = ecc_anomaly - e * ecc_anomaly.sin();
        let n = (MU / a.powi(3)).sqrt();
        let to_apoapsis = if mean_anomaly <= PI {
            (PI - mean_anomaly) / n
        } else {
            (3.0 * PI - mean_anomaly) / n
        };
        ApsisTiming {
            to_apoapsis,
            to_periapsis: (2.0 * PI - mean_anomaly) / n,
            since_periapsis: mean_anomaly / n,
        }
    }
}
