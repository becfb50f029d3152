use crate::dynamics::state::G0;

// ---------------------------------------------------------------------------
// US Standard Atmosphere 1976 (0-86 km, exponential above)
// ---------------------------------------------------------------------------

const R_STAR: f64 = 8.31432;          // universal gas constant, J/(mol·K)
const M0: f64 = 0.028_964_4;          // mean molar mass of air, kg/mol
const GAMMA: f64 = 1.4;               // ratio of specific heats
const R_GEOPOTENTIAL: f64 = 6_356_766.0; // m

const MU_REF: f64 = 1.716e-5;         // Pa·s
const T_REF: f64 = 273.15;            // K
const SUTHERLAND: f64 = 110.4;        // K

/// Geopotential ceiling of the tabulated layers (86 km geometric).
pub const MODEL_CEILING: f64 = 84_852.0;

/// One layer: base geopotential altitude (m), base temperature (K),
/// lapse rate (K/m), base pressure (Pa).
struct Layer {
    base: f64,
    temperature: f64,
    lapse: f64,
    pressure: f64,
}

const LAYERS: [Layer; 7] = [
    Layer { base: 0.0, temperature: 288.15, lapse: -0.0065, pressure: 101_325.0 },
    Layer { base: 11_000.0, temperature: 216.65, lapse: 0.0, pressure: 22_632.06 },
    Layer { base: 20_000.0, temperature: 216.65, lapse: 0.001, pressure: 5_474.889 },
    Layer { base: 32_000.0, temperature: 228.65, lapse: 0.0028, pressure: 868.0187 },
    Layer { base: 47_000.0, temperature: 270.65, lapse: 0.0, pressure: 110.9063 },
    Layer { base: 51_000.0, temperature: 270.65, lapse: -0.0028, pressure: 66.938_87 },
    Layer { base: 71_000.0, temperature: 214.65, lapse: -0.002, pressure: 3.956_420 },
];

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmo {
    pub temperature: f64,  // K
    pub pressure: f64,     // Pa
    pub density: f64,      // kg/m^3
    pub sound_speed: f64,  // m/s
    pub viscosity: f64,    // Pa·s
    pub layer: usize,
    /// True above the tabulated ceiling, where values are extrapolated.
    pub extrapolated: bool,
}

/// Geometric altitude (m) to geopotential altitude (m).
pub fn geopotential(altitude: f64) -> f64 {
    let z = altitude.max(0.0);
    R_GEOPOTENTIAL * z / (R_GEOPOTENTIAL + z)
}

/// US1976 standard atmosphere.
///
/// Negative altitudes clamp to sea level. Above the 86 km ceiling pressure
/// decays exponentially from the top-layer state with the local scale
/// height, and the sample is flagged as extrapolated.
pub fn isa(altitude_m: f64) -> Atmo {
    let h = geopotential(altitude_m);
    let top = LAYERS.len() - 1;

    let (temperature, pressure, layer, extrapolated) = if h >= MODEL_CEILING {
        let (t, p_top) = layer_state(&LAYERS[top], MODEL_CEILING);
        let scale_height = R_STAR * t / (M0 * G0);
        let p = p_top * (-(h - MODEL_CEILING) / scale_height).exp();
        (t, p, top, true)
    } else {
        let idx = LAYERS.iter().rposition(|l| h >= l.base).unwrap_or(0);
        let (t, p) = layer_state(&LAYERS[idx], h);
        (t, p, idx, false)
    };

    let density = if temperature > 0.0 {
        pressure * M0 / (R_STAR * temperature)
    } else {
        0.0
    };

    Atmo {
        temperature,
        pressure,
        density,
        sound_speed: (GAMMA * R_STAR * temperature / M0).sqrt(),
        viscosity: sutherland(temperature),
        layer,
        extrapolated,
    }
}

// ---------------------------------------------------------------------------
// Layer helpers
// ---------------------------------------------------------------------------

/// Temperature and pressure at geopotential `h` inside `layer`.
fn layer_state(layer: &Layer, h: f64) -> (f64, f64) {
    let t = layer.temperature + layer.lapse * (h - layer.base);
    let p = if layer.lapse.abs() < 1e-10 {
        // Isothermal
        layer.pressure * (-G0 * M0 * (h - layer.base) / (R_STAR * layer.temperature)).exp()
    } else {
        layer.pressure * (layer.temperature / t).powf(G0 * M0 / (R_STAR * layer.lapse))
    };
    (t, p)
}

fn sutherland(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    MU_REF * (t / T_REF).powf(1.5) * (T_REF + SUTHERLAND) / (t + SUTHERLAND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Geometric altitude whose geopotential is `h`.
    fn geometric(h: f64) -> f64 {
        R_GEOPOTENTIAL * h / (R_GEOPOTENTIAL - h)
    }

    #[test]
    fn sea_level() {
        let a = isa(0.0);
        assert_relative_eq!(a.temperature, 288.15, epsilon = 1e-9);
        assert_relative_eq!(a.pressure, 101_325.0, epsilon = 1e-6);
        assert_relative_eq!(a.density, 1.225, epsilon = 1e-3);
        assert_relative_eq!(a.sound_speed, 340.29, epsilon = 0.05);
        assert_relative_eq!(a.viscosity, 1.789e-5, epsilon = 1e-8);
        assert_eq!(a.layer, 0);
        assert!(!a.extrapolated);
    }

    #[test]
    fn negative_altitude_clamps_to_sea_level() {
        assert_eq!(isa(-500.0), isa(0.0));
    }

    #[test]
    fn continuous_at_layer_boundaries() {
        for layer in LAYERS.iter().skip(1) {
            let z = geometric(layer.base);
            let below = isa(z - 1e-3);
            let above = isa(z + 1e-3);
            assert!(
                (below.temperature - above.temperature).abs() < 1e-4,
                "Temperature jump at {} m: {} vs {}",
                layer.base,
                below.temperature,
                above.temperature
            );
            assert_relative_eq!(below.pressure, above.pressure, max_relative = 1e-3);
        }
    }

    #[test]
    fn continuous_at_ceiling() {
        let z = geometric(MODEL_CEILING);
        let below = isa(z - 1e-3);
        let above = isa(z + 1e-3);
        assert!(!below.extrapolated);
        assert!(above.extrapolated);
        assert_relative_eq!(below.pressure, above.pressure, max_relative = 1e-4);
        assert_relative_eq!(below.temperature, above.temperature, max_relative = 1e-6);
    }

    #[test]
    fn extrapolation_keeps_decaying() {
        let a = isa(150_000.0);
        let b = isa(300_000.0);
        assert!(a.extrapolated && b.extrapolated);
        assert!(b.density < a.density && b.density > 0.0);
    }

    #[test]
    fn tropopause_reference() {
        let a = isa(geometric(11_000.0));
        assert_relative_eq!(a.temperature, 216.65, epsilon = 1e-6);
        assert_relative_eq!(a.pressure, 22_632.06, max_relative = 1e-4);
    }
}
