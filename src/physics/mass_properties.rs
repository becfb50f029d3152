use crate::dynamics::state::VehicleState;
use crate::vehicle::{Stage, VehicleConfiguration};

// ---------------------------------------------------------------------------
// Mass properties of the surviving stack
// ---------------------------------------------------------------------------

/// Whole-vehicle mass properties, heights measured from the vehicle bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass: f64,       // kg
    pub cog: f64,        // m
    pub moi: f64,        // kg·m^2, pitch axis through the COG
    pub length: f64,     // m, surviving stack
    pub diameter: f64,   // m, widest surviving segment
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Cylinder,
    Cone,
}

/// One stacked component.
#[derive(Debug, Clone, Copy)]
struct Segment {
    mass: f64,
    cog: f64,       // absolute height of the segment COG
    length: f64,
    radius: f64,
    shape: Shape,
}

impl Segment {
    /// Inertia about the segment's own COG.
    fn local_moi(&self) -> f64 {
        let m = self.mass;
        let (l, r) = (self.length, self.radius);
        match self.shape {
            Shape::Cylinder => m * l * l / 12.0 + m * r * r / 4.0,
            Shape::Cone => 0.3 * m * r * r + 0.1 * m * l * l,
        }
    }
}

/// Propellant column height in `stage` holding `propellant` kg.
pub fn fill_height(stage: &Stage, propellant: f64, density: f64) -> f64 {
    let area = stage.tank_area();
    if area <= 0.0 || density <= 0.0 {
        return 0.0;
    }
    (propellant.max(0.0) / density / area).min(stage.tank_height())
}

/// Stage mass and COG height above the stage bottom.
pub fn stage_mass_and_cog(stage: &Stage, propellant: f64, density: f64) -> (f64, f64) {
    let propellant = propellant.max(0.0);
    let fill = fill_height(stage, propellant, density);
    let engine = stage.engine_mass();
    let structure = stage.structure_mass();
    let mass = engine + structure + propellant;
    if mass <= 0.0 {
        return (0.0, stage.length / 2.0);
    }
    let moment = engine * stage.engine_length / 2.0
        + structure * stage.length / 2.0
        + propellant * (stage.engine_length + fill / 2.0);
    (mass, moment / mass)
}

fn segments(config: &VehicleConfiguration, state: &VehicleState) -> Vec<Segment> {
    let mut out = Vec::with_capacity(config.stages.len() + 2);
    let mut base = 0.0;
    for (i, stage) in config.stages.iter().enumerate().skip(state.stage_idx) {
        let prop = state.propellant.get(i).copied().unwrap_or(0.0);
        let (mass, cog) = stage_mass_and_cog(stage, prop, config.propellant_density);
        out.push(Segment {
            mass,
            cog: base + cog,
            length: stage.length,
            radius: stage.diameter / 2.0,
            shape: Shape::Cylinder,
        });
        base += stage.length;
    }
    let p = &config.payload;
    out.push(Segment {
        mass: p.mass,
        cog: base + p.length / 2.0,
        length: p.length,
        radius: p.diameter / 2.0,
        shape: Shape::Cylinder,
    });
    if !state.fairing_jettisoned {
        let f = &config.fairing;
        out.push(Segment {
            mass: f.mass,
            cog: base + f.length / 3.0,
            length: f.length,
            radius: f.diameter / 2.0,
            shape: Shape::Cone,
        });
    }
    out
}

/// Length of the surviving stack.
pub fn vehicle_length(config: &VehicleConfiguration, state: &VehicleState) -> f64 {
    let stages: f64 = config.stages.iter().skip(state.stage_idx).map(|s| s.length).sum();
    let top = if state.fairing_jettisoned {
        config.payload.length
    } else {
        config.payload.length.max(config.fairing.length)
    };
    stages + top
}

/// Widest surviving diameter.
pub fn max_diameter(config: &VehicleConfiguration, state: &VehicleState) -> f64 {
    let mut d = config
        .stages
        .iter()
        .skip(state.stage_idx)
        .map(|s| s.diameter)
        .fold(config.payload.diameter, f64::max);
    if !state.fairing_jettisoned {
        d = d.max(config.fairing.diameter);
    }
    d
}

/// Mass, COG and pitch moment of inertia of everything not yet jettisoned.
pub fn compute(config: &VehicleConfiguration, state: &VehicleState) -> MassProperties {
    let segs = segments(config, state);
    let mass: f64 = segs.iter().map(|s| s.mass).sum();
    let length = vehicle_length(config, state);
    let cog = if mass > 0.0 {
        segs.iter().map(|s| s.mass * s.cog).sum::<f64>() / mass
    } else {
        length / 2.0
    };
    let moi: f64 = segs
        .iter()
        .map(|s| s.local_moi() + s.mass * (s.cog - cog).powi(2))
        .sum();
    MassProperties {
        mass,
        cog,
        moi: moi.max(1.0),
        length,
        diameter: max_diameter(config, state),
    }
}
