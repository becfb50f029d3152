use crate::dynamics::state::{VehicleState, G0, SEA_LEVEL_PRESSURE};
use crate::physics::atmosphere;
use crate::vehicle::VehicleConfiguration;

/// Engine output for the active stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineOutput {
    pub thrust: f64,     // N
    pub isp: f64,        // s
    pub mass_flow: f64,  // kg/s
}

/// Thrust, Isp and mass flow at ambient `pressure` and `throttle`.
///
/// Sea-level and vacuum figures are blended by the pressure ratio. Output is
/// zero with the engine off, past the last stage, or with empty tanks.
pub fn engine_output(
    config: &VehicleConfiguration,
    state: &VehicleState,
    pressure: f64,
    throttle: f64,
) -> EngineOutput {
    let Some(stage) = config.stages.get(state.stage_idx) else {
        return EngineOutput::default();
    };
    if !state.engine_on || state.active_propellant() <= 0.0 {
        return EngineOutput::default();
    }
    let ratio = (pressure / SEA_LEVEL_PRESSURE).clamp(0.0, 1.0);
    let throttle = throttle.clamp(0.0, 1.0);
    let thrust = (stage.thrust * ratio + stage.thrust_vac * (1.0 - ratio)) * throttle;
    let isp = stage.isp * ratio + stage.isp_vac * (1.0 - ratio);
    let mass_flow = if isp > 0.0 { thrust / (isp * G0) } else { 0.0 };
    EngineOutput { thrust, isp, mass_flow }
}

/// Thrust (N) at geometric `altitude`.
pub fn thrust(config: &VehicleConfiguration, state: &VehicleState, altitude: f64, throttle: f64) -> f64 {
    engine_output(config, state, atmosphere::isa(altitude).pressure, throttle).thrust
}

/// Propellant mass flow (kg/s) at geometric `altitude`.
pub fn mass_flow_rate(config: &VehicleConfiguration, state: &VehicleState, altitude: f64, throttle: f64) -> f64 {
    engine_output(config, state, atmosphere::isa(altitude).pressure, throttle).mass_flow
}
