use nalgebra::Vector2;

use crate::dynamics::state::{flight_path_angle, VehicleState, KARMAN_LINE};
use crate::gnc::guidance::{GuidanceDiagnostics, GuidancePhase, GuidanceStateMachine};
use crate::orbital::maneuvers::circular_velocity;
use crate::orbital::{predict_orbit, remaining_delta_v, OrbitElements};
use crate::physics::{atmosphere, EngineOutput, MassProperties};
use crate::sim::event::BurnKind;
use crate::vehicle::VehicleConfiguration;

// ---------------------------------------------------------------------------
// Force directions
// ---------------------------------------------------------------------------

/// Unit vectors of the forces acting during the last sub-step.
/// A zero vector means the force was absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceBreakdown {
    pub gravity: Vector2<f64>,
    pub thrust: Vector2<f64>,
    pub drag: Vector2<f64>,
    pub normal: Vector2<f64>,
}

fn unit_or_zero(v: &Vector2<f64>) -> Vector2<f64> {
    let n = v.norm();
    if n > 1e-12 { v / n } else { Vector2::zeros() }
}

impl ForceBreakdown {
    pub fn from_forces(
        gravity: &Vector2<f64>,
        thrust: &Vector2<f64>,
        drag: &Vector2<f64>,
        normal: &Vector2<f64>,
    ) -> Self {
        Self {
            gravity: unit_or_zero(gravity),
            thrust: unit_or_zero(thrust),
            drag: unit_or_zero(drag),
            normal: unit_or_zero(normal),
        }
    }
}

impl Default for ForceBreakdown {
    fn default() -> Self {
        Self {
            gravity: Vector2::zeros(),
            thrust: Vector2::zeros(),
            drag: Vector2::zeros(),
            normal: Vector2::zeros(),
        }
    }
}

// ---------------------------------------------------------------------------
// Next-event estimate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextEvent {
    PitchKick,
    KarmanLine,
    FairingJettison,
    StageSeparation { stage: usize },
    EngineCutoff { stage: usize },
    OrbitAchieved,
    BurnStart { burn: BurnKind },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpcomingEvent {
    pub event: NextEvent,
    pub time_until: f64,  // s
}

/// Soonest predicted event, extrapolating current rates linearly.
pub fn next_event(
    vehicle: &VehicleConfiguration,
    state: &VehicleState,
    guidance: &GuidanceStateMachine,
    engine: &EngineOutput,
    mass: f64,
) -> Option<UpcomingEvent> {
    let mut candidates: Vec<(NextEvent, f64)> = Vec::new();
    let alt = state.altitude();
    let vr = state.radial_speed();
    let g = &guidance.config;

    let on_ascent = matches!(guidance.phase(), GuidancePhase::PreLaunch | GuidancePhase::VerticalAscent);
    if on_ascent && alt < g.atmosphere_exit && state.time < g.kick_start {
        candidates.push((NextEvent::PitchKick, g.kick_start - state.time));
    }
    if vr > 0.0 && alt < KARMAN_LINE {
        candidates.push((NextEvent::KarmanLine, (KARMAN_LINE - alt) / vr));
    }
    if vr > 0.0 && !state.fairing_jettisoned && alt < vehicle.fairing_jettison_altitude {
        candidates.push((NextEvent::FairingJettison, (vehicle.fairing_jettison_altitude - alt) / vr));
    }
    if engine.mass_flow > 0.0 {
        let t = state.active_propellant().max(0.0) / engine.mass_flow;
        let stage = state.stage_idx;
        let event = if stage + 1 < vehicle.stages.len() {
            NextEvent::StageSeparation { stage }
        } else {
            NextEvent::EngineCutoff { stage }
        };
        candidates.push((event, t));
    }

    let diag = guidance.diagnostics();
    match guidance.phase() {
        GuidancePhase::Circularizing if mass > 0.0 && engine.thrust > 0.0 => {
            let deficit = circular_velocity(state.radius()) - state.vel.norm();
            if deficit > 0.0 {
                candidates.push((NextEvent::OrbitAchieved, deficit / (engine.thrust / mass)));
            }
        }
        GuidancePhase::CoastingToApoapsis => candidates.push((
            NextEvent::BurnStart { burn: BurnKind::Circularization },
            diag.time_to_apoapsis - diag.burn_duration / 2.0,
        )),
        GuidancePhase::CoastingToPeriapsis => candidates.push((
            NextEvent::BurnStart { burn: BurnKind::RetrogradeTrim },
            diag.time_to_periapsis - diag.burn_duration / 2.0,
        )),
        _ => {}
    }

    candidates
        .into_iter()
        .filter(|(_, t)| t.is_finite() && *t >= 0.0)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(event, time_until)| UpcomingEvent { event, time_until })
}

// ---------------------------------------------------------------------------
// Telemetry snapshot
// ---------------------------------------------------------------------------

/// Read-only projection of the simulation for display.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub state: VehicleState,
    pub altitude: f64,            // m
    pub speed: f64,               // m/s, inertial
    pub radial_speed: f64,        // m/s
    pub horizontal_speed: f64,    // m/s
    pub air_speed: f64,           // m/s
    pub mach: f64,
    pub flight_path_angle: f64,   // deg
    pub orbit: OrbitElements,
    pub phase: GuidancePhase,
    pub diagnostics: GuidanceDiagnostics,
    pub commanded_pitch: f64,     // deg, last rate-limited guidance pitch
    pub retrograde: bool,
    pub guidance_flight_path_angle: f64, // deg, as last seen by guidance
    pub throttle: f64,
    pub remaining_delta_v: f64,   // m/s
    pub mass: MassProperties,
    pub fuel_fraction: Vec<f64>,  // per stage, of the loaded propellant
    pub forces: ForceBreakdown,
    pub next_event: Option<UpcomingEvent>,
}

impl Telemetry {
    pub fn capture(
        vehicle: &VehicleConfiguration,
        state: &VehicleState,
        guidance: &GuidanceStateMachine,
        mass: MassProperties,
        engine: &EngineOutput,
        throttle: f64,
        forces: ForceBreakdown,
    ) -> Self {
        let altitude = state.altitude();
        let air_speed = state.air_velocity().norm();
        let sound_speed = atmosphere::isa(altitude).sound_speed.max(1.0);
        let fuel_fraction = vehicle
            .stages
            .iter()
            .zip(&state.propellant)
            .map(|(s, p)| if s.propellant_mass > 0.0 { (p / s.propellant_mass).clamp(0.0, 1.0) } else { 0.0 })
            .collect();

        Self {
            state: state.clone(),
            altitude,
            speed: state.vel.norm(),
            radial_speed: state.radial_speed(),
            horizontal_speed: state.horizontal_speed(),
            air_speed,
            mach: air_speed / sound_speed,
            flight_path_angle: flight_path_angle(state, &state.vel),
            orbit: predict_orbit(&state.pos, &state.vel),
            phase: guidance.phase(),
            diagnostics: *guidance.diagnostics(),
            commanded_pitch: guidance.last_pitch(),
            retrograde: guidance.is_retrograde(),
            guidance_flight_path_angle: guidance.last_flight_path_angle(),
            throttle,
            remaining_delta_v: remaining_delta_v(vehicle, state),
            next_event: next_event(vehicle, state, guidance, engine, mass.mass),
            mass,
            fuel_fraction,
            forces,
        }
    }
}
