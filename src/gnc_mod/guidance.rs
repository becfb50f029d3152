use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dynamics::state::{angle_of, flight_path_angle, VehicleState, MU, PLANET_RADIUS};
use crate::orbital::elements::{predict_orbit, OrbitElements};
use crate::orbital::maneuvers::{
    apoapsis_trim_delta_v, burn_duration, circular_velocity, circularization_delta_v, vis_viva_speed,
};
use crate::physics::{atmosphere, mass_properties};
use crate::sim::event::{BurnKind, EventKind};
use crate::vehicle::VehicleConfiguration;

use super::controller::{Controller, SteeringCommand};

// ---------------------------------------------------------------------------
// Guidance configuration
// ---------------------------------------------------------------------------

/// Tuned guidance constants. Convergence depends on these exact values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceConfig {
    pub target_altitude: f64,     // m
    pub tolerance: f64,           // m, apsis band half-width
    pub atmosphere_exit: f64,     // m
    pub kick_start: f64,          // s
    pub kick_end: f64,            // s
    pub kick_pitch: f64,          // deg, pitch at the end of the kick
    pub max_q: f64,               // Pa
    pub pitch_floor: f64,         // deg, minimum pitch at the pad
    pub turn_damping: f64,        // share of excess turn rate let through
    pub raise_band: f64,          // m, apoapsis deficit for full throttle
    pub throttle_margin: f64,     // m/s, velocity deficit for full throttle
    pub min_throttle: f64,
    pub max_pitch_rate: f64,      // deg/s
    pub radial_time_constant: f64,   // s
    pub altitude_time_constant: f64, // s
    pub max_radial_rate: f64,     // m/s
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            target_altitude: 500_000.0,
            tolerance: 10_000.0,
            atmosphere_exit: 70_000.0,
            kick_start: 12.0,
            kick_end: 22.0,
            kick_pitch: 80.0,
            max_q: 35_000.0,
            pitch_floor: 80.0,
            turn_damping: 0.3,
            raise_band: 50_000.0,
            throttle_margin: 40.0,
            min_throttle: 0.1,
            max_pitch_rate: 2.0,
            radial_time_constant: 5.0,
            altitude_time_constant: 400.0,
            max_radial_rate: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Phases and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuidancePhase {
    PreLaunch,
    VerticalAscent,
    PitchKick,
    MaxQProtection,
    AtmosphericAscent,
    RaisingApoapsis,
    CoastingToApoapsis,
    Circularizing,
    CoastingToPeriapsis,
    RetrogradeTrim,
    OrbitAchieved,
}

impl GuidancePhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::PreLaunch => "pre-launch",
            Self::VerticalAscent => "vertical ascent",
            Self::PitchKick => "pitch kick",
            Self::MaxQProtection => "max-Q protection",
            Self::AtmosphericAscent => "atmospheric ascent",
            Self::RaisingApoapsis => "raising apoapsis",
            Self::CoastingToApoapsis => "coasting to apoapsis",
            Self::Circularizing => "circularizing",
            Self::CoastingToPeriapsis => "coasting to periapsis",
            Self::RetrogradeTrim => "retrograde trim",
            Self::OrbitAchieved => "orbit achieved",
        }
    }
}

impl fmt::Display for GuidancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Values behind the latest guidance decision, for display.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuidanceDiagnostics {
    pub apoapsis: f64,            // m
    pub periapsis: f64,           // m
    pub dynamic_pressure: f64,    // Pa
    pub flight_path_angle: f64,   // deg
    pub time_to_apoapsis: f64,    // s
    pub time_to_periapsis: f64,   // s
    pub burn_duration: f64,       // s, predicted for the pending burn
    pub velocity_deficit: f64,    // m/s
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceOutput {
    pub pitch: f64,      // deg above local horizontal
    pub throttle: f64,   // [0, 1]
    pub phase: GuidancePhase,
    pub retrograde: bool,
    pub diagnostics: GuidanceDiagnostics,
}

/// Inertial attitude for a pitch (deg above local horizontal), pointing
/// along or against the direction of planet rotation.
pub fn pitch_to_angle(pitch_deg: f64, retrograde: bool, state: &VehicleState) -> f64 {
    let p = pitch_deg.to_radians();
    let sign = if retrograde { -1.0 } else { 1.0 };
    let dir = state.east() * (sign * p.cos()) + state.up() * p.sin();
    angle_of(&dir)
}

// ---------------------------------------------------------------------------
// Guidance state machine
// ---------------------------------------------------------------------------

/// Priority-based pitch/throttle guidance from the pad to a circular orbit.
#[derive(Debug, Clone)]
pub struct GuidanceStateMachine {
    pub config: GuidanceConfig,
    phase: GuidancePhase,
    last_pitch: f64,
    throttle: f64,
    last_flight_path_angle: f64,
    retrograde: bool,
    circularization_announced: bool,
    retrograde_announced: bool,
    orbit_announced: bool,
    diagnostics: GuidanceDiagnostics,
    pending: Vec<EventKind>,
}

impl GuidanceStateMachine {
    pub fn new(config: GuidanceConfig) -> Self {
        Self {
            config,
            phase: GuidancePhase::PreLaunch,
            last_pitch: 90.0,
            throttle: 1.0,
            last_flight_path_angle: 90.0,
            retrograde: false,
            circularization_announced: false,
            retrograde_announced: false,
            orbit_announced: false,
            diagnostics: GuidanceDiagnostics::default(),
            pending: Vec::new(),
        }
    }

    pub fn phase(&self) -> GuidancePhase {
        self.phase
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn last_pitch(&self) -> f64 {
        self.last_pitch
    }

    pub fn last_flight_path_angle(&self) -> f64 {
        self.last_flight_path_angle
    }

    pub fn is_retrograde(&self) -> bool {
        self.retrograde
    }

    pub fn diagnostics(&self) -> &GuidanceDiagnostics {
        &self.diagnostics
    }

    /// Seed the rate limiter, e.g. when starting mid-flight.
    pub fn prime_pitch(&mut self, pitch: f64) {
        self.last_pitch = pitch.clamp(-5.0, 90.0);
    }

    /// Take queued burn and orbit announcements.
    pub fn drain_events(&mut self) -> Vec<EventKind> {
        std::mem::take(&mut self.pending)
    }

    /// Evaluate guidance for one sub-step of length `dt`.
    pub fn update(&mut self, vehicle: &VehicleConfiguration, state: &VehicleState, dt: f64) -> GuidanceOutput {
        let g = &self.config;
        let r = state.radius();
        let alt = r - PLANET_RADIUS;
        let orbit = predict_orbit(&state.pos, &state.vel);
        let mut diag = GuidanceDiagnostics {
            apoapsis: orbit.apoapsis,
            periapsis: orbit.periapsis,
            ..GuidanceDiagnostics::default()
        };

        let (phase, pitch, throttle, retrograde) = if alt < g.atmosphere_exit {
            let (phase, pitch) = self.ascent(state, dt, &mut diag);
            (phase, pitch, 1.0, false)
        } else {
            self.vacuum(vehicle, state, &orbit, &mut diag)
        };

        // Holds for retrograde steering too: the trim burn waits for
        // periapsis, where -gamma is near zero.
        let pitch = pitch.clamp(-5.0, 90.0);
        let step = self.config.max_pitch_rate * dt;
        let pitch = pitch.clamp(self.last_pitch - step, self.last_pitch + step);

        self.announce(phase, &orbit);
        self.last_pitch = pitch;
        self.throttle = throttle;
        self.retrograde = retrograde;
        self.diagnostics = diag;

        GuidanceOutput { pitch, throttle, phase, retrograde, diagnostics: diag }
    }

    /// Vertical rise, pitch kick, then a damped gravity turn.
    fn ascent(&mut self, state: &VehicleState, dt: f64, diag: &mut GuidanceDiagnostics) -> (GuidancePhase, f64) {
        let g = &self.config;
        let t = state.time;
        let v_air = state.air_velocity();
        let speed = v_air.norm();
        let gamma = if speed > 1.0 { flight_path_angle(state, &v_air) } else { 90.0 };
        self.last_flight_path_angle = gamma;
        diag.flight_path_angle = gamma;

        if t < g.kick_start {
            return (GuidancePhase::VerticalAscent, 90.0);
        }
        if t < g.kick_end {
            let f = (t - g.kick_start) / (g.kick_end - g.kick_start);
            let pitch = 90.0 - (90.0 - g.kick_pitch) * (1.0 - (std::f64::consts::PI * f).cos()) / 2.0;
            return (GuidancePhase::PitchKick, pitch);
        }

        let alt = state.altitude();
        let q = 0.5 * atmosphere::isa(alt).density * speed * speed;
        diag.dynamic_pressure = q;
        if q > 0.8 * g.max_q {
            return (GuidancePhase::MaxQProtection, gamma);
        }

        let frac = (alt / g.atmosphere_exit).clamp(0.0, 1.0);
        let floor = g.pitch_floor * (1.0 - frac).powi(2);
        let mut target = gamma.max(floor);
        if dt > 0.0 {
            let rate = (self.last_pitch - target) / dt;
            let r = state.radius();
            let natural = (MU / (r * r) * gamma.to_radians().cos() / speed.max(1.0)).to_degrees();
            if rate > natural {
                let damped = natural + g.turn_damping * (rate - natural);
                target = self.last_pitch - damped * dt;
            }
        }
        (GuidancePhase::AtmosphericAscent, target)
    }

    /// Apsis management above the atmosphere. Returns phase, pitch,
    /// throttle and the retrograde flag.
    fn vacuum(
        &mut self,
        vehicle: &VehicleConfiguration,
        state: &VehicleState,
        orbit: &OrbitElements,
        diag: &mut GuidanceDiagnostics,
    ) -> (GuidancePhase, f64, f64, bool) {
        let g = &self.config;
        let r = state.radius();
        let v = state.vel.norm();
        let vr = state.radial_speed();
        let gamma = flight_path_angle(state, &state.vel);
        self.last_flight_path_angle = gamma;
        diag.flight_path_angle = gamma;

        let target = g.target_altitude;
        let tol = g.tolerance;
        let half_tol = 0.5 * tol;
        let timing = orbit.apsis_timing(r, vr);
        diag.time_to_apoapsis = timing.to_apoapsis;
        diag.time_to_periapsis = timing.to_periapsis;
        let mass = mass_properties::compute(vehicle, state).mass;
        let v_circ = circular_velocity(r);
        let throttle_for = |deficit: f64| (deficit / g.throttle_margin).clamp(g.min_throttle, 1.0);

        let raising = orbit.apoapsis < target - tol
            || (self.phase == GuidancePhase::RaisingApoapsis && orbit.apoapsis < target);
        let circularizing = orbit.periapsis < target - tol
            || (self.phase == GuidancePhase::Circularizing && orbit.periapsis < target - half_tol && v < v_circ);
        let trimming = orbit.apoapsis > target + tol
            || (self.phase == GuidancePhase::RetrogradeTrim && orbit.apoapsis > target);

        if raising {
            let deficit = target - orbit.apoapsis;
            let throttle = (deficit / g.raise_band).clamp(g.min_throttle, 1.0);
            return (GuidancePhase::RaisingApoapsis, gamma, throttle, false);
        }

        if circularizing {
            let half = burn_duration(vehicle, state, mass, circularization_delta_v(orbit)) / 2.0;
            diag.burn_duration = 2.0 * half;
            if self.phase != GuidancePhase::Circularizing && vr > 0.0 && timing.to_apoapsis > half {
                return (GuidancePhase::CoastingToApoapsis, gamma, 0.0, false);
            }
            let deficit = v_circ - v;
            diag.velocity_deficit = deficit;
            let throttle = throttle_for(deficit);
            let pitch = self.altitude_hold_pitch(vehicle, state, mass, throttle);
            return (GuidancePhase::Circularizing, pitch, throttle, false);
        }

        if trimming {
            let target_radius = PLANET_RADIUS + target;
            let half = burn_duration(vehicle, state, mass, apoapsis_trim_delta_v(orbit, target_radius)) / 2.0;
            diag.burn_duration = 2.0 * half;
            if self.phase != GuidancePhase::RetrogradeTrim
                && timing.to_periapsis > half
                && timing.since_periapsis > half
            {
                return (GuidancePhase::CoastingToPeriapsis, -gamma, 0.0, true);
            }
            let deficit = v - vis_viva_speed(r, (r + target_radius) / 2.0);
            diag.velocity_deficit = deficit;
            return (GuidancePhase::RetrogradeTrim, -gamma, throttle_for(deficit), true);
        }

        (GuidancePhase::OrbitAchieved, gamma, 0.0, false)
    }

    /// Pitch (deg) whose vertical thrust component nulls radial speed and
    /// eases the vehicle toward the target radius.
    fn altitude_hold_pitch(&self, vehicle: &VehicleConfiguration, state: &VehicleState, mass: f64, throttle: f64) -> f64 {
        let g = &self.config;
        let Some(stage) = vehicle.stages.get(state.stage_idx) else {
            return 0.0;
        };
        let accel = if mass > 0.0 { stage.thrust_vac * throttle / mass } else { 0.0 };
        if accel <= 0.0 {
            return 0.0;
        }
        let r = state.radius();
        let v = state.vel.norm();
        let vr = state.radial_speed();
        let horizontal_sq = (v * v - vr * vr).max(0.0);
        let r_target = PLANET_RADIUS + g.target_altitude;
        let vr_wanted = ((r_target - r) / g.altitude_time_constant).clamp(-g.max_radial_rate, g.max_radial_rate);
        let needed = MU / (r * r) - horizontal_sq / r + (vr_wanted - vr) / g.radial_time_constant;
        (needed / accel).clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Queue one-shot burn and orbit announcements, log phase changes.
    fn announce(&mut self, phase: GuidancePhase, orbit: &OrbitElements) {
        if phase != self.phase {
            debug!(
                "guidance: {} -> {} (apo {:.1} km, peri {:.1} km)",
                self.phase,
                phase,
                orbit.apoapsis / 1000.0,
                orbit.periapsis / 1000.0
            );
        }

        let burns = [
            (GuidancePhase::Circularizing, BurnKind::Circularization),
            (GuidancePhase::RetrogradeTrim, BurnKind::RetrogradeTrim),
        ];
        for (burn_phase, burn) in burns {
            let flag = match burn {
                BurnKind::Circularization => &mut self.circularization_announced,
                BurnKind::RetrogradeTrim => &mut self.retrograde_announced,
            };
            if phase == burn_phase && !*flag {
                *flag = true;
                self.pending.push(EventKind::BurnStarted { burn });
            } else if phase != burn_phase && *flag {
                *flag = false;
                self.pending.push(EventKind::BurnEnded { burn });
            }
        }

        if phase == GuidancePhase::OrbitAchieved && !self.orbit_announced {
            self.orbit_announced = true;
            self.pending.push(EventKind::OrbitAchieved {
                apoapsis: orbit.apoapsis,
                periapsis: orbit.periapsis,
            });
        }
        self.phase = phase;
    }
}

impl Default for GuidanceStateMachine {
    fn default() -> Self {
        Self::new(GuidanceConfig::default())
    }
}

impl Controller for GuidanceStateMachine {
    fn control(&mut self, vehicle: &VehicleConfiguration, state: &VehicleState, dt: f64) -> SteeringCommand {
        let out = self.update(vehicle, state, dt);
        SteeringCommand {
            target_angle: pitch_to_angle(out.pitch, out.retrograde, state),
            throttle: out.throttle,
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn name(&self) -> &str {
        "GuidanceStateMachine"
    }
}
