use log::{info, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::dynamics::attitude::{gimbal_torque, integrate_rotation, slew_gimbal, TorqueInputs};
use crate::dynamics::state::{VehicleState, KARMAN_LINE, PLANET_RADIUS};
use crate::gnc::controller::{AttitudeHold, BurnMode, Controller, SteeringCommand};
use crate::gnc::guidance::{pitch_to_angle, GuidanceConfig, GuidanceStateMachine};
use crate::gnc::TvcController;
use crate::physics::{aero_loads, engine_output, gravity_accel, isa, mass_properties};
use crate::vehicle::{ConfigError, VehicleConfiguration};

use super::event::{AltitudeDetector, EventDetector, EventKind, MaxQDetector, SimEvent};
use super::integrator::symplectic_euler;
use super::telemetry::{ForceBreakdown, Telemetry};

/// Time-warp factors accepted by [`Simulation::set_time_warp`].
pub const TIME_WARP_FACTORS: [f64; 8] = [1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 1000.0];
/// Propellant added per refuel request.
pub const REFUEL_INCREMENT: f64 = 5_000.0; // kg

const MAX_TICK: f64 = 1.0;                  // s of simulated time per tick
const MAX_SUBSTEPS: usize = 1000;
const POWERED_SUBSTEP: f64 = 0.05;          // s
const COASTING_SUBSTEP: f64 = 0.01;         // s
const COASTING_ALTITUDE: f64 = 150_000.0;   // m

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    PreLaunch,
    Running,
    Paused,
    Failed,
}

/// Host view settings, stored but not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub zoom: f64,
    pub follow_vehicle: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self { zoom: 1.0, follow_vehicle: true }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Launch simulation: owns the vehicle, its state, guidance and events.
///
/// Driven by [`Simulation::tick`] with wall-clock frame times; each tick
/// covers `wall_dt * time_warp` seconds (capped at 1 s) in fixed
/// sub-steps.
pub struct Simulation {
    /// Committed configuration, applied on the next reset.
    config: VehicleConfiguration,
    /// Configuration of the vehicle currently flying.
    vehicle: VehicleConfiguration,
    state: VehicleState,
    guidance: GuidanceStateMachine,
    tvc: TvcController,
    status: RunStatus,
    burn_mode: BurnMode,
    manual_pitch: Option<f64>,   // deg
    manual_gimbal: Option<f64>,  // rad
    manual_throttle: f64,
    guidance_enabled: bool,
    aero_torque: bool,
    view: ViewSettings,
    detectors: Vec<Box<dyn EventDetector>>,
    events: Vec<SimEvent>,
    throttle: f64,
    forces: ForceBreakdown,
}

impl Simulation {
    /// Start on the pad. The configuration is re-validated; an invalid one
    /// is replaced by the reference vehicle.
    pub fn new(config: VehicleConfiguration) -> Self {
        Self::with_guidance(config, GuidanceConfig::default())
    }

    pub fn with_guidance(config: VehicleConfiguration, guidance: GuidanceConfig) -> Self {
        let config = Self::validated(config);
        let detectors = Self::detectors(&guidance);
        Self {
            state: VehicleState::on_pad(&config),
            vehicle: config.clone(),
            config,
            guidance: GuidanceStateMachine::new(guidance),
            tvc: TvcController::new(),
            status: RunStatus::PreLaunch,
            burn_mode: BurnMode::None,
            manual_pitch: None,
            manual_gimbal: None,
            manual_throttle: 1.0,
            guidance_enabled: true,
            aero_torque: true,
            view: ViewSettings::default(),
            detectors,
            events: Vec::new(),
            throttle: 0.0,
            forces: ForceBreakdown::default(),
        }
    }

    fn validated(config: VehicleConfiguration) -> VehicleConfiguration {
        match config.to_builder().build() {
            Ok(valid) => valid,
            Err(e) => {
                warn!("configuration rejected, using the reference vehicle: {}", e);
                VehicleConfiguration::default()
            }
        }
    }

    fn detectors(guidance: &GuidanceConfig) -> Vec<Box<dyn EventDetector>> {
        vec![
            Box::new(AltitudeDetector::new(KARMAN_LINE, true, EventKind::KarmanLineCrossed)),
            Box::new(MaxQDetector::new(guidance.max_q)),
        ]
    }

    // -- Queries ------------------------------------------------------------

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn guidance(&self) -> &GuidanceStateMachine {
        &self.guidance
    }

    pub fn vehicle(&self) -> &VehicleConfiguration {
        &self.vehicle
    }

    /// Every event since the last reset, in order.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn view(&self) -> ViewSettings {
        self.view
    }

    pub fn burn_mode(&self) -> BurnMode {
        self.burn_mode
    }

    /// Throttle applied during the last sub-step.
    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn telemetry(&self) -> Telemetry {
        let mass = mass_properties::compute(&self.vehicle, &self.state);
        let pressure = isa(self.state.altitude()).pressure;
        let engine = engine_output(&self.vehicle, &self.state, pressure, self.throttle);
        Telemetry::capture(&self.vehicle, &self.state, &self.guidance, mass, &engine, self.throttle, self.forces)
    }

    // -- Run control --------------------------------------------------------

    pub fn launch(&mut self) {
        if self.status != RunStatus::PreLaunch {
            warn!("launch ignored: simulation is {:?}", self.status);
            return;
        }
        Controller::reset(&mut self.guidance);
        self.status = RunStatus::Running;
        info!(
            "launch: {} stages, liftoff mass {:.0} kg",
            self.vehicle.stages.len(),
            self.vehicle.liftoff_mass()
        );
    }

    pub fn pause(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == RunStatus::Paused {
            self.status = RunStatus::Running;
        }
    }

    /// Back to the pad with the committed configuration.
    pub fn reset(&mut self) {
        self.restart(VehicleState::on_pad);
        self.status = RunStatus::PreLaunch;
        info!("reset to launch pad");
    }

    /// Place the final stage of the committed configuration on a circular
    /// prograde orbit and start running.
    pub fn insert_into_orbit(&mut self, altitude: f64) {
        self.restart(|vehicle| VehicleState::in_orbit(vehicle, altitude));
        self.guidance.prime_pitch(0.0);
        self.status = RunStatus::Running;
        info!("inserted into {:.0} km circular orbit", altitude / 1000.0);
    }

    /// Load the committed configuration and clear all per-run state.
    /// Time warp survives.
    fn restart(&mut self, initial: impl FnOnce(&VehicleConfiguration) -> VehicleState) {
        let warp = self.state.time_warp;
        self.vehicle = self.config.clone();
        self.state = initial(&self.vehicle);
        self.state.time_warp = warp;
        Controller::reset(&mut self.guidance);
        for d in self.detectors.iter_mut() {
            d.reset();
        }
        self.events.clear();
        self.burn_mode = BurnMode::None;
        self.manual_pitch = None;
        self.manual_gimbal = None;
        self.throttle = 0.0;
        self.forces = ForceBreakdown::default();
    }

    // -- Operator controls --------------------------------------------------

    /// Returns false (and leaves the warp unchanged) for unsupported factors.
    pub fn set_time_warp(&mut self, factor: f64) -> bool {
        if TIME_WARP_FACTORS.contains(&factor) {
            self.state.time_warp = factor;
            true
        } else {
            warn!("unsupported time warp {}x ignored", factor);
            false
        }
    }

    pub fn set_view(&mut self, view: ViewSettings) {
        self.view = view;
    }

    pub fn set_burn_mode(&mut self, mode: BurnMode) {
        self.burn_mode = mode;
    }

    /// Pitch override in degrees above the local horizontal.
    pub fn set_manual_pitch(&mut self, pitch: Option<f64>) {
        self.manual_pitch = pitch;
    }

    /// Gimbal override in radians, clamped to the active stage limit.
    pub fn set_manual_gimbal(&mut self, gimbal: Option<f64>) {
        self.manual_gimbal = gimbal;
    }

    pub fn set_manual_throttle(&mut self, throttle: f64) {
        self.manual_throttle = throttle.clamp(0.0, 1.0);
    }

    pub fn set_guidance_enabled(&mut self, enabled: bool) {
        self.guidance_enabled = enabled;
    }

    pub fn set_aero_torque(&mut self, enabled: bool) {
        self.aero_torque = enabled;
    }

    /// Top up the active stage, clamped to tank capacity. Returns the mass
    /// actually added.
    pub fn refuel(&mut self) -> f64 {
        let idx = self.state.stage_idx;
        let capacity = self.vehicle.max_propellant_for_stage(idx);
        let Some(prop) = self.state.propellant.get_mut(idx) else {
            warn!("refuel ignored: no active stage");
            return 0.0;
        };
        let before = prop.max(0.0);
        *prop = (before + REFUEL_INCREMENT).min(capacity);
        let added = *prop - before;
        if *prop > 0.0 {
            self.state.engine_on = true;
        }
        added
    }

    // -- Configuration ------------------------------------------------------

    pub fn configuration(&self) -> &VehicleConfiguration {
        &self.config
    }

    pub fn default_configuration() -> VehicleConfiguration {
        VehicleConfiguration::default()
    }

    /// Validate and commit; a rejected configuration leaves the current
    /// one in place. Takes effect on the next reset.
    pub fn set_configuration(&mut self, config: VehicleConfiguration) -> Result<(), ConfigError> {
        match config.to_builder().build() {
            Ok(valid) => {
                self.config = valid;
                Ok(())
            }
            Err(e) => {
                warn!("configuration rejected: {}", e);
                Err(e)
            }
        }
    }

    pub fn reset_configuration(&mut self) {
        self.config = VehicleConfiguration::default();
    }

    // -- Stepping -----------------------------------------------------------

    /// Advance by one frame of `wall_dt` seconds. Returns the events raised.
    pub fn tick(&mut self, wall_dt: f64) -> Vec<SimEvent> {
        if self.status != RunStatus::Running || !(wall_dt > 0.0) {
            return Vec::new();
        }
        let total = (wall_dt * self.state.time_warp).min(MAX_TICK);
        let coasting = (self.throttle <= 0.0 || !self.state.engine_on) && self.state.altitude() > COASTING_ALTITUDE;
        let max_substep = if coasting { COASTING_SUBSTEP } else { POWERED_SUBSTEP };
        let n = ((total / max_substep - 1e-9).ceil().max(1.0) as usize).min(MAX_SUBSTEPS);
        let dt = total / n as f64;

        let prev = self.state.clone();
        let mut raised = Vec::new();
        for _ in 0..n {
            self.substep(dt);
            self.state.time += dt;
            let time = self.state.time;
            raised.extend(self.guidance.drain_events().into_iter().map(|kind| SimEvent { time, kind }));
        }

        self.check_depletion(&mut raised);
        self.check_fairing(&mut raised);
        for d in self.detectors.iter_mut() {
            if let Some(kind) = d.check(&prev, &self.state) {
                raised.push(SimEvent { time: self.state.time, kind });
            }
        }
        if self.state.time > 1.0 && self.state.radius() < PLANET_RADIUS {
            self.status = RunStatus::Failed;
            raised.push(SimEvent {
                time: self.state.time,
                kind: EventKind::MissionFailure { reason: "ground impact".into() },
            });
        }

        for e in &raised {
            info!("T+{:.1}s: {}", e.time, e.kind);
        }
        self.events.extend(raised.iter().cloned());
        raised
    }

    /// Clamp an empty active tank to zero, then stage or cut off the engine.
    fn check_depletion(&mut self, raised: &mut Vec<SimEvent>) {
        let idx = self.state.stage_idx;
        let time = self.state.time;
        let Some(prop) = self.state.propellant.get_mut(idx) else {
            return;
        };
        if *prop > 0.0 {
            return;
        }
        *prop = 0.0;
        if idx + 1 < self.vehicle.stages.len() {
            raised.push(SimEvent { time, kind: EventKind::EngineCutoff { stage: idx } });
            raised.push(SimEvent { time, kind: EventKind::StageSeparation { stage: idx } });
            self.state.stage_idx += 1;
        } else if self.state.engine_on {
            self.state.engine_on = false;
            raised.push(SimEvent { time, kind: EventKind::EngineCutoff { stage: idx } });
        }
    }

    fn check_fairing(&mut self, raised: &mut Vec<SimEvent>) {
        if !self.state.fairing_jettisoned && self.state.altitude() >= self.vehicle.fairing_jettison_altitude {
            self.state.fairing_jettisoned = true;
            raised.push(SimEvent { time: self.state.time, kind: EventKind::FairingJettison });
        }
    }

    /// Resolve the steering source for this sub-step.
    fn steer(&mut self, dt: f64) -> SteeringCommand {
        if self.burn_mode.is_active() {
            let mut mode = self.burn_mode;
            return mode.control(&self.vehicle, &self.state, dt);
        }
        let mut cmd = if self.guidance_enabled {
            self.guidance.control(&self.vehicle, &self.state, dt)
        } else {
            AttitudeHold.control(&self.vehicle, &self.state, dt)
        };
        if let Some(pitch) = self.manual_pitch {
            cmd.target_angle = pitch_to_angle(pitch, false, &self.state);
        }
        if self.manual_gimbal.is_some() {
            cmd.throttle = self.manual_throttle;
        }
        cmd
    }

    /// One fixed sub-step: forces, torques, then symplectic integration.
    fn substep(&mut self, dt: f64) {
        let cmd = self.steer(dt);
        self.throttle = cmd.throttle;

        let vehicle = &self.vehicle;
        let state = &mut self.state;
        let Some(stage) = vehicle.stages.get(state.stage_idx).or(vehicle.stages.last()) else {
            return;
        };

        let atm = isa(state.altitude());
        let engine = engine_output(vehicle, state, atm.pressure, cmd.throttle);
        let mp = mass_properties::compute(vehicle, state);

        // Attitude: outer loop, gimbal servo, torques
        let arm = mp.cog - stage.gimbal_point;
        let tvc = self.tvc.update(
            cmd.target_angle,
            state.angle,
            state.angular_velocity,
            engine.thrust,
            arm,
            mp.moi,
            stage.gimbal_max,
            vehicle.rcs_torque,
        );
        state.gimbal_cmd = match self.manual_gimbal {
            Some(g) => g.clamp(-stage.gimbal_max, stage.gimbal_max),
            None => tvc.gimbal,
        };
        state.gimbal = slew_gimbal(state.gimbal, state.gimbal_cmd, stage.gimbal_max, stage.gimbal_rate, dt);

        let aero = aero_loads(vehicle, state, &mp, &atm);
        let torques = TorqueInputs {
            gimbal: gimbal_torque(engine.thrust, state.gimbal, arm),
            aero: if self.aero_torque { aero.torque } else { 0.0 },
            rcs: tvc.rcs_torque,
        };
        integrate_rotation(state, &torques, mp.moi, dt);

        // Translation
        let gravity = gravity_accel(&state.pos);
        let thrust_angle = state.angle - state.gimbal;
        let thrust = Vector2::new(thrust_angle.sin(), thrust_angle.cos()) * engine.thrust;
        let inv_mass = if mp.mass > 0.0 { 1.0 / mp.mass } else { 0.0 };
        let accel = gravity + (thrust + aero.total()) * inv_mass;
        symplectic_euler(&mut state.pos, &mut state.vel, &accel, dt);

        if engine.thrust > 0.0 {
            let idx = state.stage_idx;
            if let Some(p) = state.propellant.get_mut(idx) {
                *p -= engine.mass_flow * dt;
            }
        }
        state.dynamic_pressure = aero.dynamic_pressure;
        state.max_q = state.max_q.max(aero.dynamic_pressure);
        self.forces = ForceBreakdown::from_forces(&gravity, &thrust, &aero.axial, &aero.normal);
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(VehicleConfiguration::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::wrap_pi;
    use crate::gnc::GuidancePhase;
    use crate::orbital::predict_orbit;
    use crate::sim::event::BurnKind;
    use approx::assert_relative_eq;

    fn launched() -> Simulation {
        let mut sim = Simulation::default();
        sim.launch();
        sim
    }

    fn count(sim: &Simulation, pred: impl Fn(&EventKind) -> bool) -> usize {
        sim.events().iter().filter(|e| pred(&e.kind)).count()
    }

    #[test]
    fn nothing_happens_before_launch() {
        let mut sim = Simulation::default();
        assert!(sim.tick(0.1).is_empty());
        assert_eq!(sim.state().time, 0.0);
        assert_eq!(sim.status(), RunStatus::PreLaunch);
    }

    #[test]
    fn pause_skips_ticks() {
        let mut sim = launched();
        sim.tick(0.1);
        let t = sim.state().time;
        sim.pause();
        sim.tick(0.1);
        assert_eq!(sim.state().time, t);
        sim.resume();
        sim.tick(0.1);
        assert!(sim.state().time > t);
    }

    #[test]
    fn tick_is_capped_at_one_second() {
        let mut sim = launched();
        assert!(sim.set_time_warp(1000.0));
        sim.tick(0.5);
        assert_relative_eq!(sim.state().time, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn only_discrete_warp_factors() {
        let mut sim = Simulation::default();
        assert!(!sim.set_time_warp(3.0));
        assert_eq!(sim.state().time_warp, 1.0);
        assert!(sim.set_time_warp(25.0));
        assert_eq!(sim.state().time_warp, 25.0);
    }

    #[test]
    fn liftoff_climbs() {
        let mut sim = launched();
        for _ in 0..200 {
            sim.tick(0.05);
        }
        let s = sim.state();
        assert!(s.altitude() > 150.0, "Should clear the pad after 10 s, got {:.1} m", s.altitude());
        assert!(s.propellant[0] < sim.vehicle().stages[0].propellant_mass);
        assert_eq!(sim.guidance().phase(), GuidancePhase::VerticalAscent);
    }

    #[test]
    fn ground_impact_without_thrust() {
        let mut sim = Simulation::default();
        sim.set_guidance_enabled(false);
        sim.launch();
        let mut failed = false;
        for _ in 0..100 {
            let events = sim.tick(0.05);
            if events.iter().any(|e| matches!(e.kind, EventKind::MissionFailure { .. })) {
                failed = true;
                break;
            }
        }
        assert!(failed, "Vehicle without thrust should impact the ground");
        assert_eq!(sim.status(), RunStatus::Failed);
        let t = sim.state().time;
        sim.tick(0.05);
        assert_eq!(sim.state().time, t, "Failed run must stop advancing");
    }

    #[test]
    fn depletion_stages_exactly_once() {
        let mut sim = launched();
        sim.state.propellant[0] = 1.0;
        for _ in 0..20 {
            sim.tick(0.05);
        }
        assert_eq!(sim.state().stage_idx, 1);
        assert_eq!(sim.state().propellant[0], 0.0);
        assert_eq!(count(&sim, |k| matches!(k, EventKind::StageSeparation { stage: 0 })), 1);
        assert_eq!(count(&sim, |k| matches!(k, EventKind::EngineCutoff { stage: 0 })), 1);
    }

    #[test]
    fn final_stage_cutoff_once() {
        let mut sim = Simulation::default();
        sim.insert_into_orbit(500_000.0);
        sim.set_guidance_enabled(false);
        sim.set_burn_mode(BurnMode::Prograde);
        sim.state.propellant[1] = 0.5;
        for _ in 0..20 {
            sim.tick(0.05);
        }
        assert!(!sim.state().engine_on);
        assert_eq!(count(&sim, |k| matches!(k, EventKind::EngineCutoff { stage: 1 })), 1);
        assert_eq!(sim.state().stage_idx, 1);
    }

    #[test]
    fn refuel_clamps_and_rearms() {
        let mut sim = Simulation::default();
        let cap = sim.vehicle().max_propellant_for_stage(0);
        sim.state.propellant[0] = cap;
        assert_eq!(sim.refuel(), 0.0, "Full tank takes no more propellant");
        sim.state.propellant[0] = cap - 1_000.0;
        assert_relative_eq!(sim.refuel(), 1_000.0, epsilon = 1e-6);
        sim.state.propellant[0] = 0.0;
        sim.state.engine_on = false;
        assert_relative_eq!(sim.refuel(), REFUEL_INCREMENT);
        assert!(sim.state().engine_on);
    }

    #[test]
    fn invalid_configuration_is_ignored() {
        let mut sim = Simulation::default();
        let before = sim.configuration().clone();
        let mut bad = before.clone();
        bad.stages.truncate(0);
        assert!(sim.set_configuration(bad).is_err());
        assert_eq!(sim.configuration(), &before);
    }

    #[test]
    fn configuration_applies_on_reset() {
        let mut sim = Simulation::default();
        let heavier = sim.configuration().to_builder().payload_mass(12_000.0).build().unwrap();
        sim.set_configuration(heavier).unwrap();
        assert_eq!(sim.vehicle().payload.mass, 8_000.0);
        sim.reset();
        assert_eq!(sim.vehicle().payload.mass, 12_000.0);
        sim.reset_configuration();
        sim.reset();
        assert_eq!(sim.vehicle().payload.mass, 8_000.0);
    }

    #[test]
    fn new_revalidates_edited_configuration() {
        let mut c = VehicleConfiguration::default();
        c.stages[0].propellant_mass = 5.0e6;
        c.stages[0].length = 10.0;
        let sim = Simulation::new(c);
        let cap = sim.vehicle().max_propellant_for_stage(0);
        assert!(sim.state().propellant[0] <= cap + 1e-6, "Loaded {} over capacity {}", sim.state().propellant[0], cap);
        assert_relative_eq!(sim.vehicle().total_length(), 10.0 + 13.8 + 13.1, epsilon = 1e-9);
        assert_eq!(sim.configuration(), sim.vehicle());
    }

    #[test]
    fn new_replaces_invalid_configuration() {
        let mut c = VehicleConfiguration::default();
        c.stages.truncate(1);
        let sim = Simulation::new(c);
        assert_eq!(sim.vehicle(), &VehicleConfiguration::default());
        assert_eq!(sim.state().propellant.len(), 2);
    }

    #[test]
    fn orbit_insertion_starts_a_clean_run() {
        let mut sim = launched();
        for _ in 0..20 {
            sim.tick(0.05);
        }
        sim.state.propellant[0] = 0.0;
        sim.tick(0.05);
        assert!(!sim.events().is_empty());
        let lighter = sim.configuration().to_builder().payload_mass(4_000.0).build().unwrap();
        sim.set_configuration(lighter).unwrap();
        sim.set_burn_mode(BurnMode::Prograde);
        sim.set_manual_pitch(Some(10.0));
        sim.set_manual_gimbal(Some(0.01));

        sim.insert_into_orbit(500_000.0);
        assert!(sim.events().is_empty());
        assert_eq!(sim.burn_mode(), BurnMode::None);
        assert_eq!(sim.vehicle().payload.mass, 4_000.0);
        assert_eq!(sim.status(), RunStatus::Running);

        // Coasting in orbit raises nothing left over from the ascent
        sim.set_guidance_enabled(false);
        for _ in 0..20 {
            sim.tick(0.05);
        }
        assert!(sim.events().is_empty(), "Unexpected events {:?}", sim.events());
        assert_eq!(sim.throttle(), 0.0);
    }

    #[test]
    fn manual_pitch_keeps_guidance_throttle() {
        let mut sim = launched();
        sim.set_manual_pitch(Some(85.0));
        for _ in 0..20 {
            sim.tick(0.05);
        }
        assert_eq!(sim.guidance().throttle(), 1.0);
        assert_eq!(sim.throttle(), 1.0);
        assert!(sim.state().angle > 0.0, "Vehicle should lean east toward 85 deg pitch");
    }

    #[test]
    fn manual_pitch_is_tracked_in_orbit() {
        let mut sim = Simulation::default();
        sim.insert_into_orbit(500_000.0);
        sim.set_guidance_enabled(false);
        sim.set_manual_pitch(Some(30.0));
        for _ in 0..1600 {
            sim.tick(0.05);
        }
        let s = sim.state();
        let target = pitch_to_angle(30.0, false, s);
        let err = wrap_pi(target - s.angle).abs();
        assert!(err < 1.0_f64.to_radians(), "Attitude error {:.2} deg", err.to_degrees());
        assert_eq!(sim.throttle(), 0.0);
    }

    #[test]
    fn manual_gimbal_uses_manual_throttle() {
        let mut sim = Simulation::default();
        sim.set_manual_gimbal(Some(0.5));
        sim.set_manual_throttle(0.6);
        sim.launch();
        sim.tick(0.05);
        let max = sim.vehicle().stages[0].gimbal_max;
        let s = sim.state();
        assert_relative_eq!(s.gimbal_cmd, max, epsilon = 1e-12);
        assert!(s.gimbal > 0.0 && s.gimbal <= max);
        assert_eq!(sim.throttle(), 0.6);

        sim.set_manual_gimbal(None);
        sim.tick(0.05);
        assert_eq!(sim.throttle(), 1.0, "Guidance throttle returns with the override off");
    }

    #[test]
    fn aero_torque_toggle() {
        let spin = |aero_torque: bool| {
            let mut sim = Simulation::default();
            sim.set_guidance_enabled(false);
            sim.set_aero_torque(aero_torque);
            sim.launch();
            sim.state.pos = Vector2::new(0.0, PLANET_RADIUS + 10_000.0);
            sim.state.vel = Vector2::new(800.0, 300.0);
            sim.tick(0.05);
            sim.state().angular_velocity
        };
        assert_eq!(spin(false), 0.0);
        assert!(spin(true).abs() > 0.0, "Cross-flow at 10 km should torque the vehicle");
    }

    #[test]
    fn reset_returns_to_pad() {
        let mut sim = launched();
        sim.set_time_warp(10.0);
        for _ in 0..50 {
            sim.tick(0.1);
        }
        sim.reset();
        assert_eq!(sim.status(), RunStatus::PreLaunch);
        assert_eq!(sim.state().time, 0.0);
        assert_eq!(sim.state().time_warp, 10.0);
        assert!(sim.events().is_empty());
        assert_eq!(sim.guidance().phase(), GuidancePhase::PreLaunch);
    }

    #[test]
    fn orbit_coast_conserves_energy() {
        let mut sim = Simulation::default();
        sim.insert_into_orbit(500_000.0);
        sim.set_guidance_enabled(false);
        let energy = |s: &VehicleState| predict_orbit(&s.pos, &s.vel).specific_energy;
        let e0 = energy(sim.state());
        let h0 = predict_orbit(&sim.state().pos, &sim.state().vel).angular_momentum;
        for _ in 0..10_000 {
            sim.tick(0.01);
        }
        let s = sim.state();
        assert_relative_eq!(s.time, 100.0, epsilon = 1e-6);
        let o = predict_orbit(&s.pos, &s.vel);
        assert!(((energy(s) - e0) / e0).abs() < 1e-6, "Energy drifted");
        assert!(((o.angular_momentum - h0) / h0).abs() < 1e-9, "Angular momentum drifted");
    }

    #[test]
    fn retrograde_burn_lowers_periapsis() {
        let mut sim = Simulation::default();
        sim.insert_into_orbit(500_000.0);
        sim.set_guidance_enabled(false);
        sim.set_burn_mode(BurnMode::Retrograde);
        let peri0 = sim.telemetry().orbit.periapsis;
        for _ in 0..600 {
            sim.tick(0.05);
        }
        let peri = sim.telemetry().orbit.periapsis;
        assert!(peri < peri0 - 10_000.0, "Periapsis {:.0} km should drop from {:.0} km", peri / 1e3, peri0 / 1e3);
        assert!(sim.state().propellant[1] < sim.vehicle().stages[1].propellant_mass);
    }

    #[test]
    fn ascent_reaches_target_orbit() {
        let mut sim = launched();
        sim.set_time_warp(10.0);
        let mut last_pitch = sim.guidance().last_pitch();
        let max_step = sim.guidance().config.max_pitch_rate * 1.0 + 1e-9;
        while sim.state().time < 3000.0 && sim.guidance().phase() != GuidancePhase::OrbitAchieved {
            sim.tick(0.1);
            assert_ne!(sim.status(), RunStatus::Failed, "Ascent failed at T+{:.1}", sim.state().time);
            let pitch = sim.guidance().last_pitch();
            assert!((-5.0..=90.0).contains(&pitch));
            assert!((pitch - last_pitch).abs() <= max_step, "Pitch jumped {} -> {}", last_pitch, pitch);
            last_pitch = pitch;
        }
        let t = sim.telemetry();
        assert_eq!(t.phase, GuidancePhase::OrbitAchieved, "No orbit by T+{:.0}", sim.state().time);
        assert!((t.orbit.apoapsis - 500_000.0).abs() <= 10_000.0, "Apoapsis {:.1} km", t.orbit.apoapsis / 1e3);
        assert!((t.orbit.periapsis - 500_000.0).abs() <= 10_000.0, "Periapsis {:.1} km", t.orbit.periapsis / 1e3);

        assert_eq!(count(&sim, |k| matches!(k, EventKind::StageSeparation { .. })), 1);
        assert_eq!(count(&sim, |k| matches!(k, EventKind::FairingJettison)), 1);
        assert_eq!(count(&sim, |k| matches!(k, EventKind::KarmanLineCrossed)), 1);
        assert_eq!(count(&sim, |k| matches!(k, EventKind::OrbitAchieved { .. })), 1);
        assert!(count(&sim, |k| matches!(k, EventKind::BurnStarted { burn: BurnKind::Circularization })) >= 1);
        assert!(sim.state().max_q > 20_000.0);
    }
}
