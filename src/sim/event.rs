use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dynamics::state::VehicleState;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

/// Guidance burns that are announced when they start and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurnKind {
    Circularization,
    RetrogradeTrim,
}

/// Kinds of simulation events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    StageSeparation { stage: usize },
    EngineCutoff { stage: usize },
    FairingJettison,
    KarmanLineCrossed,
    MaxQExceeded { dynamic_pressure: f64 },
    BurnStarted { burn: BurnKind },
    BurnEnded { burn: BurnKind },
    OrbitAchieved { apoapsis: f64, periapsis: f64 },
    MissionFailure { reason: String },
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::StageSeparation { stage } => write!(f, "stage {} separation", stage + 1),
            EventKind::EngineCutoff { stage } => write!(f, "stage {} engine cutoff", stage + 1),
            EventKind::FairingJettison => write!(f, "fairing jettison"),
            EventKind::KarmanLineCrossed => write!(f, "Karman line crossed"),
            EventKind::MaxQExceeded { dynamic_pressure } => {
                write!(f, "max-Q exceeded ({:.1} kPa)", dynamic_pressure / 1000.0)
            }
            EventKind::BurnStarted { burn } => write!(f, "{:?} burn started", burn),
            EventKind::BurnEnded { burn } => write!(f, "{:?} burn ended", burn),
            EventKind::OrbitAchieved { apoapsis, periapsis } => write!(
                f,
                "orbit achieved ({:.1} x {:.1} km)",
                apoapsis / 1000.0,
                periapsis / 1000.0
            ),
            EventKind::MissionFailure { reason } => write!(f, "mission failure: {}", reason),
        }
    }
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub time: f64,
    pub kind: EventKind,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive states and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &VehicleState, current: &VehicleState) -> Option<EventKind>;

    /// Re-arm a one-shot detector.
    fn reset(&mut self) {}
}

/// One-shot altitude crossing (ascending or descending).
pub struct AltitudeDetector {
    pub altitude: f64,
    pub ascending: bool,
    kind: EventKind,
    fired: bool,
}

impl AltitudeDetector {
    pub fn new(altitude: f64, ascending: bool, kind: EventKind) -> Self {
        Self { altitude, ascending, kind, fired: false }
    }
}

impl EventDetector for AltitudeDetector {
    fn check(&mut self, prev: &VehicleState, current: &VehicleState) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        let (before, after) = (prev.altitude(), current.altitude());
        let crossed = if self.ascending {
            before < self.altitude && after >= self.altitude
        } else {
            before > self.altitude && after <= self.altitude
        };
        if crossed {
            self.fired = true;
            Some(self.kind.clone())
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.fired = false;
    }
}

/// One-shot dynamic pressure limit.
pub struct MaxQDetector {
    pub limit: f64,  // Pa
    fired: bool,
}

impl MaxQDetector {
    pub fn new(limit: f64) -> Self {
        Self { limit, fired: false }
    }
}

impl EventDetector for MaxQDetector {
    fn check(&mut self, _prev: &VehicleState, current: &VehicleState) -> Option<EventKind> {
        if self.fired || current.max_q <= self.limit {
            return None;
        }
        self.fired = true;
        Some(EventKind::MaxQExceeded { dynamic_pressure: current.max_q })
    }

    fn reset(&mut self) {
        self.fired = false;
    }
}
