pub mod integrator;
pub mod event;
pub mod telemetry;
pub mod runner;

pub use event::{BurnKind, EventKind, SimEvent};
pub use runner::{RunStatus, Simulation, ViewSettings, TIME_WARP_FACTORS};
pub use telemetry::{ForceBreakdown, NextEvent, Telemetry, UpcomingEvent};
