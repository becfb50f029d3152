pub mod physics;
pub mod dynamics;
pub mod vehicle;
mod gnc_mod;
pub mod orbital;
pub mod sim;

// The gnc module: expose gnc_mod as `gnc` publicly
pub mod gnc {
    pub use crate::gnc_mod::*;
}

pub use sim::{EventKind, RunStatus, SimEvent, Simulation, Telemetry};
pub use vehicle::{ConfigError, VehicleConfiguration};
